//! `pawline chat`: interactive session.

use pawline_core::message::SessionId;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use super::assistant::{Assistant, user_facing};

pub async fn run(session: String) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = Assistant::build().await?;
    let session = SessionId::new(session);
    let tools = assistant.gateway.server_info();

    println!();
    println!("  Pawline, interactive mode");
    println!();
    println!("  Session:   {session}");
    println!("  Provider:  {}", assistant.config.default_provider);
    println!("  Model:     {}", assistant.model);
    println!("  Tools:     {} {}", tools.name, tools.version);
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        match assistant.orchestrator.ask_detailed(&session, question).await {
            Ok(answer) => {
                eprint!("\r     \r");
                println!();
                for line in answer.text.lines() {
                    println!("  Assistant > {line}");
                }
                if answer.grounding.is_degraded() {
                    println!("  (dog listings were unavailable for this answer)");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                error!(session = %session, error = %e, "Question failed");
                eprintln!("  [Error] {}", user_facing(&e));
                println!();
            }
        }
        prompt()?;
    }

    assistant.shutdown().await;
    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
