//! `pawline ask`: answer one question and exit.

use pawline_core::message::SessionId;
use tracing::error;

use super::assistant::{Assistant, user_facing};

pub async fn run(session: String, question: String) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = Assistant::build().await?;
    let session = SessionId::new(session);

    let outcome = assistant.orchestrator.ask(&session, &question).await;
    assistant.shutdown().await;

    match outcome {
        Ok(answer) => {
            println!("{answer}");
            Ok(())
        }
        Err(e) => {
            error!(session = %session, error = %e, "Question failed");
            Err(user_facing(&e).into())
        }
    }
}
