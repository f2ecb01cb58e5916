use async_trait::async_trait;
use pawline_core::error::Result;
use pawline_core::message::Message;

use crate::context::{Grounding, RequestContext, RequestState};
use crate::pipeline::Stage;

const DIVIDER: &str = "---------------------";

/// Render the grounding block appended to the system preamble.
pub fn grounding_section(grounding: &Grounding) -> String {
    match grounding {
        Grounding::Documents(docs) => {
            let mut out = String::from("Context information is below.\n");
            out.push_str(DIVIDER);
            out.push('\n');
            for doc in docs {
                out.push_str(&doc.content);
                out.push('\n');
            }
            out.push_str(DIVIDER);
            out.push_str(
                "\nGiven the context and the conversation history, and not prior knowledge, \
                 reply to the user. If the answer is not in the context, tell the user you \
                 don't have that information.",
            );
            out
        }
        Grounding::NoDocuments => "No information matched this question. Do not rely on prior \
             knowledge or invent details: politely tell the user that we don't have that \
             information."
            .to_string(),
        Grounding::Degraded { .. } => "Information about our dogs could not be looked up right \
             now. Do not rely on prior knowledge or invent details: apologize and tell the user \
             you can't check that at the moment."
            .to_string(),
    }
}

/// Assembles the in-flight prompt: preamble plus grounding, history, question.
pub struct FrameSystemPrompt {
    preamble: String,
}

impl FrameSystemPrompt {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }
}

#[async_trait]
impl Stage for FrameSystemPrompt {
    fn name(&self) -> &'static str {
        "frame_system_prompt"
    }

    async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        ctx.state = RequestState::Framing;
        let grounding = ctx.grounding.as_ref().unwrap_or(&Grounding::NoDocuments);
        let system = format!("{}\n\n{}", self.preamble, grounding_section(grounding));

        let mut messages = Vec::with_capacity(ctx.history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(ctx.history.iter().cloned());
        messages.push(ctx.question.clone());
        ctx.messages = messages;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawline_core::Role;
    use pawline_core::retrieval::RetrievedDocument;
    use std::time::Duration;

    fn ctx_with(grounding: Grounding) -> RequestContext {
        let mut ctx = RequestContext::new(
            "alice".into(),
            "any dogs?",
            tokio::time::Instant::now() + Duration::from_secs(5),
        );
        ctx.history = vec![Message::user("hello"), Message::assistant("hi")];
        ctx.grounding = Some(grounding);
        ctx
    }

    #[tokio::test]
    async fn documents_are_framed_in_order() {
        let docs = vec![
            RetrievedDocument::new("a", "id: 45, name: Prancer"),
            RetrievedDocument::new("b", "id: 42, name: Rex"),
        ];
        let ctx = FrameSystemPrompt::new("You help people adopt dogs.")
            .run(ctx_with(Grounding::Documents(docs)))
            .await
            .unwrap();

        let system = &ctx.messages[0];
        assert_eq!(system.role, Role::System);
        assert!(system.content.starts_with("You help people adopt dogs."));
        let prancer = system.content.find("Prancer").unwrap();
        let rex = system.content.find("Rex").unwrap();
        assert!(prancer < rex);

        let roles: Vec<_> = ctx.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(ctx.messages[3].content, "any dogs?");
    }

    #[test]
    fn empty_and_degraded_framings_differ() {
        let none = grounding_section(&Grounding::NoDocuments);
        let degraded = grounding_section(&Grounding::Degraded {
            reason: "down".into(),
        });
        assert_ne!(none, degraded);
        assert!(none.contains("don't have that information"));
        assert!(degraded.contains("can't check"));
    }
}
