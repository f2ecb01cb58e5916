use async_trait::async_trait;
use pawline_core::error::{Error, MemoryError, Result};
use pawline_core::memory::ConversationStore;
use pawline_core::message::Message;
use std::sync::Arc;
use tracing::{debug, info};

use crate::context::{RequestContext, RequestState};
use crate::pipeline::Stage;

/// Loads the session's recent window. A storage outage aborts the request.
pub struct LoadHistory {
    memory: Arc<dyn ConversationStore>,
    window: usize,
}

impl LoadHistory {
    pub fn new(memory: Arc<dyn ConversationStore>, window: usize) -> Self {
        Self { memory, window }
    }
}

#[async_trait]
impl Stage for LoadHistory {
    fn name(&self) -> &'static str {
        "load_history"
    }

    async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        ctx.state = RequestState::LoadingMemory;
        ctx.history = tokio::time::timeout_at(
            ctx.deadline,
            self.memory.recent_window(&ctx.session, self.window),
        )
        .await
        .map_err(|_| MemoryError::StorageUnavailable("timed out loading the transcript".into()))??;

        debug!(
            session = %ctx.session,
            backend = self.memory.name(),
            messages = ctx.history.len(),
            "History loaded"
        );
        Ok(ctx)
    }
}

/// Persists the question and final answer as one batch. Tool exchanges and
/// grounding stay out of the transcript.
pub struct PersistTurn {
    memory: Arc<dyn ConversationStore>,
}

impl PersistTurn {
    pub fn new(memory: Arc<dyn ConversationStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Stage for PersistTurn {
    fn name(&self) -> &'static str {
        "persist_turn"
    }

    async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        ctx.state = RequestState::Persisting;
        let answer = ctx
            .answer
            .clone()
            .ok_or_else(|| Error::Internal("no answer to persist".into()))?;

        let turn = vec![ctx.question.clone(), Message::assistant(answer)];
        tokio::time::timeout_at(ctx.deadline, self.memory.append_all(&ctx.session, turn))
            .await
            .map_err(|_| MemoryError::StorageUnavailable("timed out persisting the turn".into()))??;

        ctx.state = RequestState::Done;
        info!(session = %ctx.session, tool_rounds = ctx.tool_rounds, "Turn persisted");
        Ok(ctx)
    }
}
