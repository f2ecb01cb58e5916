//! Per-request state threaded through the pipeline stages.

use pawline_core::message::{Message, SessionId};
use pawline_core::retrieval::RetrievedDocument;
use tokio::time::Instant;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    LoadingMemory,
    Retrieving,
    Framing,
    Completing,
    ResolvingTool,
    Persisting,
    Done,
}

/// What the retrieval step produced for this request.
///
/// Only ever lives in the request context; it is never written to memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Grounding {
    Documents(Vec<RetrievedDocument>),
    NoDocuments,
    /// The store failed; the answer must say information could not be looked up.
    Degraded { reason: String },
}

impl Grounding {
    pub fn document_count(&self) -> usize {
        match self {
            Grounding::Documents(docs) => docs.len(),
            _ => 0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Grounding::Degraded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session: SessionId,
    /// The question as it will be persisted.
    pub question: Message,
    pub deadline: Instant,
    pub state: RequestState,
    /// Prior turns, oldest first.
    pub history: Vec<Message>,
    pub grounding: Option<Grounding>,
    /// In-flight prompt: system preamble, history, question and any tool
    /// exchanges so far.
    pub messages: Vec<Message>,
    pub tool_rounds: u32,
    pub answer: Option<String>,
    pub model: Option<String>,
}

impl RequestContext {
    pub fn new(session: SessionId, question: impl Into<String>, deadline: Instant) -> Self {
        Self {
            session,
            question: Message::user(question),
            deadline,
            state: RequestState::LoadingMemory,
            history: Vec::new(),
            grounding: None,
            messages: Vec::new(),
            tool_rounds: 0,
            answer: None,
            model: None,
        }
    }
}
