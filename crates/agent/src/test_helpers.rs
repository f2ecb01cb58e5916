//! Scripted collaborators for orchestrator tests.

use async_trait::async_trait;
use pawline_core::error::{MemoryError, ProviderError, RetrievalError};
use pawline_core::memory::ConversationStore;
use pawline_core::message::{Message, MessageToolCall, SessionId};
use pawline_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use pawline_core::retrieval::{RetrievalStore, RetrievedDocument};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

enum Script {
    Queue(VecDeque<ProviderResponse>),
    Repeat(ProviderResponse),
    Fail(ProviderError),
}

/// Replays canned responses and records every request it receives.
pub struct ScriptedProvider {
    script: Mutex<Script>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_script(Script::Queue(responses.into()))
    }

    /// Answer every request with the same response.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self::with_script(Script::Repeat(response))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_script(Script::Fail(error))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &mut *self.script.lock().unwrap() {
            Script::Queue(queue) => queue
                .pop_front()
                .ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into())),
            Script::Repeat(response) => Ok(response.clone()),
            Script::Fail(error) => Err(error.clone()),
        }
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn tool_response(calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = calls;
    ProviderResponse {
        message,
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> MessageToolCall {
    raw_tool_call(id, name, &arguments.to_string())
}

pub fn raw_tool_call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

/// A conversation store whose backend is down.
pub struct FailingStore;

#[async_trait]
impl ConversationStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn append(&self, _session: &SessionId, _message: Message) -> Result<(), MemoryError> {
        Err(MemoryError::StorageUnavailable("connection refused".into()))
    }

    async fn append_all(
        &self,
        _session: &SessionId,
        _messages: Vec<Message>,
    ) -> Result<(), MemoryError> {
        Err(MemoryError::StorageUnavailable("connection refused".into()))
    }

    async fn recent_window(
        &self,
        _session: &SessionId,
        _max_messages: usize,
    ) -> Result<Vec<Message>, MemoryError> {
        Err(MemoryError::StorageUnavailable("connection refused".into()))
    }

    async fn message_count(&self, _session: &SessionId) -> Result<usize, MemoryError> {
        Err(MemoryError::StorageUnavailable("connection refused".into()))
    }
}

/// A retrieval store that refuses every query.
pub struct FailingRetrieval;

#[async_trait]
impl RetrievalStore for FailingRetrieval {
    fn name(&self) -> &str {
        "failing"
    }

    async fn similarity_search(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        Err(RetrievalError::StoreUnavailable("connection refused".into()))
    }

    async fn add(&self, _documents: Vec<RetrievedDocument>) -> Result<usize, RetrievalError> {
        Err(RetrievalError::StoreUnavailable("connection refused".into()))
    }
}

/// A retrieval store that takes its time and then finds nothing.
pub struct SlowRetrieval(pub Duration);

#[async_trait]
impl RetrievalStore for SlowRetrieval {
    fn name(&self) -> &str {
        "slow"
    }

    async fn similarity_search(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }

    async fn add(&self, documents: Vec<RetrievedDocument>) -> Result<usize, RetrievalError> {
        Ok(documents.len())
    }
}
