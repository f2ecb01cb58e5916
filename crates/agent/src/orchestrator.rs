//! The Request Orchestrator.
//!
//! Every question runs through the same pipeline:
//!
//! 1. **Load** the session's recent window
//! 2. **Retrieve** grounding documents for the question
//! 3. **Frame** the system preamble, grounding, history and question
//! 4. **Complete** with the tool catalog, resolving tool calls round by round
//! 5. **Persist** the question and final answer
//!
//! One deadline covers the whole request; every stage spends from it.

use chrono::Utc;
use pawline_config::{AppConfig, DEFAULT_SYSTEM_PROMPT};
use pawline_core::deadline::deadline_after;
use pawline_core::error::{Error, Result};
use pawline_core::event::{DomainEvent, EventBus};
use pawline_core::memory::ConversationStore;
use pawline_core::message::SessionId;
use pawline_core::provider::Provider;
use pawline_core::retrieval::RetrievalStore;
use pawline_core::tool::ToolInvoker;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::advisor::RetrievalAdvisor;
use crate::context::{Grounding, RequestContext};
use crate::pipeline::Pipeline;
use crate::stages::{
    CompleteWithTools, FrameSystemPrompt, LoadHistory, PersistTurn, RetrieveGrounding,
};

/// A finished request.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub grounding: Grounding,
    pub tool_rounds: u32,
    pub model: String,
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<dyn ToolInvoker>,
    memory: Arc<dyn ConversationStore>,
    retrieval: Arc<dyn RetrievalStore>,
    system_prompt: String,
    history_window: usize,
    max_tool_rounds: u32,
    request_timeout: Duration,
    top_k: usize,
    retrieval_timeout: Duration,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<dyn ToolInvoker>,
        memory: Arc<dyn ConversationStore>,
        retrieval: Arc<dyn RetrievalStore>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            memory,
            retrieval,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_window: 20,
            max_tool_rounds: 5,
            request_timeout: Duration::from_secs(60),
            top_k: 4,
            retrieval_timeout: Duration::from_secs(10),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// Apply the `[assistant]` and `[retrieval]` settings plus sampling defaults.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<dyn ToolInvoker>,
        memory: Arc<dyn ConversationStore>,
        retrieval: Arc<dyn RetrievalStore>,
    ) -> Self {
        Self::new(provider, model, tools, memory, retrieval)
            .with_system_prompt(&config.assistant.system_prompt)
            .with_history_window(config.assistant.history_window)
            .with_max_tool_rounds(config.assistant.max_tool_rounds)
            .with_request_timeout(config.assistant.request_timeout())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_top_k(config.retrieval.top_k)
            .with_retrieval_timeout(Duration::from_secs(config.retrieval.timeout_secs))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn pipeline(&self) -> Pipeline {
        let advisor = RetrievalAdvisor::new(self.retrieval.clone())
            .with_top_k(self.top_k)
            .with_timeout(self.retrieval_timeout);
        let completion = CompleteWithTools::new(
            self.provider.clone(),
            self.model.clone(),
            self.tools.clone(),
            self.event_bus.clone(),
        )
        .with_sampling(self.temperature, self.max_tokens)
        .with_max_rounds(self.max_tool_rounds);

        Pipeline::new()
            .then(LoadHistory::new(self.memory.clone(), self.history_window))
            .then(RetrieveGrounding::new(advisor, self.event_bus.clone()))
            .then(FrameSystemPrompt::new(self.system_prompt.clone()))
            .then(completion)
            .then(PersistTurn::new(self.memory.clone()))
    }

    /// Answer `question` for `session`.
    pub async fn ask(&self, session: &SessionId, question: &str) -> Result<String> {
        self.ask_detailed(session, question).await.map(|a| a.text)
    }

    pub async fn ask_detailed(&self, session: &SessionId, question: &str) -> Result<Answer> {
        let started = Instant::now();
        info!(session = %session, "Question received");
        self.event_bus.publish(DomainEvent::QuestionReceived {
            session: session.to_string(),
            content_preview: question.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        let deadline = deadline_after(started, self.request_timeout);
        let ctx = RequestContext::new(session.clone(), question, deadline);
        match self.finish(self.pipeline().run(ctx).await) {
            Ok(answer) => {
                info!(
                    session = %session,
                    tool_rounds = answer.tool_rounds,
                    documents = answer.grounding.document_count(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Answer generated"
                );
                self.event_bus.publish(DomainEvent::AnswerGenerated {
                    session: session.to_string(),
                    model: answer.model.clone(),
                    tool_rounds: answer.tool_rounds,
                    timestamp: Utc::now(),
                });
                Ok(answer)
            }
            Err(e) => {
                warn!(session = %session, error = %e, "Request failed");
                self.event_bus.publish(DomainEvent::RequestFailed {
                    session: session.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    fn finish(&self, outcome: Result<RequestContext>) -> Result<Answer> {
        let ctx = outcome?;
        let text = ctx
            .answer
            .ok_or_else(|| Error::Internal("pipeline finished without an answer".into()))?;
        Ok(Answer {
            text,
            grounding: ctx.grounding.unwrap_or(Grounding::NoDocuments),
            tool_rounds: ctx.tool_rounds,
            model: ctx.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}
