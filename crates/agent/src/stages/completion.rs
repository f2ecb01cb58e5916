use async_trait::async_trait;
use chrono::Utc;
use pawline_core::error::{Error, Result, ToolError};
use pawline_core::event::{DomainEvent, EventBus};
use pawline_core::message::{Message, MessageToolCall};
use pawline_core::provider::{Provider, ProviderRequest};
use pawline_core::tool::{ToolCall, ToolCatalog, ToolInvoker, ToolResult};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::context::{RequestContext, RequestState};
use crate::pipeline::Stage;

/// Calls the completion engine and resolves tool-call intents until it
/// produces a final answer.
///
/// One engine response carrying tool calls is one round, however many calls
/// it holds; its calls run one after another in the order given. Tool
/// failures go back to the engine as tool results. Only the round bound and
/// the request deadline end the loop with an error.
pub struct CompleteWithTools {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<dyn ToolInvoker>,
    max_rounds: u32,
    events: Arc<EventBus>,
}

impl CompleteWithTools {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<dyn ToolInvoker>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            max_rounds: 5,
            events,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    async fn resolve(
        &self,
        catalog: &ToolCatalog,
        intent: &MessageToolCall,
        deadline: Instant,
    ) -> ToolResult {
        let started = Instant::now();
        let outcome = self.invoke(catalog, intent, deadline).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %intent.name, error = %e, "Tool call failed, reporting to the engine");
                ToolResult::failure(&intent.id, &intent.name, &e)
            }
        };
        self.events.publish(DomainEvent::ToolInvoked {
            tool_name: intent.name.clone(),
            success: result.success,
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }

    async fn invoke(
        &self,
        catalog: &ToolCatalog,
        intent: &MessageToolCall,
        deadline: Instant,
    ) -> std::result::Result<ToolResult, ToolError> {
        if !catalog.contains(&intent.name) {
            return Err(ToolError::invalid_arguments(
                &intent.name,
                format!("unknown tool; available: {}", catalog.names().join(", ")),
            ));
        }
        let call = ToolCall::from_message(intent)?;
        tokio::time::timeout_at(deadline, self.tools.call(&call))
            .await
            .map_err(|_| ToolError::RemoteUnavailable("request deadline reached".into()))?
    }
}

#[async_trait]
impl Stage for CompleteWithTools {
    fn name(&self) -> &'static str {
        "complete_with_tools"
    }

    async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        let catalog = self.tools.catalog();
        let definitions = catalog.definitions().to_vec();

        loop {
            ctx.state = RequestState::Completing;
            let request = ProviderRequest {
                model: self.model.clone(),
                messages: ctx.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: definitions.clone(),
            };

            let started = Instant::now();
            let response = tokio::time::timeout_at(ctx.deadline, self.provider.complete(request))
                .await
                .map_err(|_| Error::DeadlineExceeded {
                    stage: "completion".into(),
                })??;
            debug!(
                session = %ctx.session,
                round = ctx.tool_rounds,
                provider = self.provider.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                tool_calls = response.message.tool_calls.len(),
                "Completion returned"
            );

            if response.message.tool_calls.is_empty() {
                ctx.answer = Some(response.message.content);
                ctx.model = Some(response.model);
                return Ok(ctx);
            }

            if ctx.tool_rounds >= self.max_rounds {
                warn!(session = %ctx.session, rounds = ctx.tool_rounds, "Tool round bound reached");
                return Err(Error::ToolLoopExceeded {
                    rounds: ctx.tool_rounds,
                });
            }
            ctx.tool_rounds += 1;
            ctx.state = RequestState::ResolvingTool;

            let intents = response.message.tool_calls.clone();
            ctx.messages.push(response.message);
            for intent in &intents {
                info!(session = %ctx.session, tool = %intent.name, round = ctx.tool_rounds, "Resolving tool call");
                let result = self.resolve(&catalog, intent, ctx.deadline).await;
                ctx.messages.push(Message::tool_result(&intent.id, &result.output));
            }
        }
    }
}
