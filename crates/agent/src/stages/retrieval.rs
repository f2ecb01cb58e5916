use async_trait::async_trait;
use chrono::Utc;
use pawline_core::error::Result;
use pawline_core::event::{DomainEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::advisor::{Retrieval, RetrievalAdvisor};
use crate::context::{Grounding, RequestContext, RequestState};
use crate::pipeline::Stage;

/// Resolves grounding for the question. A failed lookup degrades the
/// grounding instead of aborting the request.
pub struct RetrieveGrounding {
    advisor: RetrievalAdvisor,
    events: Arc<EventBus>,
}

impl RetrieveGrounding {
    pub fn new(advisor: RetrievalAdvisor, events: Arc<EventBus>) -> Self {
        Self { advisor, events }
    }
}

#[async_trait]
impl Stage for RetrieveGrounding {
    fn name(&self) -> &'static str {
        "retrieve_grounding"
    }

    async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        ctx.state = RequestState::Retrieving;
        let grounding = match self.advisor.augment(&ctx.question.content, ctx.deadline).await {
            Ok(Retrieval::Documents(docs)) => Grounding::Documents(docs),
            Ok(Retrieval::NoGrounding) => Grounding::NoDocuments,
            Err(e) => {
                warn!(session = %ctx.session, error = %e, "Retrieval failed, answering without grounding");
                Grounding::Degraded {
                    reason: e.to_string(),
                }
            }
        };

        debug!(
            session = %ctx.session,
            documents = grounding.document_count(),
            degraded = grounding.is_degraded(),
            "Grounding resolved"
        );
        self.events.publish(DomainEvent::GroundingResolved {
            session: ctx.session.to_string(),
            documents: grounding.document_count(),
            degraded: grounding.is_degraded(),
            timestamp: Utc::now(),
        });

        ctx.grounding = Some(grounding);
        Ok(ctx)
    }
}
