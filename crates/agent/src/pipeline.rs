//! Ordered pipeline of request stages.
//!
//! Every stage has the same shape: take the request context, return the
//! updated context or an error that aborts the request. The order is fixed
//! at construction and visible in [`Pipeline::stage_names`].

use async_trait::async_trait;
use pawline_core::error::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::context::RequestContext;

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: RequestContext) -> Result<RequestContext>;
}

#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, mut ctx: RequestContext) -> Result<RequestContext> {
        for stage in &self.stages {
            let started = Instant::now();
            ctx = stage.run(ctx).await?;
            debug!(
                session = %ctx.session,
                stage = stage.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Stage complete"
            );
        }
        Ok(ctx)
    }
}
