//! Retrieval Advisor: grounding lookup for one question.

use pawline_core::deadline::deadline_after;
use pawline_core::error::RetrievalError;
use pawline_core::retrieval::{RetrievalStore, RetrievedDocument};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Best-first, exactly as ranked by the store.
    Documents(Vec<RetrievedDocument>),
    /// The store answered, but nothing matched.
    NoGrounding,
}

pub struct RetrievalAdvisor {
    store: Arc<dyn RetrievalStore>,
    top_k: usize,
    timeout: Duration,
}

impl RetrievalAdvisor {
    pub fn new(store: Arc<dyn RetrievalStore>) -> Self {
        Self {
            store,
            top_k: 4,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query the store for `question`.
    ///
    /// Store failures are returned as errors and never folded into
    /// [`Retrieval::NoGrounding`]. The lookup gives up at whichever comes
    /// first: the advisor's own timeout or `deadline`.
    pub async fn augment(
        &self,
        question: &str,
        deadline: Instant,
    ) -> Result<Retrieval, RetrievalError> {
        let started = Instant::now();
        let give_up = deadline.min(deadline_after(started, self.timeout));
        let documents = tokio::time::timeout_at(give_up, self.store.similarity_search(question, self.top_k))
            .await
            .map_err(|_| RetrievalError::Timeout {
                timeout_ms: give_up.saturating_duration_since(started).as_millis() as u64,
            })??;

        debug!(
            store = self.store.name(),
            documents = documents.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Retrieval finished"
        );

        if documents.is_empty() {
            Ok(Retrieval::NoGrounding)
        } else {
            Ok(Retrieval::Documents(documents))
        }
    }
}
