//! Retrieval store trait: similarity search over grounding documents.
//!
//! The store's ranking is authoritative; callers never re-rank.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A document returned by a similarity query. Lives for one request only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Document ID within the store
    pub id: String,

    /// The text that gets injected into the prompt
    pub content: String,

    /// Relevance score assigned by the store (higher is better)
    #[serde(default)]
    pub score: f32,

    /// Store-specific metadata
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievedDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score: 0.0,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// The core RetrievalStore trait.
#[async_trait]
pub trait RetrievalStore: Send + Sync {
    /// The backend name.
    fn name(&self) -> &str;

    /// Up to `top_k` documents ranked best-first. An empty list means "no match",
    /// never "query failed".
    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError>;

    /// Index documents into the store.
    async fn add(&self, documents: Vec<RetrievedDocument>) -> Result<usize, RetrievalError>;
}
