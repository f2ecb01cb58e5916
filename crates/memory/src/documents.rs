//! Local document index for grounding lookups.
//!
//! Documents are ranked by keyword overlap with the query: the fraction of
//! distinct query terms found in the document. Documents sharing no term with
//! the query never match, whatever the threshold.

use async_trait::async_trait;
use pawline_core::error::RetrievalError;
use pawline_core::retrieval::{RetrievalStore, RetrievedDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "at", "be", "can", "description", "do", "does", "for", "from",
    "have", "i", "id", "in", "is", "it", "me", "my", "name", "of", "on", "or", "the", "there", "to",
    "what", "with", "you",
];

/// A dog available for adoption, as stored in seed files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DogRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl DogRecord {
    pub fn to_document(&self) -> RetrievedDocument {
        RetrievedDocument::new(
            format!("dog-{}", self.id),
            format!(
                "id: {}, name: {}, description: {}",
                self.id, self.name, self.description
            ),
        )
        .with_metadata("dog_id", serde_json::json!(self.id))
        .with_metadata("name", serde_json::json!(self.name))
    }
}

/// Read a JSON array of dog records.
pub async fn load_dog_records(path: &Path) -> Result<Vec<DogRecord>, RetrievalError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        RetrievalError::StoreUnavailable(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        RetrievalError::QueryFailed(format!("{} is not a list of dog records: {e}", path.display()))
    })
}

struct IndexedDocument {
    document: RetrievedDocument,
    terms: HashSet<String>,
}

pub struct InMemoryDocumentStore {
    documents: RwLock<Vec<IndexedDocument>>,
    min_score: f32,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
            min_score: 0.0,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| !w.is_empty() && !STOPWORDS.contains(&w.as_str()))
        .map(|w| normalize(&w))
        .collect()
}

/// Crude plural folding so "dogs" finds "dog".
fn normalize(word: &str) -> String {
    match word.strip_suffix('s') {
        Some(stem) if stem.len() >= 3 && !stem.ends_with('s') => stem.to_string(),
        _ => word.to_string(),
    }
}

#[async_trait]
impl RetrievalStore for InMemoryDocumentStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().await;
        let mut scored: Vec<RetrievedDocument> = documents
            .iter()
            .filter_map(|indexed| {
                let hits = query_terms.intersection(&indexed.terms).count();
                let score = hits as f32 / query_terms.len() as f32;
                (hits > 0 && score >= self.min_score).then(|| RetrievedDocument {
                    score,
                    ..indexed.document.clone()
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        debug!(query_terms = query_terms.len(), hits = scored.len(), "Document search");
        Ok(scored)
    }

    async fn add(&self, documents: Vec<RetrievedDocument>) -> Result<usize, RetrievalError> {
        let count = documents.len();
        let mut index = self.documents.write().await;
        for document in documents {
            let terms = terms(&document.content);
            index.push(IndexedDocument { document, terms });
        }
        Ok(count)
    }
}
