//! `pawline ingest`: check a seed file before pointing `retrieval.seed_file` at it.

use pawline_config::AppConfig;
use pawline_core::retrieval::RetrievalStore;
use pawline_memory::{DogRecord, InMemoryDocumentStore, load_dog_records};
use std::collections::HashSet;
use std::path::PathBuf;

pub async fn run(file: PathBuf, query: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let records = load_dog_records(&file).await?;

    let duplicates = duplicate_ids(&records);
    if !duplicates.is_empty() {
        return Err(format!("{} repeats dog ids: {duplicates:?}", file.display()).into());
    }

    let store = InMemoryDocumentStore::new().with_min_score(config.retrieval.min_score);
    let indexed = store
        .add(records.iter().map(DogRecord::to_document).collect())
        .await?;

    println!("{}: {indexed} dog record(s)", file.display());
    for record in &records {
        println!("  {}", record.to_document().content);
    }

    if let Some(query) = query {
        let hits = store
            .similarity_search(&query, config.retrieval.top_k)
            .await?;
        println!();
        println!("Lookup \"{query}\" (top {}):", config.retrieval.top_k);
        if hits.is_empty() {
            println!("  no match; the assistant would answer without grounding");
        }
        for hit in hits {
            println!("  {:.2}  {}", hit.score, hit.content);
        }
    }

    Ok(())
}

/// Ids that appear more than once, in first-repeat order.
fn duplicate_ids(records: &[DogRecord]) -> Vec<i64> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for record in records {
        if !seen.insert(record.id) && !repeated.contains(&record.id) {
            repeated.push(record.id);
        }
    }
    repeated
}
