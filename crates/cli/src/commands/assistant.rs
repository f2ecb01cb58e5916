//! Wiring shared by `ask` and `chat`: every collaborator is built here once
//! and handed to the orchestrator.

use pawline_agent::Orchestrator;
use pawline_config::{AppConfig, MemoryConfig, RetrievalConfig};
use pawline_core::error::{Error, MemoryError, RetrievalError};
use pawline_core::memory::ConversationStore;
use pawline_core::retrieval::RetrievalStore;
use pawline_gateway::{GatewayOptions, ToolGateway};
use pawline_memory::{
    DogRecord, FileStore, InMemoryDocumentStore, InMemoryStore, SqliteStore, load_dog_records,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Assistant {
    pub orchestrator: Orchestrator,
    pub gateway: Arc<ToolGateway>,
    pub config: AppConfig,
    pub model: String,
}

impl Assistant {
    /// Load config and connect everything. Fails fast if the tool provider
    /// is unreachable.
    pub async fn build() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

        let provider = pawline_providers::build_from_config(&config)?;
        let model = pawline_providers::model_for(&config);
        let memory = open_memory(&config.memory).await?;
        let retrieval = open_documents(&config.retrieval).await?;

        let addr = config.tools.provider_addr.clone();
        let gateway = ToolGateway::connect(addr.clone(), GatewayOptions::from_config(&config.tools))
            .await
            .map_err(|e| {
                format!("Tool provider at {addr} is unavailable ({e}); start it with `pawline scheduler`")
            })?;
        let gateway = Arc::new(gateway);

        let orchestrator = Orchestrator::from_config(
            &config,
            provider,
            model.clone(),
            gateway.clone(),
            memory,
            retrieval,
        );

        Ok(Self {
            orchestrator,
            gateway,
            config,
            model,
        })
    }

    pub async fn shutdown(&self) {
        self.gateway.close().await;
    }
}

/// Open the configured conversation store.
pub async fn open_memory(config: &MemoryConfig) -> Result<Arc<dyn ConversationStore>, MemoryError> {
    let path = config.resolved_path();
    let store: Arc<dyn ConversationStore> = match config.backend.as_str() {
        "in_memory" => {
            warn!("Conversation memory is in-process only; history is lost on exit");
            Arc::new(InMemoryStore::new())
        }
        "file" => Arc::new(FileStore::open(path).await?),
        _ => {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    MemoryError::StorageUnavailable(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
            Arc::new(SqliteStore::new(&format!("sqlite://{}", path.display())).await?)
        }
    };
    info!(backend = store.name(), "Conversation memory ready");
    Ok(store)
}

/// Build the document index, seeding it from `retrieval.seed_file` when set.
pub async fn open_documents(
    config: &RetrievalConfig,
) -> Result<Arc<dyn RetrievalStore>, RetrievalError> {
    let store = InMemoryDocumentStore::new().with_min_score(config.min_score);
    match &config.seed_file {
        Some(path) => {
            let records = load_dog_records(path).await?;
            let indexed = store
                .add(records.iter().map(DogRecord::to_document).collect())
                .await?;
            info!(documents = indexed, file = %path.display(), "Grounding documents indexed");
        }
        None => warn!("No retrieval.seed_file configured; answers will have no grounding"),
    }
    Ok(Arc::new(store))
}

/// What the person at the prompt sees when a request fails.
pub fn user_facing(error: &Error) -> String {
    match error {
        Error::ToolLoopExceeded { .. } => {
            "Sorry, I couldn't complete that request. Please try again.".into()
        }
        Error::DeadlineExceeded { .. } => {
            "Sorry, that took too long to answer. Please try again.".into()
        }
        e if e.is_storage_unavailable() => {
            "Conversation history is unavailable right now, so nothing was answered or saved."
                .into()
        }
        other => format!("Request failed: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawline_core::message::{Message, SessionId};

    #[tokio::test]
    async fn file_backend_opens_in_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            backend: "file".into(),
            path: Some(dir.path().join("sessions")),
        };
        let store = open_memory(&config).await.unwrap();
        assert_eq!(store.name(), "file");

        let alice = SessionId::new("alice");
        store.append(&alice, Message::user("hi")).await.unwrap();
        assert_eq!(store.message_count(&alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sqlite_backend_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.db");
        let config = MemoryConfig {
            backend: "sqlite".into(),
            path: Some(path.clone()),
        };
        let store = open_memory(&config).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn seed_file_is_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("dogs.json");
        std::fs::write(
            &seed,
            r#"[{"id": 42, "name": "Rex", "description": "A calm retriever"}]"#,
        )
        .unwrap();
        let config = RetrievalConfig {
            seed_file: Some(seed),
            ..RetrievalConfig::default()
        };

        let store = open_documents(&config).await.unwrap();
        let hits = store.similarity_search("retriever", 4).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "dog-42");
    }

    #[tokio::test]
    async fn missing_seed_file_is_an_error() {
        let config = RetrievalConfig {
            seed_file: Some("/definitely/not/here.json".into()),
            ..RetrievalConfig::default()
        };
        assert!(matches!(
            open_documents(&config).await,
            Err(RetrievalError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn loop_bound_is_reported_generically() {
        let message = user_facing(&Error::ToolLoopExceeded { rounds: 5 });
        assert!(!message.contains('5'));
        assert!(message.starts_with("Sorry"));
    }

    #[test]
    fn storage_outage_is_named() {
        let message = user_facing(&Error::Memory(MemoryError::StorageUnavailable(
            "disk gone".into(),
        )));
        assert!(message.contains("unavailable"));
    }
}
