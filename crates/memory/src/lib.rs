//! Conversation memory backends and the local grounding document index.

mod lanes;

pub mod documents;
pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use documents::{DogRecord, InMemoryDocumentStore, load_dog_records};
pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
