//! # Pawline Core
//!
//! Domain types, traits, and error definitions for the pawline assistant.
//! This crate has **no transport or storage dependencies**. It defines the
//! domain model that every other crate implements against.
//!
//! ## Seams
//!
//! Each external collaborator is a trait here, with implementations living in
//! their respective crates:
//! - [`Provider`]: the Completion Engine
//! - [`ConversationStore`]: per-session transcripts
//! - [`RetrievalStore`]: grounding documents
//! - [`ToolInvoker`]: tool catalog + calls (remote gateway or in-process registry)

pub mod deadline;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use deadline::deadline_after;
pub use error::{Error, MemoryError, ProviderError, Result, RetrievalError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use memory::ConversationStore;
pub use message::{Message, MessageToolCall, Role, SessionId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use retrieval::{RetrievalStore, RetrievedDocument};
pub use tool::{
    ParameterKind, Tool, ToolCall, ToolCatalog, ToolDefinition, ToolInvoker, ToolParameter,
    ToolRegistry, ToolResult,
};
