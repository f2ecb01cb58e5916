//! Error types for the pawline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! carries the request-fatal conditions of the orchestrator.

use thiserror::Error;

/// The top-level error type for all pawline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion engine errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Conversation memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Orchestration ---
    #[error("Tool call loop exceeded after {rounds} rounds")]
    ToolLoopExceeded { rounds: u32 },

    #[error("Request deadline exceeded during {stage}")]
    DeadlineExceeded { stage: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller should see this as a storage outage.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Error::Memory(MemoryError::StorageUnavailable(_)))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    /// The persistence layer cannot be reached. Fatal to a request.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Stored transcript is corrupted: {0}")]
    Corrupted(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retrieval store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Retrieval timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Retrieval query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool provider unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote tool error from {tool_name} (code {code}): {message}")]
    RemoteToolError {
        tool_name: String,
        code: i64,
        message: String,
    },

    #[error("Tool already declared: {0}")]
    DuplicateTool(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

impl ToolError {
    pub fn invalid_arguments(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::RemoteToolError {
            tool_name: "schedule".into(),
            code: -32000,
            message: "calendar is full".into(),
        });
        assert!(err.to_string().contains("schedule"));
        assert!(err.to_string().contains("-32000"));
    }

    #[test]
    fn storage_unavailable_is_distinguishable() {
        let err: Error = MemoryError::StorageUnavailable("connection refused".into()).into();
        assert!(err.is_storage_unavailable());

        let err: Error = MemoryError::QueryFailed("bad row".into()).into();
        assert!(!err.is_storage_unavailable());
    }

    #[test]
    fn loop_exceeded_mentions_rounds() {
        let err = Error::ToolLoopExceeded { rounds: 5 };
        assert!(err.to_string().contains('5'));
    }
}
