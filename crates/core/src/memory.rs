//! Conversation memory trait: per-session, append-only transcripts.
//!
//! A store keeps an ordered list of messages per session and hands back a
//! bounded recent window on read. Implementations must:
//! - serialize appends to the same session (arrival order wins)
//! - never make appends to different sessions wait on each other
//! - report an unreachable persistence layer as
//!   [`MemoryError::StorageUnavailable`](crate::error::MemoryError::StorageUnavailable)

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::message::{Message, SessionId};

/// The core ConversationStore trait.
///
/// Implementations: in-memory (for testing), JSONL files, SQLite.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "in_memory").
    fn name(&self) -> &str;

    /// Append one message to the end of the session's transcript.
    async fn append(&self, session: &SessionId, message: Message) -> Result<(), MemoryError>;

    /// Append several messages as one unit: either all land, contiguously, or none do.
    async fn append_all(
        &self,
        session: &SessionId,
        messages: Vec<Message>,
    ) -> Result<(), MemoryError>;

    /// The last `max_messages` messages in chronological order.
    ///
    /// Shorter transcripts are returned whole; unknown sessions are empty.
    async fn recent_window(
        &self,
        session: &SessionId,
        max_messages: usize,
    ) -> Result<Vec<Message>, MemoryError>;

    /// Total number of messages stored for a session.
    async fn message_count(&self, session: &SessionId) -> Result<usize, MemoryError>;
}

/// Keep the tail of `messages` that fits in `max_messages`.
pub fn tail_window(mut messages: Vec<Message>, max_messages: usize) -> Vec<Message> {
    if messages.len() > max_messages {
        messages.drain(..messages.len() - max_messages);
    }
    messages
}
