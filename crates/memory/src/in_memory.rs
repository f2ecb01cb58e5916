//! In-memory conversation store, useful for testing and ephemeral sessions.

use async_trait::async_trait;
use pawline_core::error::MemoryError;
use pawline_core::memory::ConversationStore;
use pawline_core::message::{Message, SessionId};

use crate::lanes::SessionLanes;

/// Transcripts kept in process memory. Nothing survives a restart.
pub struct InMemoryStore {
    transcripts: SessionLanes<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            transcripts: SessionLanes::new(),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, session: &SessionId, message: Message) -> Result<(), MemoryError> {
        let lane = self.transcripts.lane(session).await;
        lane.lock().await.push(message);
        Ok(())
    }

    async fn append_all(
        &self,
        session: &SessionId,
        messages: Vec<Message>,
    ) -> Result<(), MemoryError> {
        let lane = self.transcripts.lane(session).await;
        lane.lock().await.extend(messages);
        Ok(())
    }

    async fn recent_window(
        &self,
        session: &SessionId,
        max_messages: usize,
    ) -> Result<Vec<Message>, MemoryError> {
        let Some(lane) = self.transcripts.existing(session).await else {
            return Ok(Vec::new());
        };
        let transcript = lane.lock().await;
        let start = transcript.len().saturating_sub(max_messages);
        Ok(transcript[start..].to_vec())
    }

    async fn message_count(&self, session: &SessionId) -> Result<usize, MemoryError> {
        match self.transcripts.existing(session).await {
            Some(lane) => Ok(lane.lock().await.len()),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn contents(messages: &[Message]) -> Vec<String> {
        messages.iter().map(|m| m.content.clone()).collect()
    }

    #[tokio::test]
    async fn window_returns_tail_in_order() {
        let store = InMemoryStore::new();
        let session = SessionId::from("alice");
        for i in 0..5 {
            store.append(&session, Message::user(format!("m{i}"))).await.unwrap();
        }

        let window = store.recent_window(&session, 3).await.unwrap();
        assert_eq!(contents(&window), vec!["m2", "m3", "m4"]);

        let all = store.recent_window(&session, 50).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(store.message_count(&session).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = InMemoryStore::new();
        let session = SessionId::from("nobody");
        assert!(store.recent_window(&session, 10).await.unwrap().is_empty());
        assert_eq!(store.message_count(&session).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryStore::new();
        store.append(&"alice".into(), Message::user("hi from alice")).await.unwrap();
        store.append(&"bob".into(), Message::user("hi from bob")).await.unwrap();

        let alice = store.recent_window(&"alice".into(), 10).await.unwrap();
        assert_eq!(contents(&alice), vec!["hi from alice"]);
    }

    #[tokio::test]
    async fn append_all_lands_contiguously() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionId::from("alice");

        let mut handles = Vec::new();
        for turn in 0..8 {
            let store = store.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_all(
                        &session,
                        vec![
                            Message::user(format!("q{turn}")),
                            Message::assistant(format!("a{turn}")),
                        ],
                    )
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let window = store.recent_window(&session, 100).await.unwrap();
        assert_eq!(window.len(), 16);
        for pair in window.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[tokio::test]
    async fn queued_appends_keep_arrival_order() {
        let store = Arc::new(InMemoryStore::new());
        let session = SessionId::from("alice");
        let lane = store.transcripts.lane(&session).await;
        let held = lane.lock().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                store.append(&session, Message::user(format!("m{i}"))).await.unwrap();
            }));
            // Let the task reach the lane queue before the next one starts.
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }
        drop(held);
        for h in handles {
            h.await.unwrap();
        }

        let window = store.recent_window(&session, 100).await.unwrap();
        let expected: Vec<String> = (0..8).map(|i| format!("m{i}")).collect();
        assert_eq!(contents(&window), expected);
    }
}
