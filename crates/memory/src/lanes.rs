//! Per-session serialization lanes.
//!
//! Each session gets its own mutex. Writers to one session queue behind each
//! other in arrival order; writers to different sessions never share a lock
//! beyond the brief map lookup.

use pawline_core::SessionId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One lane per distinct session id, kept for the life of the process.
///
/// Lanes are never evicted, so the map grows with the number of sessions a
/// store has seen. That is fine for an assistant process serving a bounded set
/// of people. A long-lived multi-tenant deployment would need an idle sweep.
pub(crate) struct SessionLanes<T> {
    lanes: RwLock<HashMap<SessionId, Arc<Mutex<T>>>>,
}

impl<T: Default> SessionLanes<T> {
    pub(crate) fn new() -> Self {
        Self {
            lanes: RwLock::new(HashMap::new()),
        }
    }

    /// The lane for `session`, created on first use.
    pub(crate) async fn lane(&self, session: &SessionId) -> Arc<Mutex<T>> {
        if let Some(lane) = self.lanes.read().await.get(session) {
            return lane.clone();
        }
        self.lanes
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .clone()
    }

    /// The lane for `session` only if it already exists.
    pub(crate) async fn existing(&self, session: &SessionId) -> Option<Arc<Mutex<T>>> {
        self.lanes.read().await.get(session).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_session_shares_a_lane() {
        let lanes: SessionLanes<u32> = SessionLanes::new();
        let a = lanes.lane(&"alice".into()).await;
        let b = lanes.lane(&"alice".into()).await;
        assert!(Arc::ptr_eq(&a, &b));

        let c = lanes.lane(&"bob".into()).await;
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(lanes.existing(&"carol".into()).await.is_none());
    }

    #[tokio::test]
    async fn held_lane_does_not_block_other_sessions() {
        let lanes: SessionLanes<u32> = SessionLanes::new();
        let alice = lanes.lane(&"alice".into()).await;
        let _held = alice.lock().await;

        let bob = lanes.lane(&"bob".into()).await;
        let guard = tokio::time::timeout(std::time::Duration::from_millis(50), bob.lock()).await;
        assert!(guard.is_ok());
    }

    #[tokio::test]
    async fn lanes_are_kept_after_writers_finish() {
        let lanes: SessionLanes<u32> = SessionLanes::new();
        {
            let lane = lanes.lane(&"alice".into()).await;
            *lane.lock().await += 1;
        }
        let kept = lanes.existing(&"alice".into()).await.unwrap();
        assert_eq!(*kept.lock().await, 1);
    }
}
