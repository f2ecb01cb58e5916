//! SQLite conversation store.
//!
//! One `messages` table; the autoincrement `iid` column is the authoritative
//! insertion order within a session. Turn batches are written in a single
//! transaction.

use async_trait::async_trait;
use chrono::Utc;
use pawline_core::error::MemoryError;
use pawline_core::memory::ConversationStore;
use pawline_core::message::{Message, MessageToolCall, Role, SessionId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::lanes::SessionLanes;

pub struct SqliteStore {
    pool: SqlitePool,
    lanes: SessionLanes<()>,
}

impl SqliteStore {
    /// Open a SQLite store at `path`, creating the file and schema if needed.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::StorageUnavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Each connection to an in-memory database is its own database.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::StorageUnavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite conversation store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self {
            pool,
            lanes: SessionLanes::new(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Close the pool. Later calls fail with `StorageUnavailable`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id   TEXT NOT NULL,
                id           TEXT NOT NULL,
                role         TEXT NOT NULL,
                content      TEXT NOT NULL,
                tool_calls   TEXT NOT NULL DEFAULT '[]',
                tool_call_id TEXT,
                created_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, iid)")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, MemoryError> {
        let column = |name: &str, e: sqlx::Error| MemoryError::QueryFailed(format!("{name} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| column("id", e))?;
        let role_str: String = row.try_get("role").map_err(|e| column("role", e))?;
        let content: String = row.try_get("content").map_err(|e| column("content", e))?;
        let tool_calls_json: String = row
            .try_get("tool_calls")
            .map_err(|e| column("tool_calls", e))?;
        let tool_call_id: Option<String> = row
            .try_get("tool_call_id")
            .map_err(|e| column("tool_call_id", e))?;
        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| column("created_at", e))?;

        let role = Role::parse(&role_str)
            .ok_or_else(|| MemoryError::Corrupted(format!("unknown role '{role_str}' in message {id}")))?;
        let tool_calls: Vec<MessageToolCall> = serde_json::from_str(&tool_calls_json)
            .map_err(|e| MemoryError::Corrupted(format!("tool_calls of message {id}: {e}")))?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Message {
            id,
            role,
            content,
            tool_calls,
            tool_call_id,
            timestamp,
        })
    }

    async fn insert_batch(&self, session: &SessionId, messages: &[Message]) -> Result<(), MemoryError> {
        let lane = self.lanes.lane(session).await;
        let _guard = lane.lock().await;

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for message in messages {
            let tool_calls = serde_json::to_string(&message.tool_calls)
                .map_err(|e| MemoryError::QueryFailed(format!("tool_calls: {e}")))?;
            sqlx::query(
                r#"
                INSERT INTO messages (session_id, id, role, content, tool_calls, tool_call_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.as_str())
            .bind(&message.id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(tool_calls)
            .bind(&message.tool_call_id)
            .bind(message.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }
}

/// Connection-level failures are outages; everything else is a failed query.
fn map_sqlx(e: sqlx::Error) -> MemoryError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Tls(_) => MemoryError::StorageUnavailable(e.to_string()),
        other => MemoryError::QueryFailed(other.to_string()),
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, session: &SessionId, message: Message) -> Result<(), MemoryError> {
        self.insert_batch(session, std::slice::from_ref(&message)).await
    }

    async fn append_all(
        &self,
        session: &SessionId,
        messages: Vec<Message>,
    ) -> Result<(), MemoryError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.insert_batch(session, &messages).await
    }

    async fn recent_window(
        &self,
        session: &SessionId,
        max_messages: usize,
    ) -> Result<Vec<Message>, MemoryError> {
        let limit = i64::try_from(max_messages).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, role, content, tool_calls, tool_call_id, created_at FROM (
                SELECT iid, id, role, content, tool_calls, tool_call_id, created_at
                FROM messages
                WHERE session_id = ?
                ORDER BY iid DESC
                LIMIT ?
            )
            ORDER BY iid ASC
            "#,
        )
        .bind(session.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn message_count(&self, session: &SessionId) -> Result<usize, MemoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE session_id = ?")
            .bind(session.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| MemoryError::QueryFailed(format!("count: {e}")))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}
