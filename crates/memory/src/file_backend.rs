//! File-based conversation store, one JSON-lines file per session.
//!
//! Each line is a JSON-encoded [`Message`]. Appends open the file in append
//! mode and sync before returning, so an acknowledged message survives a
//! restart. The session id is percent-encoded into the file name.
//!
//! A final line without its newline is a torn write: reads ignore it and the
//! next append truncates it away. Any other unreadable line is reported as
//! [`MemoryError::Corrupted`].
//!
//! Storage location: `~/.pawline/sessions/<session>.jsonl`

use async_trait::async_trait;
use pawline_core::error::MemoryError;
use pawline_core::memory::{ConversationStore, tail_window};
use pawline_core::message::{Message, SessionId};
use std::path::{Path, PathBuf};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::lanes::SessionLanes;

pub struct FileStore {
    dir: PathBuf,
    lanes: SessionLanes<()>,
}

impl FileStore {
    /// Open (and create if needed) the directory holding session files.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, MemoryError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            MemoryError::StorageUnavailable(format!(
                "cannot create session directory {}: {e}",
                dir.display()
            ))
        })?;
        debug!(path = %dir.display(), "File conversation store opened");
        Ok(Self {
            dir,
            lanes: SessionLanes::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", encode_file_stem(session.as_str())))
    }

    async fn write_lines(&self, session: &SessionId, messages: &[Message]) -> Result<(), MemoryError> {
        let mut buf = Vec::new();
        for message in messages {
            serde_json::to_writer(&mut buf, message).map_err(|e| {
                MemoryError::QueryFailed(format!("failed to serialize message: {e}"))
            })?;
            buf.push(b'\n');
        }

        let lane = self.lanes.lane(session).await;
        let _guard = lane.lock().await;

        let path = self.session_path(session);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| unavailable(&path, e))?;
        repair_torn_tail(&mut file, &path).await?;
        file.write_all(&buf).await.map_err(|e| unavailable(&path, e))?;
        file.sync_data().await.map_err(|e| unavailable(&path, e))?;
        Ok(())
    }

    async fn read_all(&self, session: &SessionId) -> Result<Vec<Message>, MemoryError> {
        let lane = self.lanes.lane(session).await;
        let _guard = lane.lock().await;

        let path = self.session_path(session);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(&path, e)),
        };

        let torn_tail = !content.is_empty() && !content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let last = lines.len().saturating_sub(1);

        let mut messages = Vec::with_capacity(lines.len());
        for (n, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(line) {
                Ok(message) => messages.push(message),
                Err(e) if torn_tail && n == last => {
                    warn!(session = %session, error = %e, "Ignoring torn final transcript line");
                }
                Err(e) => {
                    return Err(MemoryError::Corrupted(format!(
                        "{} line {}: {e}",
                        path.display(),
                        n + 1
                    )));
                }
            }
        }
        Ok(messages)
    }
}

/// Cut a torn final line left by an interrupted write, so the next append
/// starts on a line boundary.
async fn repair_torn_tail(file: &mut tokio::fs::File, path: &Path) -> Result<(), MemoryError> {
    let len = file.metadata().await.map_err(|e| unavailable(path, e))?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::Start(len - 1))
        .await
        .map_err(|e| unavailable(path, e))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)
        .await
        .map_err(|e| unavailable(path, e))?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let content = tokio::fs::read(path).await.map_err(|e| unavailable(path, e))?;
    let keep = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1) as u64;
    warn!(
        path = %path.display(),
        dropped_bytes = len - keep,
        "Truncating torn transcript line"
    );
    file.set_len(keep).await.map_err(|e| unavailable(path, e))?;
    Ok(())
}

fn unavailable(path: &Path, e: std::io::Error) -> MemoryError {
    MemoryError::StorageUnavailable(format!("{}: {e}", path.display()))
}

/// Map a session id to a file stem. Distinct ids always give distinct stems.
fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    if out.is_empty() {
        out.push('%');
    }
    out
}

#[async_trait]
impl ConversationStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, session: &SessionId, message: Message) -> Result<(), MemoryError> {
        self.write_lines(session, std::slice::from_ref(&message)).await
    }

    async fn append_all(
        &self,
        session: &SessionId,
        messages: Vec<Message>,
    ) -> Result<(), MemoryError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.write_lines(session, &messages).await
    }

    async fn recent_window(
        &self,
        session: &SessionId,
        max_messages: usize,
    ) -> Result<Vec<Message>, MemoryError> {
        Ok(tail_window(self.read_all(session).await?, max_messages))
    }

    async fn message_count(&self, session: &SessionId) -> Result<usize, MemoryError> {
        Ok(self.read_all(session).await?.len())
    }
}
