//! One live duplex link: a reader task that routes responses to waiting
//! callers by id, and a writer task fed through a channel.

use pawline_core::error::ToolError;
use pawline_protocol::{
    Frame, ProtocolError, Request, Response, next_frame, reader, send_frame, writer,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ConnectionState;

pub(crate) trait Duplex: AsyncRead + AsyncWrite + Send + Unpin + 'static {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin + 'static> Duplex for T {}

pub(crate) type BoxedStream = Box<dyn Duplex>;

/// Callers waiting for a response, by request id.
///
/// Once `closed` is set no new waiter is admitted, so nothing can register
/// after the reader has given up on the link.
#[derive(Default)]
struct PendingCalls {
    waiters: HashMap<u64, oneshot::Sender<Response>>,
    closed: bool,
}

type Pending = Arc<Mutex<PendingCalls>>;

fn lock(pending: &Pending) -> MutexGuard<'_, PendingCalls> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Close the map and drop every sender, waking each waiting caller with a
/// closed channel.
fn fail_all(pending: &Pending) {
    let mut calls = lock(pending);
    calls.closed = true;
    calls.waiters.clear();
}

fn register(pending: &Pending, id: u64, tx: oneshot::Sender<Response>) -> Result<(), ToolError> {
    let mut calls = lock(pending);
    if calls.closed {
        return Err(ToolError::RemoteUnavailable("tool provider link is down".into()));
    }
    calls.waiters.insert(id, tx);
    Ok(())
}

/// Removes the pending entry when a caller stops waiting, whether it got an
/// answer, timed out or was cancelled.
struct PendingGuard<'a> {
    pending: &'a Pending,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).waiters.remove(&self.id);
    }
}

pub(crate) struct Link {
    outbound: mpsc::Sender<Frame>,
    pending: Pending,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Link {
    /// Start the reader and writer tasks for `stream`.
    ///
    /// `generation` identifies this link; the reader only publishes a state
    /// change when it is still the gateway's current link.
    pub(crate) fn spawn(
        stream: BoxedStream,
        generation: u64,
        current: Arc<AtomicU64>,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound, mut rx) = mpsc::channel::<Frame>(64);
        let pending: Pending = Arc::new(Mutex::new(PendingCalls::default()));

        let writer = tokio::spawn(async move {
            let mut sink = writer(write_half);
            while let Some(frame) = rx.recv().await {
                if let Err(e) = send_frame(&mut sink, &frame).await {
                    warn!(error = %e, "Failed to write to tool provider");
                    break;
                }
            }
        });

        let reader = tokio::spawn(read_loop(
            reader(read_half),
            pending.clone(),
            generation,
            current,
            state,
        ));

        Self {
            outbound,
            pending,
            reader,
            writer,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.reader.is_finished() && !self.writer.is_finished()
    }

    /// Tear the link down. Waiting callers see `RemoteUnavailable`.
    pub(crate) fn shutdown(&self) {
        self.reader.abort();
        self.writer.abort();
        fail_all(&self.pending);
    }

    /// Send one request and wait for its correlated response until `deadline`.
    pub(crate) async fn request(
        &self,
        id: u64,
        method: &str,
        params: impl Serialize,
        deadline: Instant,
    ) -> Result<Response, ToolError> {
        let request = Request::new(id, method, params)
            .map_err(|e| ToolError::RemoteUnavailable(format!("cannot encode {method}: {e}")))?;

        let (tx, rx) = oneshot::channel();
        register(&self.pending, id, tx)?;
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };

        self.outbound
            .send(Frame::Request(request))
            .await
            .map_err(|_| ToolError::RemoteUnavailable("tool provider link is down".into()))?;

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ToolError::RemoteUnavailable(format!(
                "link closed before {method} #{id} was answered"
            ))),
            Err(_) => Err(ToolError::RemoteUnavailable(format!(
                "{method} #{id} timed out"
            ))),
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop<R>(
    mut frames: pawline_protocol::FrameReader<R>,
    pending: Pending,
    generation: u64,
    current: Arc<AtomicU64>,
    state: Arc<watch::Sender<ConnectionState>>,
) where
    R: AsyncRead + Unpin,
{
    while let Some(next) = next_frame(&mut frames).await {
        match next {
            Ok(Frame::Response(response)) => {
                let Some(id) = response.id else {
                    warn!(error = ?response.error, "Tool provider sent an uncorrelated error");
                    continue;
                };
                let waiter = lock(&pending).waiters.remove(&id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!(id, "Dropping response for an abandoned call"),
                }
            }
            Ok(Frame::Request(request)) => {
                warn!(method = %request.method, "Ignoring request from tool provider");
            }
            Err(ProtocolError::Malformed(reason)) => {
                warn!(%reason, "Malformed frame from tool provider");
            }
            Err(e) => {
                warn!(error = %e, "Tool provider link failed");
                break;
            }
        }
    }

    fail_all(&pending);
    if current.load(Ordering::SeqCst) == generation {
        state.send_if_modified(|s| {
            let was_ready = *s == ConnectionState::Ready;
            if was_ready {
                *s = ConnectionState::Closed;
            }
            was_ready
        });
    }
    info!(generation, "Tool provider link closed");
}
