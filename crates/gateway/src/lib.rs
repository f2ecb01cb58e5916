//! Tool Gateway for pawline.
//!
//! The assistant-side end of the tool transport. One [`ToolGateway`] owns a
//! single long-lived duplex link to a tool provider:
//!
//! - `connect` opens the link and performs the `initialize` handshake, which
//!   yields the provider's catalog. The catalog is frozen into a
//!   [`ToolCatalog`] snapshot and never re-read.
//! - `call` forwards a tool-call intent as a `tools/call` request. Requests
//!   are correlated by id, so any number of calls may be outstanding on the
//!   shared link at once.
//! - `reconnect` and `close` drive the link lifecycle explicitly; the current
//!   [`ConnectionState`] is published on a `watch` channel.

mod link;

use async_trait::async_trait;
use pawline_config::ToolsConfig;
use pawline_core::deadline::deadline_after;
use pawline_core::error::ToolError;
use pawline_core::tool::{ToolCall, ToolCatalog, ToolInvoker, ToolResult};
use pawline_protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, PROTOCOL_VERSION,
    PeerInfo, codes, methods,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use link::{BoxedStream, Link};

/// Lifecycle of the gateway's link to its tool provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Ready,
    Reconnecting,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// Bounds both the TCP connect and the handshake.
    pub connect_timeout: Duration,
    /// Ceiling for a single `tools/call` round trip.
    pub call_timeout: Duration,
    pub client_info: PeerInfo,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
            client_info: PeerInfo::new("pawline", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GatewayOptions {
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            ..Self::default()
        }
    }
}

pub struct ToolGateway {
    addr: Option<String>,
    options: GatewayOptions,
    catalog: ToolCatalog,
    server_info: PeerInfo,
    link: RwLock<Option<Arc<Link>>>,
    generation: Arc<AtomicU64>,
    next_id: AtomicU64,
    state: Arc<watch::Sender<ConnectionState>>,
    shut_down: AtomicBool,
}

impl ToolGateway {
    /// Connect to a provider over TCP and discover its catalog.
    pub async fn connect(addr: impl Into<String>, options: GatewayOptions) -> Result<Self, ToolError> {
        let addr = addr.into();
        info!(addr = %addr, "Connecting to tool provider");
        let stream = open_tcp(&addr, options.connect_timeout).await?;
        Self::establish(Some(addr), Box::new(stream), options).await
    }

    /// Run the gateway over an already-open stream.
    ///
    /// Such a gateway cannot reconnect, since it has no address to dial.
    pub async fn connect_stream<S>(stream: S, options: GatewayOptions) -> Result<Self, ToolError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::establish(None, Box::new(stream), options).await
    }

    async fn establish(
        addr: Option<String>,
        stream: BoxedStream,
        options: GatewayOptions,
    ) -> Result<Self, ToolError> {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(state);
        let generation = Arc::new(AtomicU64::new(1));
        let link = Link::spawn(stream, 1, generation.clone(), state.clone());
        let next_id = AtomicU64::new(1);

        let init = handshake(&link, next_id.fetch_add(1, Ordering::Relaxed), &options).await?;
        let catalog = ToolCatalog::new(init.tools);
        info!(
            provider = %init.server_info.name,
            version = %init.server_info.version,
            tools = ?catalog.names(),
            "Tool catalog discovered"
        );
        state.send_replace(ConnectionState::Ready);

        Ok(Self {
            addr,
            options,
            catalog,
            server_info: init.server_info,
            link: RwLock::new(Some(Arc::new(link))),
            generation,
            next_id,
            state,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn server_info(&self) -> &PeerInfo {
        &self.server_info
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Round-trip a `ping` and report how long it took.
    pub async fn ping(&self) -> Result<Duration, ToolError> {
        let link = self.current_link().await?;
        let started = Instant::now();
        let response = link
            .request(
                self.next_id(),
                methods::PING,
                serde_json::json!({}),
                deadline_after(started, self.options.call_timeout),
            )
            .await?;
        response
            .into_result::<serde_json::Value>()
            .map_err(|e| ToolError::RemoteUnavailable(format!("ping rejected: {}", e.message)))?;
        Ok(started.elapsed())
    }

    /// Drop the current link, dial again and re-handshake.
    ///
    /// The catalog snapshot taken at startup is kept; a provider that now
    /// advertises something different is only reported.
    pub async fn reconnect(&self) -> Result<(), ToolError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ToolError::RemoteUnavailable("tool gateway is closed".into()));
        }
        let Some(addr) = self.addr.as_deref() else {
            return Err(ToolError::RemoteUnavailable(
                "tool gateway has no address to reconnect to".into(),
            ));
        };

        self.state.send_replace(ConnectionState::Reconnecting);
        let mut slot = self.link.write().await;
        if let Some(old) = slot.take() {
            old.shutdown();
        }

        let result = async {
            let stream = open_tcp(addr, self.options.connect_timeout).await?;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let link = Link::spawn(
                Box::new(stream),
                generation,
                self.generation.clone(),
                self.state.clone(),
            );
            match handshake(&link, self.next_id(), &self.options).await {
                Ok(init) => Ok((link, init)),
                Err(e) => {
                    link.shutdown();
                    Err(e)
                }
            }
        }
        .await;

        match result {
            Ok((link, init)) => {
                if ToolCatalog::new(init.tools) != self.catalog {
                    warn!(addr = %addr, "Tool provider catalog changed; keeping the startup snapshot");
                }
                *slot = Some(Arc::new(link));
                self.state.send_replace(ConnectionState::Ready);
                info!(addr = %addr, "Reconnected to tool provider");
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(ConnectionState::Closed);
                warn!(addr = %addr, error = %e, "Reconnect failed");
                Err(e)
            }
        }
    }

    /// Close the link for good. Outstanding calls fail with `RemoteUnavailable`.
    pub async fn close(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if let Some(link) = self.link.write().await.take() {
            link.shutdown();
        }
        self.state.send_replace(ConnectionState::Closed);
        info!("Tool gateway closed");
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn current_link(&self) -> Result<Arc<Link>, ToolError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ToolError::RemoteUnavailable("tool gateway is closed".into()));
        }
        match self.link.read().await.as_ref() {
            Some(link) if link.is_alive() => Ok(link.clone()),
            _ => Err(ToolError::RemoteUnavailable(
                "not connected to the tool provider".into(),
            )),
        }
    }
}

#[async_trait]
impl ToolInvoker for ToolGateway {
    fn catalog(&self) -> ToolCatalog {
        self.catalog.clone()
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let Some(definition) = self.catalog.get(&call.name) else {
            return Err(ToolError::invalid_arguments(
                &call.name,
                "no such tool in the discovered catalog",
            ));
        };
        definition.validate(&call.arguments)?;

        let link = self.current_link().await?;
        let id = self.next_id();
        let started = Instant::now();
        let params = CallToolParams {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        };
        let response = link
            .request(
                id,
                methods::TOOLS_CALL,
                params,
                deadline_after(started, self.options.call_timeout),
            )
            .await?;

        let outcome: CallToolResult = response
            .into_result()
            .map_err(|e| e.into_tool_error(&call.name))?;
        debug!(
            tool = %call.name,
            id,
            duration_ms = started.elapsed().as_millis() as u64,
            "Remote tool call finished"
        );

        if outcome.is_error {
            return Err(ToolError::RemoteToolError {
                tool_name: call.name.clone(),
                code: codes::TOOL_EXECUTION_FAILED,
                message: match outcome.content {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            });
        }
        Ok(ToolResult::success(&call.id, &call.name, outcome.content))
    }
}

async fn open_tcp(addr: &str, timeout: Duration) -> Result<TcpStream, ToolError> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ToolError::RemoteUnavailable(format!("connecting to {addr} timed out")))?
        .map_err(|e| ToolError::RemoteUnavailable(format!("cannot connect to {addr}: {e}")))?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Could not disable Nagle on tool link");
    }
    Ok(stream)
}

async fn handshake(
    link: &Link,
    id: u64,
    options: &GatewayOptions,
) -> Result<InitializeResult, ToolError> {
    let params = InitializeParams {
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_info: options.client_info.clone(),
    };
    let response = link
        .request(
            id,
            methods::INITIALIZE,
            params,
            deadline_after(Instant::now(), options.connect_timeout),
        )
        .await?;
    let init: InitializeResult = response
        .into_result()
        .map_err(|e| ToolError::RemoteUnavailable(format!("handshake rejected: {}", e.message)))?;
    if init.protocol_version != PROTOCOL_VERSION {
        return Err(ToolError::RemoteUnavailable(format!(
            "provider speaks '{}', expected '{PROTOCOL_VERSION}'",
            init.protocol_version
        )));
    }
    Ok(init)
}

#[cfg(test)]
mod tests;
