//! Tool provider endpoint: serves a [`ToolRegistry`] over the line protocol.
//!
//! Each connection gets a reader loop and a writer task. Requests on one
//! connection are handled concurrently and answered as they finish, so
//! responses may leave in a different order than requests arrived.

use pawline_core::tool::ToolRegistry;
use pawline_protocol::{
    CallToolParams, CallToolResult, Frame, InitializeParams, InitializeResult, ListToolsResult,
    PROTOCOL_VERSION, PeerInfo, ProtocolError, Request, Response, RpcError, codes, methods,
    next_frame, reader, send_frame, writer,
};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct ToolServer {
    registry: ToolRegistry,
    info: PeerInfo,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: PeerInfo::new("pawline-scheduler", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Accept loop. Runs until the listener fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        info!(
            addr = %listener.local_addr()?,
            tools = ?self.registry.names(),
            "Tool server listening"
        );
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                info!(%peer, "Tool client connected");
                server.serve_connection(stream).await;
                info!(%peer, "Tool client disconnected");
            });
        }
    }

    /// Serve one bidirectional stream until the peer hangs up.
    pub async fn serve_connection<S>(self: Arc<Self>, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut frames = reader(read_half);
        let (tx, mut rx) = mpsc::channel::<Frame>(64);

        let writer_task = tokio::spawn(async move {
            let mut sink = writer(write_half);
            while let Some(frame) = rx.recv().await {
                if let Err(e) = send_frame(&mut sink, &frame).await {
                    warn!(error = %e, "Failed to write response");
                    break;
                }
            }
        });

        while let Some(next) = next_frame(&mut frames).await {
            match next {
                Ok(Frame::Request(request)) => {
                    let server = self.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let response = server.handle(request).await;
                        let _ = tx.send(Frame::Response(response)).await;
                    });
                }
                Ok(Frame::Response(response)) => {
                    warn!(id = ?response.id, "Ignoring unsolicited response frame");
                }
                Err(ProtocolError::Malformed(reason)) => {
                    debug!(%reason, "Malformed frame");
                    let reply = Response::failure(None, RpcError::new(codes::PARSE_ERROR, reason));
                    if tx.send(Frame::Response(reply)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Closing tool connection");
                    break;
                }
            }
        }

        drop(tx);
        let _ = writer_task.await;
    }

    async fn handle(&self, request: Request) -> Response {
        if request.jsonrpc != "2.0" {
            return Response::failure(
                Some(request.id),
                RpcError::new(codes::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
            );
        }

        debug!(id = request.id, method = %request.method, "Tool request");
        match request.method.as_str() {
            methods::INITIALIZE => self.initialize(&request),
            methods::TOOLS_LIST => Response::success(
                request.id,
                ListToolsResult {
                    tools: self.registry.definitions().to_vec(),
                },
            ),
            methods::TOOLS_CALL => self.call(&request).await,
            methods::PING => Response::success(request.id, serde_json::json!({})),
            other => Response::failure(
                Some(request.id),
                RpcError::new(codes::METHOD_NOT_FOUND, format!("unknown method '{other}'")),
            ),
        }
    }

    fn initialize(&self, request: &Request) -> Response {
        let params: InitializeParams = match request.params() {
            Ok(p) => p,
            Err(e) => return Response::failure(Some(request.id), e),
        };
        if params.protocol_version != PROTOCOL_VERSION {
            return Response::failure(
                Some(request.id),
                RpcError::new(
                    codes::INVALID_PARAMS,
                    format!(
                        "unsupported protocol version '{}', expected '{PROTOCOL_VERSION}'",
                        params.protocol_version
                    ),
                ),
            );
        }
        info!(
            client = %params.client_info.name,
            version = %params.client_info.version,
            "Tool client initialized"
        );
        Response::success(
            request.id,
            InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                server_info: self.info.clone(),
                tools: self.registry.definitions().to_vec(),
            },
        )
    }

    async fn call(&self, request: &Request) -> Response {
        let params: CallToolParams = match request.params() {
            Ok(p) => p,
            Err(e) => return Response::failure(Some(request.id), e),
        };

        match self.registry.invoke(&params.name, params.arguments).await {
            Ok(value) => {
                debug!(tool = %params.name, "Tool call succeeded");
                Response::success(request.id, CallToolResult::ok(value))
            }
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                Response::failure(Some(request.id), RpcError::from_tool_error(&e))
            }
        }
    }
}
