//! # pawline-protocol
//!
//! The tool transport: JSON-RPC 2.0 frames, one per line, over any
//! bidirectional byte stream. Each request carries a numeric id and the
//! response echoes it, so several calls can be in flight on one connection
//! and complete in any order.
//!
//! Methods:
//! - `initialize` handshake, returns server info and the tool catalog
//! - `tools/list` the catalog alone
//! - `tools/call` run one tool with JSON arguments
//! - `ping` liveness

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{FrameReader, FrameWriter, MAX_FRAME_BYTES, next_frame, reader, send_frame, writer};
pub use error::ProtocolError;
pub use message::{
    CallToolParams, CallToolResult, Frame, InitializeParams, InitializeResult, ListToolsResult,
    PROTOCOL_VERSION, PeerInfo, Request, Response, RpcError, codes, methods,
};
