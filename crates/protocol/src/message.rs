//! JSON-RPC 2.0 envelopes and the typed payloads of each method.

use pawline_core::{ToolDefinition, ToolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Version string exchanged during `initialize`.
pub const PROTOCOL_VERSION: &str = "pawline-tools/1";

pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const PING: &str = "ping";
}

pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TOOL_EXECUTION_FAILED: i64 = -32000;
    pub const UNKNOWN_TOOL: i64 = -32001;
}

/// A JSON-RPC request. `id` correlates the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(id: u64, method: &str, params: impl Serialize) -> Result<Self, ProtocolError> {
        let params = serde_json::to_value(params).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.to_string(),
            params,
        })
    }

    /// Decode `params` into the method's typed payload.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| RpcError::new(codes::INVALID_PARAMS, format!("invalid params: {e}")))
    }
}

/// A JSON-RPC response: exactly one of `result` or `error` is set.
///
/// `id` is null only when the offending request could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: u64, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id: Some(id),
                result: Some(value),
                error: None,
            },
            Err(e) => Self::failure(
                Some(id),
                RpcError::new(codes::INTERNAL_ERROR, format!("unserializable result: {e}")),
            ),
        }
    }

    pub fn failure(id: Option<u64>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Unwrap into the typed result, or the remote error.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let value = self.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value)
            .map_err(|e| RpcError::new(codes::INTERNAL_ERROR, format!("unexpected result shape: {e}")))
    }
}

/// The JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The provider-side rendering of a tool failure.
    pub fn from_tool_error(error: &ToolError) -> Self {
        let code = match error {
            ToolError::NotFound(_) => codes::UNKNOWN_TOOL,
            ToolError::InvalidArguments { .. } => codes::INVALID_PARAMS,
            _ => codes::TOOL_EXECUTION_FAILED,
        };
        Self::new(code, error.to_string())
    }

    /// The assistant-side reading of a failed `tools/call`.
    ///
    /// Argument rejections keep their meaning; everything else the provider
    /// reports is a remote tool error carrying the original code.
    pub fn into_tool_error(self, tool_name: &str) -> ToolError {
        match self.code {
            codes::INVALID_PARAMS => ToolError::invalid_arguments(tool_name, self.message),
            code => ToolError::RemoteToolError {
                tool_name: tool_name.to_string(),
                code,
                message: self.message,
            },
        }
    }
}

/// One line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub name: String,
    pub version: String,
}

impl PeerInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub client_info: PeerInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub server_info: PeerInfo,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default = "empty_object")]
    pub arguments: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn ok(content: serde_json::Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }
}
