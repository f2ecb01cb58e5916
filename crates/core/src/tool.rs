//! Tool domain: definitions, calls, results, and the two tool seams.
//!
//! - [`Tool`] + [`ToolRegistry`] live on the provider side: actions are
//!   declared once at startup and invoked with schema-validated arguments.
//! - [`ToolInvoker`] lives on the assistant side: it exposes an immutable
//!   [`ToolCatalog`] snapshot and forwards calls (to a remote gateway, or
//!   directly to an in-process registry).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::ToolError;
use crate::message::MessageToolCall;

/// The JSON type a tool parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
        }
    }

    /// Whether `value` is acceptable for this kind.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            ParameterKind::Number => value.is_number(),
            ParameterKind::Boolean => value.is_boolean(),
        }
    }
}

/// One named, typed parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ToolParameter {
    pub fn required(
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// A tool as declared by its provider: name, description, ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name, unique within a provider
    pub name: String,

    /// Description of what the tool does (sent to the LLM)
    pub description: String,

    /// Ordered parameter list
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ToolParameter>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Render the parameter list as a JSON Schema object.
    pub fn json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                serde_json::json!({
                    "type": p.kind.as_str(),
                    "description": p.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `arguments` against the declared parameters.
    ///
    /// Unknown extra keys are ignored; missing required or mistyped values fail.
    pub fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        let Some(args) = arguments.as_object() else {
            return Err(ToolError::invalid_arguments(
                &self.name,
                "arguments must be a JSON object",
            ));
        };

        for p in &self.parameters {
            match args.get(&p.name) {
                None | Some(serde_json::Value::Null) if p.required => {
                    return Err(ToolError::invalid_arguments(
                        &self.name,
                        format!("missing required parameter '{}'", p.name),
                    ));
                }
                None | Some(serde_json::Value::Null) => {}
                Some(value) if !p.kind.accepts(value) => {
                    return Err(ToolError::invalid_arguments(
                        &self.name,
                        format!("parameter '{}' must be of type {}", p.name, p.kind.as_str()),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// A request to execute a tool (the completion engine's tool-call intent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Decode the intent carried by an assistant message.
    ///
    /// An empty argument string is treated as `{}`; malformed JSON is an
    /// `InvalidArguments` error, never silently replaced.
    pub fn from_message(call: &MessageToolCall) -> Result<Self, ToolError> {
        let raw = call.arguments.trim();
        let arguments = if raw.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).map_err(|e| {
                ToolError::invalid_arguments(&call.name, format!("arguments are not valid JSON: {e}"))
            })?
        };
        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        })
    }
}

/// The result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The tool that produced it
    pub tool_name: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output rendered as text (what the LLM sees)
    pub output: String,

    /// Structured value, when the tool returned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// Wrap a successful result value.
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        let output = match &value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            output,
            data: Some(value),
        }
    }

    /// A failure reported back to the completion engine as a tool result.
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: &ToolError,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: false,
            output: format!("Error: {error}"),
            data: None,
        }
    }
}

/// An immutable snapshot of the tools known to the assistant.
///
/// Taken once at startup; never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Arc<[ToolDefinition]>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools: tools.into(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl PartialEq for ToolCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.tools[..] == other.tools[..]
    }
}

/// The core Tool trait (provider side).
///
/// Each action (e.g. `schedule`) implements this trait and is declared in a
/// [`ToolRegistry`]. Arguments are validated before `execute` is called.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "schedule").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The ordered parameter list.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for the catalog.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

/// A registry of declared tools.
///
/// Declaration order is kept so the published catalog is stable.
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            tools: HashMap::new(),
        }
    }

    /// Declare a tool. A second tool with the same name is a configuration error.
    pub fn declare(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let definition = tool.to_definition();
        if self.tools.contains_key(&definition.name) {
            return Err(ToolError::DuplicateTool(definition.name));
        }
        debug!(tool = %definition.name, params = definition.parameters.len(), "Tool declared");
        self.tools.insert(definition.name.clone(), tool);
        self.definitions.push(definition);
        Ok(())
    }

    /// Get a tool definition by name.
    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// All definitions, in declaration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Validate `arguments` against the stored schema, then run the tool.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let (Some(definition), Some(tool)) = (self.definition(name), self.tools.get(name)) else {
            return Err(ToolError::NotFound(name.to_string()));
        };
        definition.validate(&arguments)?;
        tool.execute(arguments).await
    }

    /// List all declared tool names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Assistant-side capability: a fixed catalog plus a way to call into it.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// The catalog snapshot offered to the completion engine.
    fn catalog(&self) -> ToolCatalog;

    /// Execute one tool-call intent.
    async fn call(&self, call: &ToolCall) -> Result<ToolResult, ToolError>;
}

/// In-process invocation: lets tests and offline runs inject a fixed catalog
/// without a live tool provider.
#[async_trait]
impl ToolInvoker for ToolRegistry {
    fn catalog(&self) -> ToolCatalog {
        ToolCatalog::new(self.definitions.clone())
    }

    async fn call(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let value = self.invoke(&call.name, call.arguments.clone()).await?;
        Ok(ToolResult::success(&call.id, &call.name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters(&self) -> Vec<ToolParameter> {
            vec![
                ToolParameter::required("text", ParameterKind::String, "text to echo"),
                ToolParameter::optional("times", ParameterKind::Integer, "repeat count"),
            ]
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
            let text = arguments["text"].as_str().unwrap_or_default();
            let times = arguments["times"].as_u64().unwrap_or(1) as usize;
            Ok(serde_json::Value::String(text.repeat(times)))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.declare(Arc::new(EchoTool)).unwrap();
        registry
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let mut registry = registry();
        let err = registry.declare(Arc::new(EchoTool)).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn json_schema_lists_required_only() {
        let schema = registry().definition("echo").unwrap().json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["times"]["type"], "integer");
        assert_eq!(schema["required"], serde_json::json!(["text"]));
    }

    #[tokio::test]
    async fn invoke_runs_valid_call() {
        let out = registry()
            .invoke("echo", serde_json::json!({"text": "woof", "times": 2}))
            .await
            .unwrap();
        assert_eq!(out, "woofwoof");
    }

    #[tokio::test]
    async fn invoke_rejects_missing_parameter() {
        let err = registry()
            .invoke("echo", serde_json::json!({"times": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { reason, .. } if reason.contains("text")));
    }

    #[tokio::test]
    async fn invoke_rejects_mistyped_parameter() {
        let err = registry()
            .invoke("echo", serde_json::json!({"text": "woof", "times": "two"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn invoke_rejects_non_object() {
        let err = registry()
            .invoke("echo", serde_json::json!(["woof"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn invoke_missing_tool() {
        let err = registry()
            .invoke("nonexistent", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn integral_float_counts_as_integer() {
        assert!(ParameterKind::Integer.accepts(&serde_json::json!(42.0)));
        assert!(!ParameterKind::Integer.accepts(&serde_json::json!(42.5)));
        assert!(!ParameterKind::Integer.accepts(&serde_json::json!("42")));
    }

    #[test]
    fn tool_call_from_message_parses_arguments() {
        let call = ToolCall::from_message(&MessageToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: r#"{"text":"hi"}"#.into(),
        })
        .unwrap();
        assert_eq!(call.arguments["text"], "hi");

        let empty = ToolCall::from_message(&MessageToolCall {
            id: "call_2".into(),
            name: "echo".into(),
            arguments: String::new(),
        })
        .unwrap();
        assert!(empty.arguments.as_object().unwrap().is_empty());

        let err = ToolCall::from_message(&MessageToolCall {
            id: "call_3".into(),
            name: "echo".into(),
            arguments: "{not json".into(),
        })
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn registry_as_invoker_wraps_result() {
        let registry = registry();
        let catalog = registry.catalog();
        assert!(catalog.contains("echo"));

        let result = registry
            .call(&ToolCall {
                id: "call_1".into(),
                name: "echo".into(),
                arguments: serde_json::json!({"text": "hello"}),
            })
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
        assert_eq!(result.tool_name, "echo");
    }

    #[test]
    fn catalog_equality_compares_definitions() {
        let a = registry().catalog();
        let b = registry().catalog();
        assert_eq!(a, b);
        assert_ne!(a, ToolCatalog::default());
    }
}
