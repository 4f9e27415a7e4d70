//! Tool trait: host functions the model may ask to run mid-conversation.
//!
//! A tool publishes a [`ToolDescriptor`] (name, ordered typed parameters).
//! Raw arguments from the model are bound against that schema before the
//! tool ever sees them, so implementations read already-coerced values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use crate::error::ToolError;

/// The type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Number,
    Text,
    Boolean,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Text => "text",
            ParamKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Name, purpose, and parameter schema of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order; positional arguments bind in this order.
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// One-line signature, e.g. `add(a: integer, b: integer)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.kind))
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Validate raw model arguments against the schema and coerce them.
    ///
    /// Accepts an object keyed by parameter name, an array of positional
    /// values, `null` for parameterless tools, or a bare scalar when the tool
    /// has exactly one parameter.
    pub fn bind(&self, raw: &Value) -> Result<ToolArguments, ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            tool: self.name.clone(),
            reason,
        };

        let supplied: Vec<(String, Value)> = match raw {
            Value::Null => Vec::new(),
            Value::Object(map) => {
                if let Some(extra) = map
                    .keys()
                    .find(|k| !self.parameters.iter().any(|p| &p.name == *k))
                {
                    return Err(invalid(format!("unexpected argument '{extra}'")));
                }
                self.parameters
                    .iter()
                    .filter_map(|p| map.get(&p.name).map(|v| (p.name.clone(), v.clone())))
                    .collect()
            }
            Value::Array(values) => {
                if values.len() != self.parameters.len() {
                    return Err(invalid(format!(
                        "expected {} positional arguments, got {}",
                        self.parameters.len(),
                        values.len()
                    )));
                }
                self.parameters
                    .iter()
                    .zip(values)
                    .map(|(p, v)| (p.name.clone(), v.clone()))
                    .collect()
            }
            scalar if self.parameters.len() == 1 => {
                vec![(self.parameters[0].name.clone(), scalar.clone())]
            }
            other => {
                return Err(invalid(format!("cannot bind {other} to {}", self.signature())));
            }
        };

        let mut values = Vec::with_capacity(self.parameters.len());
        for param in &self.parameters {
            let raw_value = supplied
                .iter()
                .find(|(name, _)| name == &param.name)
                .map(|(_, v)| v)
                .ok_or_else(|| invalid(format!("missing argument '{}'", param.name)))?;
            let coerced = coerce(raw_value, param.kind).ok_or_else(|| {
                invalid(format!(
                    "argument '{}' must be {}, got {raw_value}",
                    param.name, param.kind
                ))
            })?;
            values.push((param.name.clone(), coerced));
        }

        Ok(ToolArguments { values })
    }
}

fn coerce(value: &Value, kind: ParamKind) -> Option<Value> {
    match kind {
        ParamKind::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| fits_i64(*f)).map(|f| f as i64))
                .map(Value::from),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        ParamKind::Number => match value {
            Value::Number(n) => n.as_f64().map(Value::from),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::from),
            _ => None,
        },
        ParamKind::Text => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        ParamKind::Boolean => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

/// Whole and within `i64`. `i64::MAX as f64` rounds up to 2^63, so the
/// upper bound is exclusive.
pub fn fits_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Arguments that passed schema validation, in parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Vec<(String, Value)>,
}

impl ToolArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A request, parsed out of a model response, to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Name of the tool to execute
    pub tool: String,

    /// Raw arguments as the model wrote them
    #[serde(default)]
    pub arguments: Value,
}

/// A host function the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description, and parameter schema.
    fn descriptor(&self) -> &ToolDescriptor;

    /// The unique name of this tool.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: ToolArguments) -> std::result::Result<String, ToolError>;
}

/// The set of tools one assistant exposes to the model.
///
/// Names are unique; registration order is preserved so the tool list sent
/// to the model is deterministic.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Fails if a tool with the same name already exists.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Descriptors of all tools, in registration order.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Resolve, bind, and execute a tool request.
    pub async fn execute(&self, request: &ToolInvocationRequest) -> std::result::Result<String, ToolError> {
        let tool = self
            .get(&request.tool)
            .ok_or_else(|| ToolError::NotFound(request.tool.clone()))?;
        let arguments = tool.descriptor().bind(&request.arguments)?;
        tool.execute(arguments).await
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Echoes its single text argument.
    struct EchoTool {
        descriptor: ToolDescriptor,
    }

    impl EchoTool {
        fn new() -> Self {
            Self {
                descriptor: ToolDescriptor::new("echo", "Echoes back the input")
                    .param(ToolParameter::new("text", ParamKind::Text)),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, arguments: ToolArguments) -> std::result::Result<String, ToolError> {
            Ok(arguments.text("text").unwrap_or_default().to_string())
        }
    }

    fn add_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("add", "Adds two integers")
            .param(ToolParameter::new("a", ParamKind::Integer))
            .param(ToolParameter::new("b", ParamKind::Integer))
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::new())).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::new())).unwrap();
        let err = registry.register(Box::new(EchoTool::new())).unwrap_err();
        assert!(matches!(err, ToolError::Duplicate(ref n) if n == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool::new())).unwrap();

        let request = ToolInvocationRequest {
            tool: "echo".into(),
            arguments: json!({"text": "hello world"}),
        };
        assert_eq!(registry.execute(&request).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let request = ToolInvocationRequest {
            tool: "nonexistent".into(),
            arguments: json!({}),
        };
        let err = registry.execute(&request).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn bind_named_and_positional() {
        let descriptor = add_descriptor();
        let named = descriptor.bind(&json!({"b": 2, "a": "40"})).unwrap();
        assert_eq!(named.integer("a"), Some(40));
        assert_eq!(named.integer("b"), Some(2));

        let positional = descriptor.bind(&json!([1, 2.0])).unwrap();
        assert_eq!(positional.integer("a"), Some(1));
        assert_eq!(positional.integer("b"), Some(2));
    }

    #[test]
    fn bind_rejects_missing_extra_and_mistyped() {
        let descriptor = add_descriptor();
        assert!(descriptor.bind(&json!({"a": 1})).is_err());
        assert!(descriptor.bind(&json!({"a": 1, "b": 2, "c": 3})).is_err());
        assert!(descriptor.bind(&json!({"a": "one", "b": 2})).is_err());
        assert!(descriptor.bind(&json!({"a": 1.5, "b": 2})).is_err());
        assert!(descriptor.bind(&json!([1])).is_err());
    }

    #[test]
    fn bind_rejects_integers_beyond_i64() {
        let descriptor = add_descriptor();
        for huge in [json!(1e30), json!(-1e30), json!(9223372036854775808.0)] {
            let err = descriptor.bind(&json!({"a": huge, "b": 1})).unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments { .. }), "{err:?}");
        }
        assert!(fits_i64(-9223372036854775808.0));
    }

    #[test]
    fn bind_single_scalar_to_single_parameter() {
        let descriptor = ToolDescriptor::new("sqrt", "Square root")
            .param(ToolParameter::new("x", ParamKind::Number));
        let args = descriptor.bind(&json!("16")).unwrap();
        assert_eq!(args.number("x"), Some(16.0));
    }

    #[test]
    fn signature_lists_parameters_in_order() {
        assert_eq!(add_descriptor().signature(), "add(a: integer, b: integer)");
    }
}
