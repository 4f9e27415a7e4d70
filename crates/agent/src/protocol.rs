//! Tool-call protocol, version 1.
//!
//! The model asks for a tool by writing a line
//!
//! ```text
//! TOOL_CALL v1 {"name": "add", "arguments": {"a": 2, "b": 3}}
//! ```
//!
//! `arguments` may also be a JSON array of positional values, or omitted for
//! parameterless tools. Any response without the marker is a final answer.
//! Tool output goes back to the model as a `tool` turn `add => 5`.

use llmbind_core::error::ParseError;
use llmbind_core::message::Turn;
use llmbind_core::tool::{ToolDescriptor, ToolInvocationRequest};
use serde_json::Value;

pub const MARKER: &str = "TOOL_CALL";
pub const VERSION: &str = "v1";

const TARGET: &str = "tool call";

/// Standing instructions listing the callable tools.
pub fn system_instructions(tools: &[&ToolDescriptor]) -> String {
    let mut out = format!(
        "You can call host tools. To call one, reply with exactly one line and nothing else:\n\
         {MARKER} {VERSION} {{\"name\": \"<tool>\", \"arguments\": {{\"<parameter>\": <value>}}}}\n\
         You will receive the result as `<tool> => <result>`; then either call another tool \
         or give your final answer without the {MARKER} marker.\n\nAvailable tools:\n"
    );
    for tool in tools {
        out.push_str(&format!("- {}: {}\n", tool.signature(), tool.description));
    }
    out
}

/// Extract a tool request from a model response.
///
/// `Ok(None)` means the response is a final answer. A marker followed by
/// anything other than a well-formed v1 payload is an error, never a
/// silent final answer.
pub fn parse_tool_call(response: &str) -> Result<Option<ToolInvocationRequest>, ParseError> {
    let Some(start) = find_marker(response) else {
        return Ok(None);
    };

    let rest = response[start + MARKER.len()..].trim_start();
    let Some(payload) = rest.strip_prefix(VERSION) else {
        let version = rest.split_whitespace().next().unwrap_or_default();
        return Err(ParseError::new(
            TARGET,
            format!("unsupported protocol version '{version}' (expected {VERSION})"),
        ));
    };

    let value = serde_json::Deserializer::from_str(payload.trim_start())
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| ParseError::new(TARGET, "missing JSON payload"))?
        .map_err(|e| ParseError::new(TARGET, format!("invalid JSON payload: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(ParseError::new(TARGET, "payload must be a JSON object"));
    };
    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => return Err(ParseError::new(TARGET, "payload needs a string 'name'")),
    };

    Ok(Some(ToolInvocationRequest {
        tool: name,
        arguments: object.remove("arguments").unwrap_or(Value::Null),
    }))
}

/// The marker only counts at the start of a line (after optional
/// whitespace or a code fence's backticks).
fn find_marker(response: &str) -> Option<usize> {
    let mut offset = 0;
    for line in response.split_inclusive('\n') {
        let trimmed = line.trim_start().trim_start_matches('`').trim_start();
        if trimmed.starts_with(MARKER) {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Render a request in protocol form.
pub fn render_tool_call(request: &ToolInvocationRequest) -> String {
    let payload = serde_json::json!({
        "name": request.tool,
        "arguments": request.arguments,
    });
    format!("{MARKER} {VERSION} {payload}")
}

/// The turn that feeds a tool's output back to the model.
pub fn tool_result_turn(tool: &str, output: &str) -> Turn {
    Turn::tool(format!("{tool} => {output}"))
}
