//! Calculator tools: string length, integer addition, square root.

use llmbind_core::error::ToolError;
use llmbind_core::tool::{ParamKind, ToolDescriptor, ToolParameter};

use crate::fn_tool::{missing, FnTool};

/// Counts characters (Unicode scalar values), not bytes.
pub fn string_length() -> FnTool {
    FnTool::sync(
        ToolDescriptor::new("string_length", "Calculates the length of a string")
            .param(ToolParameter::new("s", ParamKind::Text).describe("The string to measure")),
        |args| {
            let s = args.text("s").ok_or_else(|| missing("string_length", "s"))?;
            Ok(s.chars().count().to_string())
        },
    )
}

pub fn add() -> FnTool {
    FnTool::sync(
        ToolDescriptor::new("add", "Calculates the sum of two integers")
            .param(ToolParameter::new("a", ParamKind::Integer))
            .param(ToolParameter::new("b", ParamKind::Integer)),
        |args| {
            let a = args.integer("a").ok_or_else(|| missing("add", "a"))?;
            let b = args.integer("b").ok_or_else(|| missing("add", "b"))?;
            a.checked_add(b)
                .map(|sum| sum.to_string())
                .ok_or_else(|| ToolError::ExecutionFailed {
                    tool_name: "add".into(),
                    reason: format!("{a} + {b} overflows"),
                })
        },
    )
}

pub fn sqrt() -> FnTool {
    FnTool::sync(
        ToolDescriptor::new("sqrt", "Calculates the square root of a number")
            .param(ToolParameter::new("x", ParamKind::Number)),
        |args| {
            let x = args.number("x").ok_or_else(|| missing("sqrt", "x"))?;
            if x < 0.0 {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "sqrt".into(),
                    reason: format!("cannot take the square root of {x}"),
                });
            }
            Ok(x.sqrt().to_string())
        },
    )
}

/// All calculator tools, in registration order.
pub fn calculator_tools() -> Vec<FnTool> {
    vec![string_length(), add(), sqrt()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmbind_core::tool::Tool;
    use serde_json::json;

    async fn run(tool: &FnTool, raw: serde_json::Value) -> Result<String, ToolError> {
        let args = tool.descriptor().bind(&raw)?;
        tool.execute(args).await
    }

    #[tokio::test]
    async fn string_length_counts_chars() {
        assert_eq!(run(&string_length(), json!({"s": "language"})).await.unwrap(), "8");
        assert_eq!(run(&string_length(), json!(["héllo"])).await.unwrap(), "5");
    }

    #[tokio::test]
    async fn add_integers() {
        assert_eq!(run(&add(), json!({"a": 2, "b": 3})).await.unwrap(), "5");
        assert_eq!(run(&add(), json!([40, 2])).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn add_overflow_fails() {
        let err = run(&add(), json!([i64::MAX, 1])).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn add_rejects_fractional() {
        let err = run(&add(), json!({"a": 1.5, "b": 2})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn sqrt_of_sum() {
        assert_eq!(run(&sqrt(), json!({"x": 16})).await.unwrap(), "4");
        assert!(run(&sqrt(), json!({"x": -1})).await.is_err());
    }

    #[test]
    fn signatures() {
        let sigs: Vec<String> = calculator_tools()
            .iter()
            .map(|t| t.descriptor().signature())
            .collect();
        assert_eq!(
            sigs,
            vec!["string_length(s: text)", "add(a: integer, b: integer)", "sqrt(x: number)"]
        );
    }
}
