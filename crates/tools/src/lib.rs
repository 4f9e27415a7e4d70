//! Tool implementations for llmbind.
//!
//! `FnTool` turns a closure into a `Tool`; the calculator module ships a few
//! ready-made math helpers.

pub mod calculator;
pub mod fn_tool;

use llmbind_core::tool::ToolRegistry;

pub use calculator::calculator_tools;
pub use fn_tool::FnTool;

/// Create a registry holding the built-in calculator tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in calculator_tools() {
        if let Err(e) = registry.register(Box::new(tool)) {
            tracing::warn!(error = %e, "Skipping built-in tool");
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_calculator() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["string_length", "add", "sqrt"]);
    }
}
