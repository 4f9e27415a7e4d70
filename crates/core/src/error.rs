//! Error types for the llmbind domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The invocation-level
//! taxonomy (template binding, unparsable response, unknown tool, bad tool
//! arguments, runaway tool loop, backend unavailable, backend timeout) lives
//! on [`Error`] directly; each bounded context keeps its own detail enum.

use thiserror::Error;

/// The top-level error type for all llmbind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Caller errors ---
    #[error("Template binding failed: {0}")]
    TemplateBinding(#[from] TemplateBindingError),

    #[error("Contract error: {message}")]
    Contract { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Model output errors ---
    #[error("Unparsable response: {0}")]
    UnparsableResponse(#[from] ParseError),

    #[error("Model requested unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool {tool}: {reason}")]
    ToolArgument { tool: String, reason: String },

    #[error("Tool loop exceeded the limit of {max_rounds} round-trips")]
    ToolLoopExceeded { max_rounds: u32 },

    // --- Environment errors ---
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(ProviderError),

    #[error("Model backend timed out after {timeout_ms}ms")]
    BackendTimeout { timeout_ms: u64 },

    #[error("Tool error: {0}")]
    Tool(ToolError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Who is to blame for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller's template, contract, arguments, or configuration were wrong.
    Caller,
    /// The model backend, a tool, or a store failed.
    Environment,
    /// The model answered, but the answer could not be used.
    ModelOutput,
}

impl Error {
    /// Classify this error for the caller.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::TemplateBinding(_) | Error::Contract { .. } | Error::Config { .. } => {
                ErrorCategory::Caller
            }
            Error::UnparsableResponse(_)
            | Error::UnknownTool { .. }
            | Error::ToolArgument { .. }
            | Error::ToolLoopExceeded { .. } => ErrorCategory::ModelOutput,
            Error::BackendUnavailable(_)
            | Error::BackendTimeout { .. }
            | Error::Tool(_)
            | Error::Memory(_)
            | Error::Serialization(_)
            | Error::Internal(_) => ErrorCategory::Environment,
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout { timeout_ms } => Error::BackendTimeout { timeout_ms },
            other => Error::BackendUnavailable(other),
        }
    }
}

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(name) => Error::UnknownTool { name },
            ToolError::InvalidArguments { tool, reason } => Error::ToolArgument { tool, reason },
            other => Error::Tool(other),
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateBindingError {
    #[error("placeholder {{{placeholder}}} has no argument")]
    MissingArgument { placeholder: String },

    #[error("argument '{argument}' matches no placeholder")]
    UnusedArgument { argument: String },

    #[error("malformed template at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

/// A model response that could not be read as the requested shape.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {target}: {reason}")]
pub struct ParseError {
    /// Human-readable description of the requested shape.
    pub target: String,
    /// Why parsing failed.
    pub reason: String,
}

impl ParseError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_timeout_maps_to_backend_timeout() {
        let err: Error = ProviderError::Timeout { timeout_ms: 1500 }.into();
        assert!(matches!(err, Error::BackendTimeout { timeout_ms: 1500 }));
        assert_eq!(err.category(), ErrorCategory::Environment);
    }

    #[test]
    fn provider_failure_maps_to_backend_unavailable() {
        let err: Error = ProviderError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        }
        .into();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn tool_errors_split_into_taxonomy() {
        let unknown: Error = ToolError::NotFound("teleport".into()).into();
        assert!(matches!(unknown, Error::UnknownTool { ref name } if name == "teleport"));
        assert_eq!(unknown.category(), ErrorCategory::ModelOutput);

        let bad_args: Error = ToolError::InvalidArguments {
            tool: "add".into(),
            reason: "missing 'b'".into(),
        }
        .into();
        assert!(matches!(bad_args, Error::ToolArgument { .. }));

        let failed: Error = ToolError::ExecutionFailed {
            tool_name: "sqrt".into(),
            reason: "negative input".into(),
        }
        .into();
        assert_eq!(failed.category(), ErrorCategory::Environment);
    }

    #[test]
    fn template_errors_are_caller_errors() {
        let err: Error = TemplateBindingError::MissingArgument {
            placeholder: "text".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Caller);
        assert!(err.to_string().contains("{text}"));
    }

    #[test]
    fn parse_error_displays_target() {
        let err = Error::from(ParseError::new("integer", "no number found in 'forty two'"));
        assert!(err.to_string().contains("integer"));
        assert!(err.to_string().contains("forty two"));
    }
}
