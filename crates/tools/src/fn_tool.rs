//! Closure-backed tools.
//!
//! Most host functions are a descriptor plus a few lines of logic; `FnTool`
//! lets callers register them without declaring a struct per tool.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use llmbind_core::error::ToolError;
use llmbind_core::tool::{Tool, ToolArguments, ToolDescriptor};
use std::future::Future;

type Handler =
    Box<dyn Fn(ToolArguments) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>;

/// A tool whose behavior is a closure.
pub struct FnTool {
    descriptor: ToolDescriptor,
    handler: Handler,
}

impl FnTool {
    /// Wrap an async closure.
    pub fn new<F, Fut>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            descriptor,
            handler: Box::new(move |args| handler(args).boxed()),
        }
    }

    /// Wrap a synchronous closure.
    pub fn sync<F>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(&ToolArguments) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            handler: Box::new(move |args| {
                let result = handler(&args);
                async move { result }.boxed()
            }),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        (self.handler)(arguments).await
    }
}

/// Build an `InvalidArguments` error for `tool` complaining about `param`.
pub fn missing(tool: &str, param: &str) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.into(),
        reason: format!("missing argument '{param}'"),
    }
}
