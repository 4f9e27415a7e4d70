//! The tool dispatch loop.
//!
//! One run drives a conversation from a prompt to a final answer:
//!
//! ```text
//! AwaitingModel -> ModelResponded -> ToolRequested -> ToolExecuted -> AwaitingModel
//!                                 \-> Finalized
//! ```
//!
//! Every state change is logged at `debug`. Failures are terminal: nothing
//! is retried here, and the caller decides what to remember.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use llmbind_core::error::{Error, ProviderError};
use llmbind_core::event::{DomainEvent, EventBus};
use llmbind_core::message::Turn;
use llmbind_core::provider::{GenerateRequest, ModelBackend};
use llmbind_core::tool::{ToolInvocationRequest, ToolRegistry};
use tracing::{debug, info, warn};

use crate::protocol;

pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// Sampling settings passed through to every model call.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    ModelResponded(String),
    ToolRequested(ToolInvocationRequest),
    ToolExecuted,
    Finalized(String),
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// The final response text.
    pub answer: String,

    /// Tool requests and results, in the order they happened. Excludes the
    /// opening user turn and the final answer.
    pub exchange: Vec<Turn>,

    pub model_calls: u32,
}

/// Orchestrates model calls and tool execution for one prompt.
pub struct ToolLoop {
    backend: Arc<dyn ModelBackend>,
    settings: ModelSettings,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: u32,
    timeout: Option<Duration>,
    event_bus: Arc<EventBus>,
}

impl ToolLoop {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        settings: ModelSettings,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            backend,
            settings,
            tools,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            timeout: None,
            event_bus,
        }
    }

    /// Fail once the model has asked for this many tools in one run.
    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max.max(1);
        self
    }

    /// Bound every model call; elapsed calls fail with `BackendTimeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn max_tool_rounds(&self) -> u32 {
        self.max_tool_rounds
    }

    /// Protocol instructions, present only when tools are registered.
    pub fn system_prompt(&self) -> Option<String> {
        if self.tools.is_empty() {
            None
        } else {
            Some(protocol::system_instructions(&self.tools.descriptors()))
        }
    }

    /// Run the loop for `prompt` on top of `history`.
    pub async fn run(&self, history: &[Turn], prompt: &str) -> Result<LoopOutcome, Error> {
        let system = self.system_prompt();
        let mut exchange: Vec<Turn> = Vec::new();
        let mut model_calls = 0u32;
        let mut tool_requests = 0u32;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    model_calls += 1;
                    let request = self.build_request(system.clone(), history, prompt, &exchange);
                    LoopState::ModelResponded(self.call_model(request, model_calls).await?)
                }
                LoopState::ModelResponded(text) => match protocol::parse_tool_call(&text)? {
                    Some(request) => {
                        debug!(tool = %request.tool, round = model_calls, "Model requested a tool");
                        exchange.push(Turn::assistant(text.trim()));
                        LoopState::ToolRequested(request)
                    }
                    None => LoopState::Finalized(text),
                },
                LoopState::ToolRequested(request) => {
                    tool_requests += 1;
                    if tool_requests >= self.max_tool_rounds {
                        warn!(
                            max_rounds = self.max_tool_rounds,
                            tool = %request.tool,
                            "Tool round limit reached"
                        );
                        return Err(Error::ToolLoopExceeded {
                            max_rounds: self.max_tool_rounds,
                        });
                    }
                    let output = self.execute_tool(&request).await?;
                    exchange.push(protocol::tool_result_turn(&request.tool, &output));
                    LoopState::ToolExecuted
                }
                LoopState::ToolExecuted => LoopState::AwaitingModel,
                LoopState::Finalized(answer) => {
                    info!(model_calls, tool_requests, "Tool loop finalized");
                    return Ok(LoopOutcome {
                        answer,
                        exchange,
                        model_calls,
                    });
                }
            };
        }
    }

    /// The first round sends `prompt` as the prompt. Later rounds move it
    /// into the context, followed by the exchange so far, and send an empty
    /// prompt.
    fn build_request(
        &self,
        system: Option<String>,
        history: &[Turn],
        prompt: &str,
        exchange: &[Turn],
    ) -> GenerateRequest {
        let mut request = GenerateRequest::new(self.settings.model.clone(), prompt);
        request.system = system;
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;
        request.context = history.to_vec();
        if !exchange.is_empty() {
            request.context.push(Turn::user(prompt));
            request.context.extend_from_slice(exchange);
            request.prompt.clear();
        }
        request
    }

    async fn call_model(&self, request: GenerateRequest, round: u32) -> Result<String, Error> {
        debug!(
            backend = self.backend.name(),
            model = %request.model,
            round,
            context = request.context.len(),
            "Calling model"
        );

        let start = Instant::now();
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.generate(request))
                .await
                .map_err(|_| Error::BackendTimeout {
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => self.backend.generate(request).await,
        }?;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.event_bus.publish(DomainEvent::ModelCalled {
            backend: self.backend.name().to_string(),
            model: response.model.clone(),
            round,
            duration_ms,
            timestamp: Utc::now(),
        });

        response
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or(Error::BackendUnavailable(ProviderError::EmptyResponse))
    }

    async fn execute_tool(&self, request: &ToolInvocationRequest) -> Result<String, Error> {
        let start = Instant::now();
        let result = self.tools.execute(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: request.tool.clone(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        match result {
            Ok(output) => {
                debug!(tool = %request.tool, duration_ms, "Tool executed");
                Ok(output)
            }
            Err(e) => {
                warn!(tool = %request.tool, error = %e, "Tool execution failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SequentialMockBackend;
    use llmbind_core::message::Role;
    use llmbind_core::provider::GenerateResponse;
    use llmbind_tools::calculator_tools;

    fn calculator() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in calculator_tools() {
            registry.register(Box::new(tool)).unwrap();
        }
        Arc::new(registry)
    }

    fn tool_loop(backend: Arc<SequentialMockBackend>, tools: Arc<ToolRegistry>) -> ToolLoop {
        ToolLoop::new(backend, ModelSettings::new("mock-model"), tools, Arc::new(EventBus::default()))
    }

    #[tokio::test]
    async fn single_call_without_tools() {
        let backend = Arc::new(SequentialMockBackend::new(["Hello! How can I help?"]));
        let runner = tool_loop(backend.clone(), Arc::new(ToolRegistry::new()));

        let outcome = runner.run(&[Turn::user("earlier")], "Hello!").await.unwrap();
        assert_eq!(outcome.answer, "Hello! How can I help?");
        assert!(outcome.exchange.is_empty());
        assert_eq!(outcome.model_calls, 1);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "Hello!");
        assert_eq!(requests[0].context.len(), 1);
        assert!(requests[0].system.is_none());
    }

    #[tokio::test]
    async fn tool_result_feeds_next_round() {
        let backend = Arc::new(SequentialMockBackend::new([
            r#"TOOL_CALL v1 {"name": "add", "arguments": {"a": 2, "b": 3}}"#,
            "2 + 3 is 5.",
        ]));
        let runner = tool_loop(backend.clone(), calculator());

        let outcome = runner.run(&[], "What is 2 + 3?").await.unwrap();
        assert_eq!(outcome.answer, "2 + 3 is 5.");
        assert_eq!(outcome.model_calls, 2);
        assert_eq!(outcome.exchange.len(), 2);
        assert_eq!(outcome.exchange[0].role, Role::Assistant);
        assert_eq!(outcome.exchange[1].role, Role::Tool);
        assert_eq!(outcome.exchange[1].content, "add => 5");

        let requests = backend.requests();
        let system = requests[0].system.as_deref().unwrap();
        assert!(system.contains("add(a: integer, b: integer)"));

        let second = &requests[1];
        assert!(second.prompt.is_empty());
        let contents: Vec<&str> = second.context.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents[0], "What is 2 + 3?");
        assert_eq!(contents[2], "add => 5");
    }

    #[tokio::test]
    async fn positional_arguments_bind_in_order() {
        let backend = Arc::new(SequentialMockBackend::new([
            r#"TOOL_CALL v1 {"name": "string_length", "arguments": ["language"]}"#,
            "8",
        ]));
        let outcome = tool_loop(backend, calculator()).run(&[], "len?").await.unwrap();
        assert_eq!(outcome.exchange[1].content, "string_length => 8");
    }

    #[tokio::test]
    async fn unknown_tool_fails() {
        let backend = Arc::new(SequentialMockBackend::new([r#"TOOL_CALL v1 {"name": "teleport"}"#]));
        let err = tool_loop(backend, calculator()).run(&[], "go").await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool { ref name } if name == "teleport"));
    }

    #[tokio::test]
    async fn bad_arguments_fail() {
        let backend = Arc::new(SequentialMockBackend::new([
            r#"TOOL_CALL v1 {"name": "add", "arguments": {"a": "two", "b": 3}}"#,
        ]));
        let err = tool_loop(backend, calculator()).run(&[], "go").await.unwrap_err();
        assert!(matches!(err, Error::ToolArgument { ref tool, .. } if tool == "add"));
    }

    #[tokio::test]
    async fn tool_execution_failure_is_terminal() {
        let backend = Arc::new(SequentialMockBackend::new([
            r#"TOOL_CALL v1 {"name": "sqrt", "arguments": {"x": -4}}"#,
            "unreachable",
        ]));
        let err = tool_loop(backend.clone(), calculator()).run(&[], "go").await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
        assert_eq!(backend.remaining(), 1);
    }

    #[tokio::test]
    async fn malformed_marker_is_unparsable() {
        let backend = Arc::new(SequentialMockBackend::new(["TOOL_CALL v1 {oops"]));
        let err = tool_loop(backend, calculator()).run(&[], "go").await.unwrap_err();
        assert!(matches!(err, Error::UnparsableResponse(_)));
    }

    #[tokio::test]
    async fn fewer_requests_than_limit_finalize() {
        let call = r#"TOOL_CALL v1 {"name": "add", "arguments": [1, 1]}"#;
        let backend = Arc::new(SequentialMockBackend::new([call, call, "done"]));
        let outcome = tool_loop(backend, calculator())
            .with_max_tool_rounds(3)
            .run(&[], "go")
            .await
            .unwrap();
        assert_eq!(outcome.answer, "done");
        assert_eq!(outcome.exchange.len(), 4);
    }

    #[tokio::test]
    async fn reaching_limit_fails() {
        let call = r#"TOOL_CALL v1 {"name": "add", "arguments": [1, 1]}"#;
        let backend = Arc::new(SequentialMockBackend::new([call, call, call, "done"]));
        let err = tool_loop(backend.clone(), calculator())
            .with_max_tool_rounds(3)
            .run(&[], "go")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolLoopExceeded { max_rounds: 3 }));
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_response_is_backend_unavailable() {
        let backend = Arc::new(SequentialMockBackend::default().then(Ok(GenerateResponse {
            text: None,
            model: "mock-model".into(),
            usage: None,
        })));
        let err = tool_loop(backend, calculator()).run(&[], "go").await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(ProviderError::EmptyResponse)));
    }

    #[tokio::test]
    async fn backend_failure_propagates() {
        let backend = Arc::new(SequentialMockBackend::default().then(Err(ProviderError::Network(
            "connection refused".into(),
        ))));
        let err = tool_loop(backend, calculator()).run(&[], "go").await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(ProviderError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let backend = Arc::new(
            SequentialMockBackend::new(["late"]).with_delay(Duration::from_secs(5)),
        );
        let err = tool_loop(backend, calculator())
            .with_timeout(Duration::from_millis(500))
            .run(&[], "go")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendTimeout { timeout_ms: 500 }));
    }

    #[tokio::test]
    async fn events_cover_model_and_tool() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let backend = Arc::new(SequentialMockBackend::new([
            r#"TOOL_CALL v1 {"name": "sqrt", "arguments": {"x": 16}}"#,
            "4",
        ]));
        ToolLoop::new(backend, ModelSettings::new("m"), calculator(), bus.clone())
            .run(&[], "root of 16")
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first.as_ref(), DomainEvent::ModelCalled { round: 1, .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second.as_ref(),
            DomainEvent::ToolExecuted { tool_name, success: true, .. } if tool_name == "sqrt"
        ));
        let third = rx.recv().await.unwrap();
        assert!(matches!(third.as_ref(), DomainEvent::ModelCalled { round: 2, .. }));
    }
}
