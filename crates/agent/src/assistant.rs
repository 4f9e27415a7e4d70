//! The assistant proxy: one callable per contract method.
//!
//! An invocation renders the method's template, optionally prepends
//! retrieved context, runs the tool loop against the session's memory
//! snapshot, parses the answer into the declared shape, and only then
//! commits the exchange to memory. Any failure leaves memory untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use llmbind_core::error::{Error, ParseError};
use llmbind_core::event::{DomainEvent, EventBus};
use llmbind_core::memory::ChatMemoryStore;
use llmbind_core::message::{SessionId, Turn};
use llmbind_core::provider::ModelBackend;
use llmbind_core::shape::ParsedValue;
use llmbind_core::tool::ToolRegistry;
use llmbind_parser::{format_instructions, OutputParser};
use tracing::{debug, info, warn};

use crate::contract::{AssistantContract, MethodSpec};
use crate::rag::RagPipeline;
use crate::template::TemplateArgs;
use crate::tool_loop::{ModelSettings, ToolLoop, DEFAULT_MAX_TOOL_ROUNDS};

type SessionGate = Arc<tokio::sync::Mutex<()>>;

/// A contract bound to a model backend and its collaborators.
pub struct Assistant {
    contract: AssistantContract,
    tool_loop: ToolLoop,
    parser: OutputParser,
    memory: Option<Arc<dyn ChatMemoryStore>>,
    rag: Option<Arc<RagPipeline>>,
    event_bus: Arc<EventBus>,
    gates: Mutex<HashMap<SessionId, SessionGate>>,
}

impl Assistant {
    pub fn builder(contract: AssistantContract, backend: Arc<dyn ModelBackend>) -> AssistantBuilder {
        AssistantBuilder {
            contract,
            backend,
            settings: ModelSettings::new("default"),
            tools: Arc::new(ToolRegistry::new()),
            parser: OutputParser::new(),
            memory: None,
            rag: None,
            event_bus: Arc::new(EventBus::default()),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            timeout: None,
        }
    }

    pub fn contract(&self) -> &AssistantContract {
        &self.contract
    }

    pub fn rag(&self) -> Option<&Arc<RagPipeline>> {
        self.rag.as_ref()
    }

    /// Invoke `method` in the default session.
    pub async fn invoke(&self, method: &str, args: TemplateArgs) -> Result<ParsedValue, Error> {
        self.invoke_in(&SessionId::default(), method, args).await
    }

    /// Invoke `method` and convert the result, e.g. into `i64` or `NaiveDate`.
    pub async fn invoke_as<T>(&self, session: &SessionId, method: &str, args: TemplateArgs) -> Result<T, Error>
    where
        T: TryFrom<ParsedValue, Error = ParseError>,
    {
        let value = self.invoke_in(session, method, args).await?;
        Ok(T::try_from(value)?)
    }

    /// Invoke `method` in `session`.
    ///
    /// Memory-aware calls on one session run one at a time; everything else
    /// runs concurrently.
    pub async fn invoke_in(
        &self,
        session: &SessionId,
        method: &str,
        args: TemplateArgs,
    ) -> Result<ParsedValue, Error> {
        let start = Instant::now();
        info!(method, session = %session, "Invoking assistant method");

        let result = self.dispatch(session, method, &args).await;

        match &result {
            Ok(_) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(method, session = %session, duration_ms, "Invocation completed");
                self.event_bus.publish(DomainEvent::InvocationCompleted {
                    method: method.to_string(),
                    session: session.to_string(),
                    duration_ms,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                warn!(method, session = %session, category = ?e.category(), error = %e, "Invocation failed");
                self.event_bus.publish(DomainEvent::InvocationFailed {
                    method: method.to_string(),
                    session: session.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
        result
    }

    /// Drop the remembered turns of `session`.
    pub async fn forget(&self, session: &SessionId) -> Result<(), Error> {
        if let Some(memory) = &self.memory {
            let _turn = self.enter(session).await;
            memory.clear(session).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, session: &SessionId, method: &str, args: &TemplateArgs) -> Result<ParsedValue, Error> {
        let spec = self.contract.method(method).ok_or_else(|| Error::Contract {
            message: format!("{} has no method '{method}'", self.contract.name()),
        })?;
        let rendered = spec.render(args)?;

        let memory = self.memory.as_ref().filter(|_| spec.memory_aware);
        let _turn = match memory {
            Some(_) => Some(self.enter(session).await),
            None => None,
        };

        let prompt = self.build_prompt(spec, &rendered).await?;
        let history = match memory {
            Some(memory) => memory.snapshot(session).await?,
            None => Vec::new(),
        };
        debug!(method, history = history.len(), "Prompt assembled");

        let outcome = self.tool_loop.run(&history, &prompt).await?;
        let value = if spec.return_shape.is_text() {
            ParsedValue::Text(outcome.answer.clone())
        } else {
            self.parser.parse(&outcome.answer, &spec.return_shape)?
        };

        if let Some(memory) = memory {
            let mut turns = Vec::with_capacity(outcome.exchange.len() + 2);
            turns.push(Turn::user(rendered));
            turns.extend(outcome.exchange);
            turns.push(Turn::assistant(outcome.answer));
            memory.append_all(session, turns).await?;
        }
        Ok(value)
    }

    /// Retrieved context, then the rendered template, then format
    /// instructions for non-text shapes.
    async fn build_prompt(&self, spec: &MethodSpec, rendered: &str) -> Result<String, Error> {
        let mut prompt = match (&self.rag, spec.retrieval_augmented) {
            (Some(rag), true) => rag.augment(rendered).await?,
            _ => rendered.to_string(),
        };
        if let Some(instructions) = format_instructions(&spec.return_shape) {
            prompt.push_str("\n\n");
            prompt.push_str(&instructions);
        }
        Ok(prompt)
    }

    /// Wait for the session's turn.
    async fn enter(&self, session: &SessionId) -> SessionTurn<'_> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            gates.entry(session.clone()).or_default().clone()
        };
        let mut turn = SessionTurn {
            gates: &self.gates,
            session: session.clone(),
            guard: None,
        };
        turn.guard = Some(gate.lock_owned().await);
        turn
    }
}

/// Holds a session's gate. The last holder to leave removes the gate, so
/// the map only tracks sessions with a call in flight.
struct SessionTurn<'a> {
    gates: &'a Mutex<HashMap<SessionId, SessionGate>>,
    session: SessionId,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for SessionTurn<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if gates
            .get(&self.session)
            .is_some_and(|gate| Arc::strong_count(gate) == 1)
        {
            gates.remove(&self.session);
        }
    }
}

/// Configures an [`Assistant`]; [`AssistantBuilder::build`] checks that every
/// method's flags have the collaborator they need.
pub struct AssistantBuilder {
    contract: AssistantContract,
    backend: Arc<dyn ModelBackend>,
    settings: ModelSettings,
    tools: Arc<ToolRegistry>,
    parser: OutputParser,
    memory: Option<Arc<dyn ChatMemoryStore>>,
    rag: Option<Arc<RagPipeline>>,
    event_bus: Arc<EventBus>,
    max_tool_rounds: u32,
    timeout: Option<Duration>,
}

impl AssistantBuilder {
    pub fn model(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn parser(mut self, parser: OutputParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn memory(mut self, memory: Arc<dyn ChatMemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn rag(mut self, rag: Arc<RagPipeline>) -> Self {
        self.rag = Some(rag);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Assistant, Error> {
        for method in self.contract.methods() {
            if method.retrieval_augmented && self.rag.is_none() {
                return Err(Error::Contract {
                    message: format!("method '{}' is retrieval-augmented but no RAG pipeline is attached", method.name),
                });
            }
            if method.memory_aware && self.memory.is_none() {
                return Err(Error::Contract {
                    message: format!("method '{}' is memory-aware but no chat memory store is attached", method.name),
                });
            }
        }

        let mut tool_loop = ToolLoop::new(self.backend, self.settings, self.tools, self.event_bus.clone())
            .with_max_tool_rounds(self.max_tool_rounds);
        if let Some(timeout) = self.timeout {
            tool_loop = tool_loop.with_timeout(timeout);
        }

        debug!(contract = %self.contract.name(), "Assistant built");
        Ok(Assistant {
            contract: self.contract,
            tool_loop,
            parser: self.parser,
            memory: self.memory,
            rag: self.rag,
            event_bus: self.event_bus,
            gates: Mutex::new(HashMap::new()),
        })
    }
}
