//! The assistant proxy for llmbind.
//!
//! An [`AssistantContract`] declares methods as data: a prompt template, the
//! parameter names it binds, a return shape, and whether the method uses
//! retrieval and chat memory. An [`Assistant`] binds a contract to a model
//! backend and runs every call through the same pipeline:
//!
//! 1. **Render** the template with the call's arguments
//! 2. **Augment** with retrieved document chunks (retrieval-augmented methods)
//! 3. **Recall** the session's memory window (memory-aware methods)
//! 4. **Dispatch** through the [`ToolLoop`] until the model stops requesting tools
//! 5. **Parse** the answer into the declared shape
//! 6. **Remember** the exchange, only after everything above succeeded

pub mod assistant;
pub mod contract;
pub mod protocol;
pub mod rag;
pub mod template;
pub mod testing;
pub mod tool_loop;

pub use assistant::{Assistant, AssistantBuilder};
pub use contract::{AssistantContract, ContractBuilder, MethodSpec};
pub use rag::{load_documents, Chunker, IngestReport, RagPipeline};
pub use template::{render, TemplateArgs};
pub use tool_loop::{LoopOutcome, ModelSettings, ToolLoop};
