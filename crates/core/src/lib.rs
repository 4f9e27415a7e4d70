//! # llmbind core
//!
//! Domain types, traits, and error definitions for model-backed assistants.
//! This crate has **no framework dependencies**: it defines the vocabulary
//! every other llmbind crate implements against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the assistant talks to is a trait here:
//! - [`ModelBackend`] and [`EmbeddingBackend`] for text generation and vectors
//! - [`Tool`] for host functions the model may call
//! - [`ChatMemoryStore`] and [`CorpusStore`] for pluggable persistence
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted backends without touching the orchestration code.

pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod provider;
pub mod shape;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ErrorCategory, Result};
pub use event::{DomainEvent, EventBus};
pub use memory::{ChatMemoryStore, CorpusStore, Document, DocumentChunk, RetrievalResult, ScoredChunk};
pub use message::{Role, SessionId, Turn};
pub use provider::{EmbeddingBackend, GenerateRequest, GenerateResponse, ModelBackend, Usage};
pub use shape::{FieldSpec, ParsedValue, Record, RecordSchema, ReturnShape, ValueKind};
pub use tool::{ParamKind, Tool, ToolArguments, ToolDescriptor, ToolInvocationRequest, ToolParameter, ToolRegistry};
