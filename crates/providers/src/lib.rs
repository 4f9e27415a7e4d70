//! Model and embedding backends for llmbind.
//!
//! Remote backends implement `llmbind_core::ModelBackend` and
//! `llmbind_core::EmbeddingBackend`. The router builds the right one from
//! configuration.

pub mod hashing;
pub mod openai_compat;
pub mod router;

pub use hashing::HashingEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_backend, build_embedder};
