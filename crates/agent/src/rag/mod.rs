//! Retrieval-augmented generation: chunk and embed documents once, then
//! prepend the chunks most similar to each prompt.

pub mod chunker;
pub mod loader;
pub mod pipeline;

pub use chunker::Chunker;
pub use loader::load_documents;
pub use pipeline::{augment_prompt, IngestReport, RagPipeline};
