//! Storage contracts: chat memory and the retrieval corpus.
//!
//! The core only defines the read/write contracts. Chat memory is keyed by
//! session and written through `append`; the corpus is replaced one source
//! document at a time and searched by embedding similarity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::MemoryError;
use crate::message::{SessionId, Turn};

/// Per-session conversation history.
///
/// Implementations bound each session to a fixed number of turns and evict
/// from the oldest end.
#[async_trait]
pub trait ChatMemoryStore: Send + Sync {
    /// The store name (e.g., "in_memory", "file").
    fn name(&self) -> &str;

    /// Append one turn to the session's window.
    async fn append(&self, session: &SessionId, turn: Turn) -> std::result::Result<(), MemoryError> {
        self.append_all(session, vec![turn]).await
    }

    /// Append several turns in order, all or none. On error the session
    /// holds exactly what it held before the call.
    async fn append_all(&self, session: &SessionId, turns: Vec<Turn>) -> std::result::Result<(), MemoryError>;

    /// The session's turns, oldest first. Unknown sessions are empty.
    async fn snapshot(&self, session: &SessionId) -> std::result::Result<Vec<Turn>, MemoryError>;

    /// Drop all turns of a session.
    async fn clear(&self, session: &SessionId) -> std::result::Result<(), MemoryError>;
}

/// A raw document supplied for ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A bounded slice of a source document plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The document this chunk was cut from
    pub source_id: String,

    /// Position of the chunk within its document
    pub ordinal: usize,

    pub text: String,

    pub embedding: Vec<f32>,
}

/// A chunk with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Chunks ranked by similarity to a query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk texts in ranked order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.chunk.text.as_str())
    }
}

/// Storage for the retrieval corpus.
///
/// `replace_document` must be atomic per source id: a concurrent `search`
/// sees either all of the old chunks for that id or all of the new ones.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    fn name(&self) -> &str;

    /// Replace every chunk of `source_id` with `chunks`. Returns how many
    /// chunks were removed.
    async fn replace_document(
        &self,
        source_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> std::result::Result<usize, MemoryError>;

    /// Remove a document. Returns whether anything was removed.
    async fn remove_document(&self, source_id: &str) -> std::result::Result<bool, MemoryError>;

    /// Rank stored chunks by cosine similarity to `query`, best first; ties
    /// keep ingestion order.
    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> std::result::Result<Vec<ScoredChunk>, MemoryError>;

    /// Chunks of one document, in ordinal order.
    async fn chunks_of(&self, source_id: &str) -> std::result::Result<Vec<DocumentChunk>, MemoryError>;

    /// Total number of stored chunks.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk {
                source_id: "doc".into(),
                ordinal: 0,
                text: text.into(),
                embedding: vec![1.0],
            },
            score,
        }
    }

    #[test]
    fn retrieval_result_texts_in_rank_order() {
        let result = RetrievalResult {
            chunks: vec![scored("first", 0.9), scored("second", 0.4)],
        };
        assert_eq!(result.texts().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn empty_retrieval_result() {
        assert!(RetrievalResult::default().is_empty());
    }

    #[test]
    fn chunk_serialization() {
        let chunk = scored("Cancellation is free up to 7 days before pickup.", 0.0).chunk;
        let json = serde_json::to_string(&chunk).unwrap();
        let back: DocumentChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
