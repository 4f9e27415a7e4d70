//! In-memory retrieval corpus.

use async_trait::async_trait;
use llmbind_core::error::MemoryError;
use llmbind_core::memory::{CorpusStore, DocumentChunk, ScoredChunk};
use tokio::sync::RwLock;

use crate::vector::rank_by_similarity;

struct StoredChunk {
    seq: u64,
    chunk: DocumentChunk,
}

#[derive(Default)]
struct CorpusState {
    chunks: Vec<StoredChunk>,
    next_seq: u64,
}

/// Holds every chunk in a single `Vec` behind one lock.
///
/// Each chunk gets a monotonically increasing sequence number when stored;
/// search ties are broken by it, so equal scores come back in ingestion
/// order.
#[derive(Default)]
pub struct InMemoryCorpus {
    state: RwLock<CorpusState>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct source ids, in first-ingestion order.
    pub async fn documents(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut ids: Vec<String> = Vec::new();
        for stored in &state.chunks {
            if !ids.contains(&stored.chunk.source_id) {
                ids.push(stored.chunk.source_id.clone());
            }
        }
        ids
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpus {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn replace_document(
        &self,
        source_id: &str,
        chunks: Vec<DocumentChunk>,
    ) -> Result<usize, MemoryError> {
        if let Some(foreign) = chunks.iter().find(|c| c.source_id != source_id) {
            return Err(MemoryError::Storage(format!(
                "chunk from '{}' passed while replacing '{source_id}'",
                foreign.source_id
            )));
        }

        let mut state = self.state.write().await;
        let before = state.chunks.len();
        state.chunks.retain(|s| s.chunk.source_id != source_id);
        let removed = before - state.chunks.len();

        for chunk in chunks {
            let seq = state.next_seq;
            state.next_seq += 1;
            state.chunks.push(StoredChunk { seq, chunk });
        }

        Ok(removed)
    }

    async fn remove_document(&self, source_id: &str) -> Result<bool, MemoryError> {
        let mut state = self.state.write().await;
        let before = state.chunks.len();
        state.chunks.retain(|s| s.chunk.source_id != source_id);
        Ok(state.chunks.len() < before)
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>, MemoryError> {
        let state = self.state.read().await;
        if state.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let ranked = rank_by_similarity(
            state
                .chunks
                .iter()
                .map(|s| (s.seq, s.chunk.embedding.as_slice(), &s.chunk)),
            query,
            top_k,
            min_score,
        );

        Ok(ranked
            .into_iter()
            .map(|(score, chunk)| ScoredChunk {
                chunk: chunk.clone(),
                score,
            })
            .collect())
    }

    async fn chunks_of(&self, source_id: &str) -> Result<Vec<DocumentChunk>, MemoryError> {
        let state = self.state.read().await;
        let mut chunks: Vec<DocumentChunk> = state
            .chunks
            .iter()
            .filter(|s| s.chunk.source_id == source_id)
            .map(|s| s.chunk.clone())
            .collect();
        chunks.sort_by_key(|c| c.ordinal);
        Ok(chunks)
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.state.read().await.chunks.len())
    }
}
