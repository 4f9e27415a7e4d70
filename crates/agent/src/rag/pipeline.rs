//! Ingestion, retrieval, and prompt augmentation.

use std::sync::Arc;

use chrono::Utc;
use llmbind_core::error::Error;
use llmbind_core::event::{DomainEvent, EventBus};
use llmbind_core::memory::{CorpusStore, Document, DocumentChunk, RetrievalResult};
use llmbind_core::provider::EmbeddingBackend;
use tracing::{debug, info};

use super::chunker::Chunker;

pub const DEFAULT_TOP_K: usize = 3;

/// Totals for one `ingest` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// Chunks dropped because their document was ingested before.
    pub replaced: usize,
}

/// Turns documents into embedded chunks and finds the ones relevant to a
/// query.
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingBackend>,
    corpus: Arc<dyn CorpusStore>,
    chunker: Chunker,
    top_k: usize,
    min_score: Option<f32>,
    event_bus: Arc<EventBus>,
}

impl RagPipeline {
    pub fn new(embedder: Arc<dyn EmbeddingBackend>, corpus: Arc<dyn CorpusStore>) -> Self {
        Self {
            embedder,
            corpus,
            chunker: Chunker::default(),
            top_k: DEFAULT_TOP_K,
            min_score: None,
            event_bus: Arc::new(EventBus::default()),
        }
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Chunks used by `augment`.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Chunks scoring below this are never retrieved. Without it, the
    /// best `top_k` are returned whatever their score.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn corpus(&self) -> &Arc<dyn CorpusStore> {
        &self.corpus
    }

    /// Ingest documents one at a time. Re-ingesting an id replaces its chunks.
    pub async fn ingest<I>(&self, documents: I) -> Result<IngestReport, Error>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut report = IngestReport::default();
        for document in documents {
            let (chunks, replaced) = self.ingest_document(&document).await?;
            report.documents += 1;
            report.chunks += chunks;
            report.replaced += replaced;
        }
        info!(
            documents = report.documents,
            chunks = report.chunks,
            replaced = report.replaced,
            "Ingestion complete"
        );
        Ok(report)
    }

    /// Chunk, embed, and store one document. Returns (stored, replaced).
    ///
    /// Embedding happens before the corpus is touched, so a failed embed
    /// leaves the previous chunks of the document in place.
    pub async fn ingest_document(&self, document: &Document) -> Result<(usize, usize), Error> {
        let texts = self.chunker.chunk(&document.text);
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&texts).await?
        };
        if embeddings.len() != texts.len() {
            return Err(Error::Internal(format!(
                "embedder '{}' returned {} vectors for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                texts.len()
            )));
        }

        let chunks: Vec<DocumentChunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(ordinal, (text, embedding))| DocumentChunk {
                source_id: document.id.clone(),
                ordinal,
                text,
                embedding,
            })
            .collect();
        let stored = chunks.len();
        let replaced = self.corpus.replace_document(&document.id, chunks).await?;

        debug!(source = %document.id, chunks = stored, replaced, "Document ingested");
        self.event_bus.publish(DomainEvent::DocumentIngested {
            source_id: document.id.clone(),
            chunks: stored,
            replaced,
            timestamp: Utc::now(),
        });
        Ok((stored, replaced))
    }

    /// Drop a document from the corpus.
    pub async fn remove(&self, source_id: &str) -> Result<bool, Error> {
        Ok(self.corpus.remove_document(source_id).await?)
    }

    /// The `top_k` chunks most similar to `query`, best first.
    ///
    /// An empty corpus yields an empty result without calling the embedder.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult, Error> {
        if top_k == 0 || self.corpus.count().await? == 0 {
            debug!(top_k, "Nothing to retrieve");
            return Ok(RetrievalResult::default());
        }

        let vector = self.embedder.embed(query).await?;
        let min_score = self.min_score.unwrap_or(f32::NEG_INFINITY);
        let chunks = self.corpus.search(&vector, top_k, min_score).await?;
        debug!(top_k, chunks = chunks.len(), "Retrieved context");
        Ok(RetrievalResult { chunks })
    }

    /// Retrieve with the configured `top_k` and prepend the context to `prompt`.
    pub async fn augment(&self, prompt: &str) -> Result<String, Error> {
        let retrieved = self.retrieve(prompt, self.top_k).await?;
        Ok(augment_prompt(prompt, &retrieved))
    }
}

/// Prepend retrieved chunk texts, in ranked order, to `prompt`. An empty
/// result leaves the prompt unchanged.
pub fn augment_prompt(prompt: &str, retrieved: &RetrievalResult) -> String {
    if retrieved.is_empty() {
        return prompt.to_string();
    }
    let context = retrieved.texts().collect::<Vec<_>>().join("\n\n");
    format!("Answer using the following information:\n{context}\n\n{prompt}")
}
