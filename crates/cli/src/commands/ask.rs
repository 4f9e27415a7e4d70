//! `llmbind ask`: Answer a question from a directory of documents.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use llmbind_agent::{load_documents, AssistantContract, Chunker, MethodSpec, RagPipeline, TemplateArgs};
use llmbind_config::AppConfig;
use llmbind_memory::InMemoryCorpus;
use tracing::info;

pub fn qa_contract() -> anyhow::Result<AssistantContract> {
    Ok(AssistantContract::builder("documents")
        .method(
            MethodSpec::new("answer", "{question}")
                .param("question")
                .retrieval_augmented(),
        )
        .build()?)
}

/// A pipeline configured from `[rag]` and `[embedding]`.
pub fn pipeline(config: &AppConfig) -> anyhow::Result<RagPipeline> {
    let embedder = llmbind_providers::build_embedder(config).context("Failed to build the embedding backend")?;
    let pipeline = RagPipeline::new(embedder, Arc::new(InMemoryCorpus::new()))
        .with_chunker(Chunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?)
        .with_top_k(config.rag.top_k);
    Ok(match config.rag.min_score {
        Some(min_score) => pipeline.with_min_score(min_score),
        None => pipeline,
    })
}

pub async fn run(docs: &Path, question: &str) -> anyhow::Result<()> {
    let config = super::load_config()?;

    let documents = load_documents(docs).await?;
    if documents.is_empty() {
        anyhow::bail!("No .txt or .md files found in {}", docs.display());
    }
    let rag = Arc::new(pipeline(&config)?);
    let report = rag.ingest(documents).await?;
    info!(documents = report.documents, chunks = report.chunks, dir = %docs.display(), "Indexed documents");

    let assistant = super::assistant_builder(&config, qa_contract()?)?.rag(rag).build()?;
    let answer = assistant
        .invoke("answer", TemplateArgs::new().with("question", question))
        .await?;
    println!("{answer}");
    Ok(())
}
