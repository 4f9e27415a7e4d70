//! Backend traits: the abstraction over text generation and embeddings.
//!
//! A [`ModelBackend`] turns a prompt plus prior turns into text. An
//! [`EmbeddingBackend`] turns text into a vector. Which vendor or local
//! runtime serves them is an adapter concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Turn;

/// One generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model to use (e.g., "gpt-4o", "llama3")
    pub model: String,

    /// Standing instructions (tool protocol, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Prior turns, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Turn>,

    /// The prompt for this call
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerateRequest {
    /// A bare request with default sampling settings.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            context: Vec::new(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// The backend's answer. `text` is `None` when the backend produced nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: Option<String>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    pub usage: Option<Usage>,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            model: String::new(),
            usage: None,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A text generation backend.
///
/// Every vendor client (OpenAI-compatible, Ollama, test doubles) implements
/// this trait. The assistant calls `generate()` without knowing which one it
/// holds.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Generate a response for the request.
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<GenerateResponse, ProviderError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// A text embedding backend.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// Embed several texts, preserving order.
    ///
    /// Default implementation calls `embed()` once per text.
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LengthEmbedder;

    #[async_trait]
    impl EmbeddingBackend for LengthEmbedder {
        fn name(&self) -> &str {
            "length"
        }

        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[test]
    fn generate_request_defaults() {
        let req = GenerateRequest::new("gpt-4o", "hi");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.context.is_empty());
        assert!(req.system.is_none());
    }

    #[test]
    fn request_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&GenerateRequest::new("m", "p")).unwrap();
        assert!(!json.contains("system"));
        assert!(!json.contains("context"));
    }

    #[tokio::test]
    async fn default_batch_embedding_preserves_order() {
        let vectors = LengthEmbedder
            .embed_batch(&["a".into(), "abc".into()])
            .await
            .unwrap();
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 3.0);
    }
}
