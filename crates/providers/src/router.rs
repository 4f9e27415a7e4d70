//! Backend router: builds model and embedding backends from config.

use std::sync::Arc;
use std::time::Duration;

use llmbind_config::AppConfig;
use llmbind_core::error::ProviderError;
use llmbind_core::provider::{EmbeddingBackend, ModelBackend};

use crate::hashing::HashingEmbedder;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the chat model backend named by `config.provider`.
///
/// `custom` requires `base_url`; every other name resolves to a well-known
/// OpenAI-compatible endpoint unless `base_url` overrides it.
pub fn build_backend(config: &AppConfig) -> Result<Arc<dyn ModelBackend>, ProviderError> {
    Ok(Arc::new(build_remote(config)?))
}

/// Build the embedding backend named by `config.embedding.provider`.
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingBackend>, ProviderError> {
    match config.embedding.provider.as_str() {
        "hashing" => Ok(Arc::new(HashingEmbedder::new(config.embedding.dimensions))),
        "remote" => Ok(Arc::new(
            build_remote(config)?.with_embedding_model(&config.embedding.model),
        )),
        other => Err(ProviderError::NotConfigured(format!(
            "unknown embedding provider '{other}' (expected 'hashing' or 'remote')"
        ))),
    }
}

fn build_remote(config: &AppConfig) -> Result<OpenAiCompatProvider, ProviderError> {
    let name = config.provider.as_str();
    let base_url = match (&config.base_url, default_base_url(name)) {
        (Some(url), _) => url.clone(),
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "provider '{name}' needs base_url"
            )));
        }
    };

    let api_key = match (name, &config.api_key) {
        (_, Some(key)) => key.clone(),
        ("ollama" | "vllm" | "llamacpp" | "custom", None) => String::new(),
        (_, None) => {
            return Err(ProviderError::NotConfigured(format!(
                "provider '{name}' needs an API key (set LLMBIND_API_KEY)"
            )));
        }
    };

    let mut provider = OpenAiCompatProvider::new(name, base_url, api_key);
    if config.assistant.backend_timeout_secs > 0 {
        provider =
            provider.with_timeout(Duration::from_secs(config.assistant.backend_timeout_secs));
    }

    tracing::debug!(provider = name, model = %config.model, "Built model backend");
    Ok(provider)
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("custom").is_none());
    }

    #[test]
    fn openai_without_key_is_not_configured() {
        let config = AppConfig::default();
        let err = build_backend(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn openai_with_key_builds() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let backend = build_backend(&config).unwrap();
        assert_eq!(backend.name(), "openai");
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        assert_eq!(build_backend(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn custom_requires_base_url() {
        let mut config = AppConfig {
            provider: "custom".into(),
            ..AppConfig::default()
        };
        assert!(build_backend(&config).is_err());

        config.base_url = Some("http://localhost:9999/v1".into());
        assert_eq!(build_backend(&config).unwrap().name(), "custom");
    }

    #[test]
    fn hashing_embedder_by_default() {
        let config = AppConfig::default();
        assert_eq!(build_embedder(&config).unwrap().name(), "hashing");
    }

    #[test]
    fn unknown_embedder_rejected() {
        let mut config = AppConfig::default();
        config.embedding.provider = "mystery".into();
        assert!(build_embedder(&config).is_err());
    }
}
