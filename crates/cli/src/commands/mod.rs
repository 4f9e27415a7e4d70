//! Command implementations and the wiring they share.

pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod extract;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use llmbind_agent::{Assistant, AssistantBuilder, AssistantContract, ModelSettings};
use llmbind_config::AppConfig;
use llmbind_core::memory::ChatMemoryStore;
use llmbind_memory::{FileChatStore, InMemoryChatStore};

pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

/// An assistant builder carrying the backend, model settings, and limits
/// from `config`.
pub fn assistant_builder(config: &AppConfig, contract: AssistantContract) -> anyhow::Result<AssistantBuilder> {
    let backend = llmbind_providers::build_backend(config).with_context(|| {
        format!(
            "Backend '{}' is not usable. Set LLMBIND_API_KEY (or OPENAI_API_KEY), or add api_key to {}",
            config.provider,
            AppConfig::config_dir().join("config.toml").display()
        )
    })?;

    let mut settings = ModelSettings::new(&config.model).with_temperature(config.temperature);
    if let Some(max_tokens) = config.max_tokens {
        settings = settings.with_max_tokens(max_tokens);
    }

    let mut builder = Assistant::builder(contract, backend)
        .model(settings)
        .max_tool_rounds(config.assistant.max_tool_rounds);
    if config.assistant.backend_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.assistant.backend_timeout_secs));
    }
    Ok(builder)
}

/// The chat memory store selected by `[memory] backend`.
pub fn memory_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ChatMemoryStore>> {
    let max_messages = config.assistant.max_messages;
    match config.memory.backend.as_str() {
        "in_memory" => Ok(Arc::new(InMemoryChatStore::new(max_messages))),
        "file" => Ok(Arc::new(FileChatStore::new(config.memory.sessions_dir(), max_messages))),
        other => anyhow::bail!("Unknown memory backend '{other}' (expected in_memory or file)"),
    }
}
