//! `llmbind chat`: Memory-aware chat with the calculator tools.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use llmbind_agent::{Assistant, AssistantContract, MethodSpec, TemplateArgs};
use llmbind_core::message::SessionId;
use tokio::io::{AsyncBufReadExt, BufReader};

pub fn chat_contract() -> anyhow::Result<AssistantContract> {
    Ok(AssistantContract::builder("chat")
        .method(MethodSpec::new("chat", "{message}").param("message").memory_aware())
        .build()?)
}

pub async fn run(session: &str, message: Option<String>) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let assistant = super::assistant_builder(&config, chat_contract()?)?
        .tools(Arc::new(llmbind_tools::default_registry()))
        .memory(super::memory_store(&config)?)
        .build()?;
    let session = SessionId::from(session);
    tracing::debug!(session = %session, memory = %config.memory.backend, "Chat assistant ready");

    if let Some(message) = message {
        println!("{}", reply(&assistant, &session, &message).await?);
        return Ok(());
    }

    println!();
    println!("  llmbind chat");
    println!("  Backend:  {} ({})", config.provider, config.model);
    println!("  Session:  {session}");
    println!("  Memory:   {} (last {} turns)", config.memory.backend, config.assistant.max_messages);
    println!("  Tools:    {}", llmbind_tools::default_registry().names().join(", "));
    println!();
    println!("  Type 'exit' to quit, '/forget' to clear this session.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/forget" => {
                assistant.forget(&session).await?;
                println!("  (session cleared)");
                continue;
            }
            _ => {}
        }

        match reply(&assistant, &session, line).await {
            Ok(response) => {
                println!();
                for line in response.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!();
    Ok(())
}

async fn reply(assistant: &Assistant, session: &SessionId, message: &str) -> anyhow::Result<String> {
    let value = assistant
        .invoke_in(session, "chat", TemplateArgs::new().with("message", message))
        .await?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_method_is_memory_aware() {
        let contract = chat_contract().unwrap();
        let method = contract.method("chat").unwrap();
        assert!(method.memory_aware);
        assert!(method.return_shape.is_text());
    }
}
