//! Scripted doubles for exercising assistants without a live model.

use async_trait::async_trait;
use llmbind_core::error::ProviderError;
use llmbind_core::provider::{GenerateRequest, GenerateResponse, ModelBackend};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A backend that replays queued responses in order and records every
/// request it receives.
///
/// When the script runs out, further calls fail with
/// `ProviderError::NotConfigured`.
#[derive(Default)]
pub struct SequentialMockBackend {
    script: Mutex<VecDeque<Result<GenerateResponse, ProviderError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

impl SequentialMockBackend {
    /// Queue text responses.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(
                responses
                    .into_iter()
                    .map(|text| Ok(GenerateResponse::text(text)))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Queue an arbitrary outcome, including failures and empty responses.
    pub fn then(self, outcome: Result<GenerateResponse, ProviderError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Responses still queued.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelBackend for SequentialMockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| Err(ProviderError::NotConfigured("mock script exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let backend = SequentialMockBackend::new(["one", "two"]);
        let first = backend.generate(GenerateRequest::new("m", "a")).await.unwrap();
        let second = backend.generate(GenerateRequest::new("m", "b")).await.unwrap();
        assert_eq!(first.text.as_deref(), Some("one"));
        assert_eq!(second.text.as_deref(), Some("two"));
        assert!(backend.generate(GenerateRequest::new("m", "c")).await.is_err());

        let prompts: Vec<String> = backend.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn scripted_failures() {
        let backend = SequentialMockBackend::default().then(Err(ProviderError::EmptyResponse));
        assert!(matches!(
            backend.generate(GenerateRequest::new("m", "x")).await,
            Err(ProviderError::EmptyResponse)
        ));
        assert_eq!(backend.remaining(), 0);
    }
}
