//! Offline `LlmProvider` stand-in used for local runs and tests, analogous
//! to the deterministic embedding provider — no network dependency.

use super::{GenerationParams, LlmError, LlmProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed or purpose-derived canned response. Never fails unless
/// configured to, so tests can exercise the happy path without a real key.
pub struct MockLlmProvider {
    fixed_response: Option<String>,
    calls: AtomicUsize,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self { fixed_response: None, calls: AtomicUsize::new(0) }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self { fixed_response: Some(response.into()), calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn call(
        &self,
        _credential: &str,
        prompt: &str,
        purpose: &str,
        _params: &GenerationParams,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fixed) = &self.fixed_response {
            return Ok(fixed.clone());
        }
        Ok(format!(
            "{{\"note\": \"mock response for purpose {}\", \"prompt_len\": {}}}",
            purpose,
            prompt.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_response_is_returned_verbatim() {
        let provider = MockLlmProvider::with_response("{\"ok\": true}");
        let result = provider
            .call("k", "prompt", "resume_parsing", &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(result, "{\"ok\": true}");
        assert_eq!(provider.call_count(), 1);
    }
}
