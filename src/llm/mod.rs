//! LLM Gateway (C2)
//!
//! Key-pool-rotated structured-JSON extraction and short prose generation
//! with retry/backoff and purpose-indexed key rotation.

pub mod key_pool;
pub mod mock;
pub mod retry;

use async_trait::async_trait;
use std::fmt;

pub use key_pool::LlmKeyPool;
pub use mock::MockLlmProvider;

/// Error kinds an `LlmProvider` call can fail with. The key pool branches on
/// these three kinds: rate-limit rotates to the next key, invalid-credential
/// marks the key permanently dead for this process, anything else retries
/// the same key with backoff.
#[derive(Debug, Clone)]
pub enum LlmError {
    RateLimited(String),
    InvalidCredential(String),
    Other(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            LlmError::InvalidCredential(msg) => write!(f, "invalid credential: {}", msg),
            LlmError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 2000,
        }
    }
}

/// Contract for the external LLM text-generation collaborator (out of scope
/// to implement for real — only the seam and local stand-ins live here).
/// `credential` is whichever key the key pool selected for this attempt.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn call(
        &self,
        credential: &str,
        prompt: &str,
        purpose: &str,
        params: &GenerationParams,
    ) -> Result<String, LlmError>;
}

/// Strip leading/trailing Markdown code-fence markers from a raw LLM
/// response, as the gateway contract requires ("strips code-fence markers
/// and returns the raw string"). Callers still own JSON parsing/validation.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\nhello\n```";
        assert_eq!(strip_code_fences(raw), "hello");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("plain text"), "plain text");
    }
}
