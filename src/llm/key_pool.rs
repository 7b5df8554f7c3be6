//! Purpose-indexed credential pool with key rotation: a purpose-keyed,
//! failed-keys-tracking priority list with exponential-backoff retry rounds.

use super::retry::RetryConfig;
use crate::llm::{GenerationParams, LlmError, LlmProvider};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

pub struct LlmKeyPool {
    provider: Box<dyn LlmProvider>,
    /// key name (purpose name, "fallback_N", or any other purpose name used
    /// as a credential slot) -> credential value.
    credentials: HashMap<String, String>,
    /// Rate-limited keys: cleared at the start of each outer retry round so
    /// a transient limit doesn't permanently exclude a key.
    rate_limited: Mutex<HashSet<String>>,
    /// Invalid keys: never cleared for the process lifetime.
    permanently_failed: Mutex<HashSet<String>>,
    default_retries: u32,
    retry_config: RetryConfig,
}

impl LlmKeyPool {
    pub fn new(provider: Box<dyn LlmProvider>, credentials: HashMap<String, String>) -> Self {
        Self {
            provider,
            credentials,
            rate_limited: Mutex::new(HashSet::new()),
            permanently_failed: Mutex::new(HashSet::new()),
            default_retries: 3,
            retry_config: RetryConfig::default(),
        }
    }

    /// Priority-ordered list of key names to try for `purpose`:
    /// purpose-specific first, then `fallback_1..n`, then everything else.
    fn priority_list(&self, purpose: &str) -> Vec<String> {
        let mut list = Vec::new();
        if self.credentials.contains_key(purpose) {
            list.push(purpose.to_string());
        }
        let mut fallbacks: Vec<String> = self
            .credentials
            .keys()
            .filter(|k| k.starts_with("fallback_"))
            .cloned()
            .collect();
        fallbacks.sort();
        list.extend(fallbacks);

        let mut others: Vec<String> = self
            .credentials
            .keys()
            .filter(|k| k.as_str() != purpose && !k.starts_with("fallback_"))
            .cloned()
            .collect();
        others.sort();
        list.extend(others);
        list
    }

    /// Resolve a working credential and call the provider, rotating through
    /// the purpose's priority list, retrying exhausted rounds with backoff
    /// up to `max_retries`.
    pub async fn generate(
        &self,
        prompt: &str,
        purpose: &str,
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        let priority = self.priority_list(purpose);
        if priority.is_empty() {
            return Err(LlmError::Other("no LLM credentials configured".to_string()));
        }

        let mut last_error: Option<LlmError> = None;
        let mut round_delay = self.retry_config.initial_delay_ms;

        for round in 0..=self.default_retries {
            for key_name in &priority {
                if self.permanently_failed.lock().await.contains(key_name) {
                    continue;
                }
                if self.rate_limited.lock().await.contains(key_name) {
                    continue;
                }
                let credential = match self.credentials.get(key_name) {
                    Some(c) => c.clone(),
                    None => continue,
                };

                match self.call_with_same_key_retry(&credential, prompt, purpose, &params).await {
                    Ok(text) => return Ok(text),
                    Err(LlmError::RateLimited(msg)) => {
                        log::warn!("LLM key '{}' rate limited: {}", key_name, msg);
                        self.rate_limited.lock().await.insert(key_name.clone());
                        last_error = Some(LlmError::RateLimited(msg));
                    }
                    Err(LlmError::InvalidCredential(msg)) => {
                        log::error!("LLM key '{}' invalid, marking permanently failed: {}", key_name, msg);
                        self.permanently_failed.lock().await.insert(key_name.clone());
                        last_error = Some(LlmError::InvalidCredential(msg));
                    }
                    Err(other) => {
                        last_error = Some(other);
                    }
                }
            }

            if round < self.default_retries {
                log::info!("clearing rate-limited keys, retrying (round {}/{})", round + 2, self.default_retries + 1);
                self.rate_limited.lock().await.clear();
                sleep(Duration::from_millis(round_delay)).await;
                round_delay = ((round_delay as f64) * self.retry_config.backoff_multiplier) as u64;
                round_delay = round_delay.min(self.retry_config.max_delay_ms);
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Other("all LLM credentials exhausted".to_string())))
    }

    /// "Other" errors retry with backoff on the *same* key before the outer
    /// loop moves on to the next credential — rate-limit errors rotate
    /// instead of retrying the same key.
    async fn call_with_same_key_retry(
        &self,
        credential: &str,
        prompt: &str,
        purpose: &str,
        params: &GenerationParams,
    ) -> Result<String, LlmError> {
        const SAME_KEY_ATTEMPTS: u32 = 2;
        let mut delay = self.retry_config.initial_delay_ms;
        let mut last = None;
        for attempt in 0..SAME_KEY_ATTEMPTS {
            match self.provider.call(credential, prompt, purpose, params).await {
                Ok(text) => return Ok(text),
                Err(LlmError::Other(msg)) => {
                    last = Some(LlmError::Other(msg));
                    if attempt + 1 < SAME_KEY_ATTEMPTS {
                        sleep(Duration::from_millis(delay)).await;
                        delay = (delay * 2).min(self.retry_config.max_delay_ms);
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Err(last.unwrap_or_else(|| LlmError::Other("unknown error".to_string())))
    }
}
