//! Environment-driven configuration
//!
//! Every setting the core reads from the environment: embedding
//! dimension/model id, vector-store path, a purpose-indexed LLM credential
//! pool, the DB path, and object-store credentials. Unset LLM credentials
//! disable LLM-powered extraction; deterministic fallbacks in C5/C6 remain
//! functional either way.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Purposes the LLM key pool resolves credentials for. Order here also
/// defines the non-fallback, non-purpose-specific "other keys" tail used by
/// `LlmKeyPool::priority_list` when neither the requested purpose nor a
/// fallback slot has a credential.
pub const KNOWN_PURPOSES: &[&str] = &[
    "resume_parsing",
    "posting_analysis",
    "skill_extraction",
    "matching_explanation",
    "candidate_summary",
    "achievement_extraction",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// Embedding dimension for this deployment. Default 384.
    pub embedding_dim: usize,
    /// Identifier of the embedding model in use, for cache-keying alongside
    /// content hash (see `(content_hash, model_version)` caching contract).
    pub embedding_model_version: String,
    /// Where the local vector index and relational store persist data.
    pub data_dir: PathBuf,
    /// purpose -> credential, only for purposes with a credential set.
    pub llm_credentials: HashMap<String, String>,
    /// Object store bucket name (local-filesystem default implementation
    /// uses this as a subdirectory under `data_dir`).
    pub object_store_bucket: String,
    /// Bounded worker count for the pre-computer's batch job.
    pub precompute_workers: usize,
}

impl Config {
    /// Build configuration from environment variables, falling back to
    /// sensible local defaults so the crate runs fully offline in tests.
    pub fn from_env() -> Self {
        let embedding_dim = env::var("EMBEDDING_DIM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(384);

        let embedding_model_version =
            env::var("EMBEDDING_MODEL_VERSION").unwrap_or_else(|_| "local-v1".to_string());

        let data_dir = env::var("MATCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(".skillmatch"));

        let mut llm_credentials = HashMap::new();
        for purpose in KNOWN_PURPOSES {
            let env_key = format!("LLM_KEY_{}", purpose.to_uppercase());
            if let Ok(value) = env::var(&env_key) {
                if !value.is_empty() {
                    llm_credentials.insert(purpose.to_string(), value);
                }
            }
        }
        for n in 1..=3 {
            let env_key = format!("LLM_KEY_FALLBACK_{}", n);
            if let Ok(value) = env::var(&env_key) {
                if !value.is_empty() {
                    llm_credentials.insert(format!("fallback_{}", n), value);
                }
            }
        }

        let object_store_bucket =
            env::var("OBJECT_STORE_BUCKET").unwrap_or_else(|_| "resumes".to_string());

        let precompute_workers = env::var("PRECOMPUTE_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| num_cpus::get().max(1));

        Self {
            embedding_dim,
            embedding_model_version,
            data_dir,
            llm_credentials,
            object_store_bucket,
            precompute_workers,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("skillmatch.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("skillmatch.log")
    }

    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
