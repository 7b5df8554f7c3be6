//! Object storage for original resume files (out of scope to implement for
//! real — this crate defines the seam and a local-disk stand-in so resume
//! upload is runnable offline).
//!
//! Key layout: `resumes/{candidate_id}/base/{timestamp}_{filename}` or
//! `resumes/{candidate_id}/tailored/{posting_id}/{timestamp}_{filename}`.

use crate::error::{MatchError, MatchResult};
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> MatchResult<()>;
    async fn get(&self, key: &str) -> MatchResult<Vec<u8>>;
    async fn delete(&self, key: &str) -> MatchResult<()>;
    /// A short-lived access URL (<= 1 hour) for HR views.
    async fn presigned_url(&self, key: &str) -> MatchResult<String>;
}

pub fn base_resume_key(candidate_id: i64, timestamp: i64, file_name: &str) -> String {
    format!("resumes/{}/base/{}_{}", candidate_id, timestamp, file_name)
}

pub fn tailored_resume_key(candidate_id: i64, posting_id: i64, timestamp: i64, file_name: &str) -> String {
    format!("resumes/{}/tailored/{}/{}_{}", candidate_id, posting_id, timestamp, file_name)
}

/// Local-disk stand-in for the real object store: writes under a base
/// directory, "presigns" by returning a `file://` path (local runs have no
/// need for real signed URLs).
pub struct LocalObjectStore {
    base_dir: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> MatchResult<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> MatchResult<Vec<u8>> {
        let path = self.resolve(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| MatchError::Io(format!("failed to read object {}: {}", key, e)))
    }

    async fn delete(&self, key: &str) -> MatchResult<()> {
        let path = self.resolve(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MatchError::Io(e.to_string())),
        }
    }

    async fn presigned_url(&self, key: &str) -> MatchResult<String> {
        Ok(format!("file://{}", self.resolve(key).display()))
    }
}
