//! Unified error types for the matching core
//!
//! Each external collaborator failure and each boundary rejection gets its
//! own variant so callers can map to transport-specific codes without
//! string-matching messages.

use std::fmt;

/// Top-level error type returned by every public operation in this crate.
#[derive(Debug, Clone)]
pub enum MatchError {
    /// Upload used a MIME type the document parser doesn't support.
    UnsupportedFormat(String),
    /// Scoring was asked to compare a candidate/posting with a missing or
    /// zero embedding. Never silently substituted with a default score.
    EmbeddingMissing(String),
    /// All LLM credentials in the pool were exhausted.
    LlmUnavailable(String),
    /// Applying with no active base resume on file.
    NoActiveResume,
    /// Second application to the same (candidate, posting) pair.
    AlreadyApplied,
    /// A collaborator (vector store, relational store, object store) could
    /// not be reached after retries.
    UpstreamUnavailable(String),
    /// Role/ownership check failed at a boundary.
    NotAuthorized(String),
    /// Input failed validation before any collaborator was called.
    Validation(String),
    /// Database-layer error not covered by a more specific variant.
    Database(DatabaseError),
    /// Configuration is missing or malformed.
    Configuration(String),
    /// Local filesystem / IO error.
    Io(String),
}

#[derive(Debug, Clone)]
pub enum DatabaseError {
    ConnectionFailed(String),
    QueryFailed(String),
    MigrationFailed(String),
    ConstraintViolation(String),
    NotFound(String),
    InvalidData(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::UnsupportedFormat(mime) => write!(f, "unsupported document format: {}", mime),
            MatchError::EmbeddingMissing(ctx) => write!(f, "embedding missing: {}", ctx),
            MatchError::LlmUnavailable(msg) => write!(f, "LLM unavailable: {}", msg),
            MatchError::NoActiveResume => write!(f, "candidate has no active base resume"),
            MatchError::AlreadyApplied => write!(f, "candidate already applied to this posting"),
            MatchError::UpstreamUnavailable(what) => write!(f, "upstream unavailable: {}", what),
            MatchError::NotAuthorized(msg) => write!(f, "not authorized: {}", msg),
            MatchError::Validation(msg) => write!(f, "validation error: {}", msg),
            MatchError::Database(e) => write!(f, "database error: {}", e),
            MatchError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            MatchError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            DatabaseError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            DatabaseError::MigrationFailed(msg) => write!(f, "migration failed: {}", msg),
            DatabaseError::ConstraintViolation(msg) => write!(f, "constraint violation: {}", msg),
            DatabaseError::NotFound(msg) => write!(f, "not found: {}", msg),
            DatabaseError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
        }
    }
}

impl std::error::Error for MatchError {}
impl std::error::Error for DatabaseError {}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let detail = msg.unwrap_or_else(|| format!("sqlite error code: {:?}", e.code));
                match e.code {
                    rusqlite::ErrorCode::ConstraintViolation => DatabaseError::ConstraintViolation(detail),
                    _ => DatabaseError::QueryFailed(detail),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound("query returned no rows".to_string()),
            other => DatabaseError::QueryFailed(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for MatchError {
    fn from(err: rusqlite::Error) -> Self {
        MatchError::Database(err.into())
    }
}

impl From<DatabaseError> for MatchError {
    fn from(err: DatabaseError) -> Self {
        MatchError::Database(err)
    }
}

impl From<std::io::Error> for MatchError {
    fn from(err: std::io::Error) -> Self {
        MatchError::Io(err.to_string())
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
