//! Matching engine core: the content pipeline that turns resumes and
//! postings into structured records and embeddings, the scoring engine, the
//! materialized match store, and the hybrid application-time scoring path.

pub mod application_scorer;
pub mod config;
pub mod db;
pub mod document_parser;
pub mod domain;
pub mod duplicate_detector;
pub mod embedding;
pub mod error;
pub mod export;
pub mod llm;
pub mod logging;
pub mod match_store;
pub mod object_store;
pub mod posting_intelligence;
pub mod precomputer;
pub mod ranking;
pub mod resume_intelligence;
pub mod scoring;
pub mod vector_store;
