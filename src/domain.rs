//! Core data model: Candidate, Posting, Resume, Application, Match.
//!
//! Entities and invariants for the matching engine's data model.
//! Dynamic JSON-ish fields (skills lists, structured extraction blobs) carry
//! an explicit `schema_version` alongside the serialized payload so older
//! rows can be migrated on read, per the design note on dynamic JSON blobs.

use serde::{Deserialize, Serialize};

pub const RESUME_SCHEMA_VERSION: i64 = 1;
pub const POSTING_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub active: bool,
    /// Cached mirror of the active resume's extraction.
    pub skills: Vec<String>,
    /// Cached mirror of the active resume's extraction.
    pub total_experience_years: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub min_experience: f64,
    pub max_experience: f64,
    pub required_education: Option<String>,
    pub active: bool,
    pub content_hash: String,
}

impl Posting {
    /// Default experience band when a posting doesn't specify one: `[0, 10]`.
    pub fn default_band() -> (f64, f64) {
        (0.0, 10.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeKind {
    Base,
    Tailored,
}

impl ResumeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeKind::Base => "base",
            ResumeKind::Tailored => "tailored",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "base" => Some(ResumeKind::Base),
            "tailored" => Some(ResumeKind::Tailored),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: i64,
    pub candidate_id: i64,
    pub storage_key: Option<String>,
    pub local_path: Option<String>,
    pub file_name: String,
    pub parsed_text: String,
    pub parsed_data: ResumeExtraction,
    pub extracted_skills: Vec<String>,
    pub content_hash: String,
    pub embedding_ref: Option<String>,
    pub active: bool,
    pub kind: ResumeKind,
    pub tailored_for_posting_id: Option<i64>,
    pub base_resume_id: Option<i64>,
}

/// The structured resume extraction schema produced by the Resume
/// Intelligence component (C5). All fields are required in the schema;
/// values may be empty when extraction could not populate them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeExtraction {
    pub personal_info: PersonalInfo,
    pub skills: SkillBuckets,
    pub all_skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub total_experience_months: i64,
    pub total_experience_years: f64,
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillBuckets {
    pub technical: Vec<String>,
    pub soft: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub field: String,
    pub institution: String,
    pub year: String,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: String,
    pub date: Option<String>,
}

/// The structured posting extraction produced or confirmed by C6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostingExtraction {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub location: Option<String>,
    pub min_experience: Option<f64>,
    pub max_experience: Option<f64>,
    pub required_education: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub candidate_id: i64,
    pub posting_id: i64,
    pub resume_id: i64,
    pub match_score: i64,
    pub application_similarity_score: i64,
    pub used_tailored_resume: bool,
    pub status: ApplicationStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A materialized row in the Match store (C8), keyed by (candidate_id,
/// posting_id). Exists only when both sides are active and the candidate
/// has an active base resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRow {
    pub candidate_id: i64,
    pub posting_id: i64,
    pub resume_id: i64,
    pub composite: f64,
    pub semantic: f64,
    pub skills: f64,
    pub experience: f64,
    pub last_computed: chrono::DateTime<chrono::Utc>,
}
