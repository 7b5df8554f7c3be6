//! Application Scorer (C10): submit-time scoring against the effective
//! resume (tailored or base), blended with the C8 baseline for ranking.

use crate::document_parser;
use crate::domain::{Application, ApplicationStatus, EducationEntry, Resume, ResumeKind};
use crate::embedding::EmbeddingGateway;
use crate::error::{DatabaseError, MatchError, MatchResult};
use crate::llm::LlmKeyPool;
use crate::match_store;
use crate::resume_intelligence;
use crate::scoring::{self, ScoringInput};
use crate::vector_store::{joined_list, Collection, Metadata, MetadataValue, VectorStore};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

/// Blend applied at ranking time when the application used a tailored
/// resume: `0.8 * application_score + 0.2 * baseline`.
pub const TAILORED_BLEND_APPLICATION_WEIGHT: f64 = 0.8;
pub const TAILORED_BLEND_BASELINE_WEIGHT: f64 = 0.2;

pub struct SubmitApplicationInput<'a> {
    pub candidate_id: i64,
    pub posting_id: i64,
    pub tailored_resume_bytes: Option<&'a [u8]>,
    pub tailored_resume_file_name: Option<&'a str>,
    pub use_tailored: bool,
}

pub struct SubmitOutcome {
    pub application: Application,
    pub used_tailored_resume: bool,
}

/// Submit an application. Fails with `NoActiveResume` if the candidate has
/// no active base resume, and `AlreadyApplied` on a duplicate
/// (candidate, posting) pair.
pub async fn submit_application(
    conn: &Connection,
    vectors: &VectorStore,
    embeddings: &EmbeddingGateway,
    llm: Option<&LlmKeyPool>,
    input: SubmitApplicationInput<'_>,
) -> MatchResult<SubmitOutcome> {
    let already: Option<i64> = conn
        .query_row(
            "SELECT id FROM applications WHERE candidate_id = ?1 AND posting_id = ?2",
            params![input.candidate_id, input.posting_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(DatabaseError::from)?;
    if already.is_some() {
        return Err(MatchError::AlreadyApplied);
    }

    let base_resume = load_active_base_resume(conn, input.candidate_id)?.ok_or(MatchError::NoActiveResume)?;
    let posting = load_posting(conn, input.posting_id)?;

    let (effective_resume, used_tailored) = if input.use_tailored {
        match input.tailored_resume_bytes {
            Some(bytes) => {
                match build_tailored_resume(
                    conn,
                    vectors,
                    embeddings,
                    llm,
                    &base_resume,
                    input.posting_id,
                    bytes,
                    input.tailored_resume_file_name.unwrap_or("tailored_resume.txt"),
                )
                .await
                {
                    Ok(tailored) => (tailored, true),
                    Err(_) => (base_resume.clone(), false),
                }
            }
            None => (base_resume.clone(), false),
        }
    } else {
        (base_resume.clone(), false)
    };

    let resume_vector = vectors.get(Collection::Resumes, &effective_resume.id.to_string())?;
    let posting_vector = vectors.get(Collection::Postings, &posting.id.to_string())?;

    let application_score = match (resume_vector, posting_vector) {
        (Some((rv, _)), Some((pv, _))) if !rv.is_empty() && !pv.is_empty() => {
            let education_entries: Vec<EducationEntry> = effective_resume.parsed_data.education.clone();
            let scoring_input = ScoringInput {
                candidate_vector: &rv,
                posting_vector: &pv,
                candidate_skills: &effective_resume.extracted_skills,
                required_skills: &posting.required_skills,
                preferred_skills: &posting.preferred_skills,
                candidate_years: effective_resume.parsed_data.total_experience_years,
                min_experience: posting.min_experience,
                max_experience: posting.max_experience,
                candidate_education: &education_entries,
                required_education: posting.required_education.as_deref(),
                project_count: effective_resume.parsed_data.projects.len(),
                certification_count: effective_resume.parsed_data.certifications.len(),
            };
            scoring::score(&scoring_input).ok().map(|b| b.composite)
        }
        _ => None,
    };

    let baseline = match_store::get_one(conn, input.candidate_id, input.posting_id)?;

    let application_similarity_score = application_score.unwrap_or(0.0);
    let match_score = if application_similarity_score == 0.0 {
        baseline.as_ref().map(|b| b.composite).unwrap_or(0.0)
    } else {
        application_similarity_score
    };

    let now = Utc::now();
    conn.execute(
        "INSERT INTO applications (candidate_id, posting_id, resume_id, match_score, application_similarity_score, used_tailored_resume, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            input.candidate_id,
            input.posting_id,
            effective_resume.id,
            match_score.round() as i64,
            application_similarity_score.round() as i64,
            used_tailored as i64,
            ApplicationStatus::Pending.as_str(),
            now.to_rfc3339(),
        ],
    )
    .map_err(DatabaseError::from)?;

    let id = conn.last_insert_rowid();
    Ok(SubmitOutcome {
        application: Application {
            id,
            candidate_id: input.candidate_id,
            posting_id: input.posting_id,
            resume_id: effective_resume.id,
            match_score: match_score.round() as i64,
            application_similarity_score: application_similarity_score.round() as i64,
            used_tailored_resume: used_tailored,
            status: ApplicationStatus::Pending,
            created_at: now,
        },
        used_tailored_resume: used_tailored,
    })
}

/// Effective ranking score for an applicant row per §4.10: blend tailored
/// application score with baseline, or fall back to whichever is available.
pub fn ranking_score(used_tailored: bool, application_score: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    match (used_tailored, application_score, baseline) {
        (true, Some(app), Some(base)) => {
            Some(TAILORED_BLEND_APPLICATION_WEIGHT * app + TAILORED_BLEND_BASELINE_WEIGHT * base)
        }
        (true, Some(_), None) => baseline,
        (true, None, base) => base,
        (false, _, Some(base)) => Some(base),
        (false, _, None) => application_score,
    }
}

async fn build_tailored_resume(
    conn: &Connection,
    vectors: &VectorStore,
    embeddings: &EmbeddingGateway,
    llm: Option<&LlmKeyPool>,
    base: &Resume,
    posting_id: i64,
    bytes: &[u8],
    file_name: &str,
) -> MatchResult<Resume> {
    let text = document_parser::extract_text(file_name, bytes)?;
    let extraction = resume_intelligence::extract(&text, llm).await;
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());

    let embedding_text = format!("{} {}", text, extraction.all_skills.join(" "));
    let vector = embeddings.embed(&embedding_text).await?;

    conn.execute(
        "INSERT INTO resumes (candidate_id, file_name, parsed_text, parsed_data, extracted_skills, content_hash, kind, tailored_for_posting_id, base_resume_id, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'tailored', ?7, ?8, 1)",
        params![
            base.candidate_id,
            file_name,
            text,
            serde_json::to_string(&extraction).map_err(|e| MatchError::Validation(e.to_string()))?,
            serde_json::to_string(&extraction.all_skills).map_err(|e| MatchError::Validation(e.to_string()))?,
            content_hash,
            posting_id,
            base.id,
        ],
    )
    .map_err(DatabaseError::from)?;
    let resume_id = conn.last_insert_rowid();

    let mut metadata: Metadata = Metadata::new();
    metadata.insert("candidate_id".to_string(), MetadataValue::Number(base.candidate_id as f64));
    metadata.insert("tailored_for_posting_id".to_string(), MetadataValue::Number(posting_id as f64));
    metadata.insert("skills".to_string(), joined_list(&extraction.all_skills));
    vectors.upsert(Collection::Resumes, &resume_id.to_string(), vector, metadata)?;
    conn.execute(
        "UPDATE resumes SET embedding_ref = ?1 WHERE id = ?2",
        params![resume_id.to_string(), resume_id],
    )
    .map_err(DatabaseError::from)?;

    Ok(Resume {
        id: resume_id,
        candidate_id: base.candidate_id,
        storage_key: None,
        local_path: None,
        file_name: file_name.to_string(),
        parsed_text: text,
        extracted_skills: extraction.all_skills.clone(),
        parsed_data: extraction,
        content_hash,
        embedding_ref: Some(resume_id.to_string()),
        active: true,
        kind: ResumeKind::Tailored,
        tailored_for_posting_id: Some(posting_id),
        base_resume_id: Some(base.id),
    })
}

struct PostingRecord {
    id: i64,
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
    min_experience: f64,
    max_experience: f64,
    required_education: Option<String>,
}

fn load_posting(conn: &Connection, posting_id: i64) -> MatchResult<PostingRecord> {
    conn.query_row(
        "SELECT id, required_skills, preferred_skills, min_experience, max_experience, required_education FROM postings WHERE id = ?1",
        params![posting_id],
        |row| {
            let required_json: String = row.get(1)?;
            let preferred_json: String = row.get(2)?;
            Ok(PostingRecord {
                id: row.get(0)?,
                required_skills: serde_json::from_str(&required_json).unwrap_or_default(),
                preferred_skills: serde_json::from_str(&preferred_json).unwrap_or_default(),
                min_experience: row.get(3)?,
                max_experience: row.get(4)?,
                required_education: row.get(5)?,
            })
        },
    )
    .map_err(|e| DatabaseError::from(e).into())
}

fn load_active_base_resume(conn: &Connection, candidate_id: i64) -> MatchResult<Option<Resume>> {
    conn.query_row(
        "SELECT id, candidate_id, storage_key, local_path, file_name, parsed_text, parsed_data, extracted_skills, content_hash, embedding_ref, active, kind, tailored_for_posting_id, base_resume_id
         FROM resumes WHERE candidate_id = ?1 AND kind = 'base' AND active = 1",
        params![candidate_id],
        row_to_resume,
    )
    .optional()
    .map_err(|e| DatabaseError::from(e).into())
}

fn row_to_resume(row: &rusqlite::Row) -> rusqlite::Result<Resume> {
    let parsed_data_json: String = row.get(6)?;
    let extracted_skills_json: String = row.get(7)?;
    let kind_str: String = row.get(11)?;
    Ok(Resume {
        id: row.get(0)?,
        candidate_id: row.get(1)?,
        storage_key: row.get(2)?,
        local_path: row.get(3)?,
        file_name: row.get(4)?,
        parsed_text: row.get(5)?,
        parsed_data: serde_json::from_str(&parsed_data_json).unwrap_or_default(),
        extracted_skills: serde_json::from_str(&extracted_skills_json).unwrap_or_default(),
        content_hash: row.get(8)?,
        embedding_ref: row.get(9)?,
        active: row.get::<_, i64>(10)? != 0,
        kind: ResumeKind::from_str(&kind_str).unwrap_or(ResumeKind::Base),
        tailored_for_posting_id: row.get(12)?,
        base_resume_id: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_score_blends_tailored_with_baseline() {
        let result = ranking_score(true, Some(90.0), Some(70.0));
        assert_eq!(result, Some(86.0));
    }

    #[test]
    fn ranking_score_falls_back_to_baseline_without_tailored_embedding() {
        let result = ranking_score(true, None, Some(70.0));
        assert_eq!(result, Some(70.0));
    }

    #[test]
    fn ranking_score_uses_baseline_when_no_tailoring_occurred() {
        let result = ranking_score(false, Some(90.0), Some(70.0));
        assert_eq!(result, Some(70.0));
    }
}
