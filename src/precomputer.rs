//! Pre-computer (C9): materializes the Match store by walking (active
//! candidate, active posting) pairs, using a bounded worker-pool for
//! concurrency.

use crate::domain::MatchRow;
use crate::error::MatchResult;
use crate::match_store;
use crate::scoring::{self, ScoringInput};
use crate::vector_store::{Collection, VectorStore};
use chrono::Utc;
use log::{info, warn};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputeStats {
    pub pairs_considered: u64,
    pub rows_written: u64,
    pub pairs_skipped: u64,
}

struct CandidateSeed {
    id: i64,
    resume_id: i64,
    skills: Vec<String>,
    years: f64,
    education_degree: Option<String>,
    project_count: usize,
    cert_count: usize,
}

struct PostingSeed {
    id: i64,
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
    min_experience: f64,
    max_experience: f64,
    required_education: Option<String>,
    title: String,
    description: String,
}

/// Recompute the entire Match store across all active candidates with an
/// active base resume and all active postings.
pub async fn compute_all(
    conn: &Connection,
    vectors: &VectorStore,
    worker_count: usize,
) -> MatchResult<PrecomputeStats> {
    let candidates = load_active_candidates(conn)?;
    let postings = load_active_postings(conn)?;
    compute_pairs(conn, vectors, &candidates, &postings, worker_count).await
}

/// One candidate against all active postings. Deletes existing rows for
/// that candidate first so a targeted recompute leaves no stale rows behind.
pub async fn compute_for_candidate(
    conn: &Connection,
    vectors: &VectorStore,
    candidate_id: i64,
    worker_count: usize,
) -> MatchResult<PrecomputeStats> {
    match_store::delete_where(conn, Some(candidate_id), None)?;
    let candidates = load_active_candidates(conn)?
        .into_iter()
        .filter(|c| c.id == candidate_id)
        .collect::<Vec<_>>();
    let postings = load_active_postings(conn)?;
    compute_pairs(conn, vectors, &candidates, &postings, worker_count).await
}

/// One posting against all active candidates. Symmetric to
/// `compute_for_candidate`.
pub async fn compute_for_posting(
    conn: &Connection,
    vectors: &VectorStore,
    posting_id: i64,
    worker_count: usize,
) -> MatchResult<PrecomputeStats> {
    match_store::delete_where(conn, None, Some(posting_id))?;
    let candidates = load_active_candidates(conn)?;
    let postings = load_active_postings(conn)?
        .into_iter()
        .filter(|p| p.id == posting_id)
        .collect::<Vec<_>>();
    compute_pairs(conn, vectors, &candidates, &postings, worker_count).await
}

async fn compute_pairs(
    conn: &Connection,
    vectors: &VectorStore,
    candidates: &[CandidateSeed],
    postings: &[PostingSeed],
    worker_count: usize,
) -> MatchResult<PrecomputeStats> {
    let semaphore = Arc::new(Semaphore::new(worker_count.max(1)));
    let mut stats = PrecomputeStats::default();

    for candidate in candidates {
        let candidate_vector = match vectors.get(Collection::Resumes, &candidate.id.to_string()) {
            Ok(Some((v, _))) if !v.is_empty() => v,
            _ => {
                warn!("skipping candidate {}: resume embedding missing", candidate.id);
                stats.pairs_skipped += postings.len() as u64;
                continue;
            }
        };

        let mut rows = Vec::new();
        let mut tasks = Vec::new();
        for posting in postings {
            stats.pairs_considered += 1;
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let posting_vector = match vectors.get(Collection::Postings, &posting.id.to_string()) {
                Ok(Some((v, _))) if !v.is_empty() => Some(v),
                _ => None,
            };
            let candidate_vector = candidate_vector.clone();
            let candidate_id = candidate.id;
            let resume_id = candidate.resume_id;
            let candidate_skills = candidate.skills.clone();
            let years = candidate.years;
            let education = candidate.education_degree.clone();
            let project_count = candidate.project_count;
            let cert_count = candidate.cert_count;
            let posting_id = posting.id;
            let required = posting.required_skills.clone();
            let preferred = posting.preferred_skills.clone();
            let min_exp = posting.min_experience;
            let max_exp = posting.max_experience;
            let required_education = posting.required_education.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let posting_vector = match posting_vector {
                    Some(v) => v,
                    None => return None,
                };
                let education_entries: Vec<crate::domain::EducationEntry> = education
                    .map(|degree| vec![crate::domain::EducationEntry { degree, ..Default::default() }])
                    .unwrap_or_default();
                let input = ScoringInput {
                    candidate_vector: &candidate_vector,
                    posting_vector: &posting_vector,
                    candidate_skills: &candidate_skills,
                    required_skills: &required,
                    preferred_skills: &preferred,
                    candidate_years: years,
                    min_experience: min_exp,
                    max_experience: max_exp,
                    candidate_education: &education_entries,
                    required_education: required_education.as_deref(),
                    project_count,
                    certification_count: cert_count,
                };
                scoring::score(&input).ok().map(|breakdown| MatchRow {
                    candidate_id,
                    posting_id,
                    resume_id,
                    composite: breakdown.composite,
                    semantic: breakdown.semantic,
                    skills: breakdown.skills,
                    experience: breakdown.experience,
                    last_computed: Utc::now(),
                })
            }));
        }

        for task in tasks {
            match task.await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => stats.pairs_skipped += 1,
                Err(e) => warn!("precompute task panicked: {}", e),
            }
        }

        stats.rows_written += rows.len() as u64;
        if !rows.is_empty() {
            match_store::upsert_many(conn, &rows)?;
        }
    }

    info!(
        "precompute finished: considered={} written={} skipped={}",
        stats.pairs_considered, stats.rows_written, stats.pairs_skipped
    );
    Ok(stats)
}

fn load_active_candidates(conn: &Connection) -> MatchResult<Vec<CandidateSeed>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, r.id, c.skills, c.total_experience_years, r.parsed_data
         FROM candidates c
         JOIN resumes r ON r.candidate_id = c.id AND r.kind = 'base' AND r.active = 1
         WHERE c.active = 1",
    )?;
    let rows = stmt.query_map([], |row| {
        let skills_json: String = row.get(2)?;
        let parsed_data: String = row.get(4)?;
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, skills_json, row.get::<_, f64>(3)?, parsed_data))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, resume_id, skills_json, years, parsed_data) = row?;
        let skills: Vec<String> = serde_json::from_str(&skills_json).unwrap_or_default();
        let extraction: crate::domain::ResumeExtraction = serde_json::from_str(&parsed_data).unwrap_or_default();
        let education_degree = extraction.education.first().map(|e| e.degree.clone());
        out.push(CandidateSeed {
            id,
            resume_id,
            skills,
            years,
            education_degree,
            project_count: extraction.projects.len(),
            cert_count: extraction.certifications.len(),
        });
    }
    Ok(out)
}

fn load_active_postings(conn: &Connection) -> MatchResult<Vec<PostingSeed>> {
    let mut stmt = conn.prepare(
        "SELECT id, required_skills, preferred_skills, min_experience, max_experience, required_education, title, description
         FROM postings WHERE active = 1",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, required_json, preferred_json, min_exp, max_exp, required_education, title, description) = row?;
        out.push(PostingSeed {
            id,
            required_skills: serde_json::from_str(&required_json).unwrap_or_default(),
            preferred_skills: serde_json::from_str(&preferred_json).unwrap_or_default(),
            min_experience: min_exp,
            max_experience: max_exp,
            required_education,
            title,
            description,
        });
    }
    Ok(out)
}
