//! Ranking & Recommendation API (C12): shared filter/sort/paginate pipeline
//! over the Match store, joined with postings or candidates and, for
//! applicants, blended with the Application Scorer's tailored-resume path.
//!
//! Filtering order: candidate-active -> match present -> scalar filters ->
//! flagged filter -> sort -> paginate.

use crate::application_scorer;
use crate::duplicate_detector::{self, CandidateIdentity, FlagInfo};
use crate::error::{DatabaseError, MatchResult};
use crate::match_store::{Page, PagedResult, Sort, SortDirection, SortField};
use crate::scoring::{self, ScoreBreakdown};
use crate::vector_store::{Collection, VectorStore};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, Default)]
pub struct RecommendationFilters {
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub required_skills_subset: Vec<String>,
    pub location_substring: Option<String>,
    pub experience_level: Option<String>,
    pub posted_within_days: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RecommendedPosting {
    pub posting_id: i64,
    pub title: String,
    pub match_score: i64,
}

struct CandidateMatchRow {
    posting_id: i64,
    title: String,
    required_skills: Vec<String>,
    experience_level: Option<String>,
    created_at: chrono::DateTime<Utc>,
    composite: f64,
}

/// All Match-store rows for a candidate, joined with active postings. No
/// SQL-level pagination: scalar filters run over the full set in
/// `recommend_for_candidate` before pagination, so `total` always reflects
/// the post-filter count.
fn load_candidate_matches(conn: &Connection, candidate_id: i64) -> MatchResult<Vec<CandidateMatchRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT m.posting_id, p.title, p.required_skills, p.experience_level, p.created_at, m.composite
             FROM matches m JOIN postings p ON p.id = m.posting_id
             WHERE m.candidate_id = ?1 AND p.active = 1",
        )
        .map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(params![candidate_id], |row| {
            let required_json: String = row.get(2)?;
            let created_at_str: String = row.get(4)?;
            Ok(CandidateMatchRow {
                posting_id: row.get(0)?,
                title: row.get(1)?,
                required_skills: serde_json::from_str(&required_json).unwrap_or_default(),
                experience_level: row.get(3)?,
                created_at: parse_sqlite_datetime(&created_at_str),
                composite: row.get(5)?,
            })
        })
        .map_err(DatabaseError::from)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(DatabaseError::from)?);
    }
    Ok(out)
}

/// `postings.created_at` is written via SQLite's `datetime('now')`, which
/// produces `YYYY-MM-DD HH:MM:SS` in UTC, not RFC3339.
fn parse_sqlite_datetime(s: &str) -> chrono::DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| chrono::DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// `recommend_for_candidate`: C8 rows for this candidate, joined with
/// active postings, filtered by score band, required-skills superset,
/// location, experience level, and posting recency, then sorted and
/// paginated. Filters run over the full result set before pagination so
/// later pages never drop rows that match and `total` is the post-filter
/// count, not the raw row count.
pub fn recommend_for_candidate(
    conn: &Connection,
    candidate_id: i64,
    filters: &RecommendationFilters,
    sort: Sort,
    page: Page,
) -> MatchResult<PagedResult<RecommendedPosting>> {
    let rows = load_candidate_matches(conn, candidate_id)?;

    let mut filtered = Vec::new();
    for row in rows {
        if let Some(min) = filters.min_score {
            if row.composite < min {
                continue;
            }
        }
        if let Some(max) = filters.max_score {
            if row.composite > max {
                continue;
            }
        }
        if !filters.required_skills_subset.is_empty() {
            let lower: Vec<String> = row.required_skills.iter().map(|s| s.to_lowercase()).collect();
            let satisfied = filters
                .required_skills_subset
                .iter()
                .all(|s| lower.contains(&s.to_lowercase()));
            if !satisfied {
                continue;
            }
        }
        if let Some(substring) = &filters.location_substring {
            let location = load_posting_location(conn, row.posting_id)?;
            if !location.to_lowercase().contains(&substring.to_lowercase()) {
                continue;
            }
        }
        if let Some(level) = &filters.experience_level {
            let matches_level = row.experience_level.as_deref().map(|pl| pl.eq_ignore_ascii_case(level)).unwrap_or(false);
            if !matches_level {
                continue;
            }
        }
        if let Some(days) = filters.posted_within_days {
            let cutoff = Utc::now() - chrono::Duration::days(days);
            if row.created_at < cutoff {
                continue;
            }
        }
        filtered.push(row);
    }

    sort_recommended(&mut filtered, sort);

    let total = filtered.len() as u64;
    let start = ((page.number.max(1) - 1) * page.size) as usize;
    let items = filtered
        .into_iter()
        .skip(start)
        .take(page.size as usize)
        .map(|row| RecommendedPosting { posting_id: row.posting_id, title: row.title, match_score: row.composite.round() as i64 })
        .collect();

    Ok(PagedResult { total, page: page.number, size: page.size, items })
}

fn sort_recommended(items: &mut [CandidateMatchRow], sort: Sort) {
    items.sort_by(|a, b| {
        let ordering = match sort.field {
            SortField::PostedAt | SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.cmp(&b.title),
            _ => a.composite.partial_cmp(&b.composite).unwrap_or(std::cmp::Ordering::Equal),
        };
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[derive(Debug, Clone, Default)]
pub struct PostingRankingFilters {
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub only_applicants: bool,
    pub exclude_flagged: bool,
    pub matched_skills_contain_all: Vec<String>,
    pub min_education_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub candidate_id: i64,
    pub display_name: String,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_gap: f64,
    pub is_flagged: bool,
    pub flag_reasons: Vec<&'static str>,
    pub flag_reason_text: String,
    pub has_tailored_resume: bool,
    pub composite: f64,
    pub scoring_breakdown: Option<ScoreBreakdown>,
}

/// `rank_candidates_for_posting`: C8 rows for this posting, joined with
/// active candidates and their active base resumes. Applicant rows get the
/// tailored-resume blend from C10; the full breakdown (matched/missing
/// skills, experience gap, component scores) is recomputed per row against
/// the resume actually being scored rather than read from the stored
/// composite alone. Flag annotation always runs before the
/// `exclude_flagged` filter so unfiltered responses still carry flag state.
pub fn rank_candidates_for_posting(
    conn: &Connection,
    vectors: &VectorStore,
    posting_id: i64,
    filters: &PostingRankingFilters,
    sort: Sort,
    page: Page,
) -> MatchResult<PagedResult<RankedCandidate>> {
    let rows = load_posting_matches(conn, posting_id)?;
    let candidates_with_resume = load_candidates_with_active_resume(conn)?;
    let flags = duplicate_detector::detect_flagged_candidates(&candidates_with_resume);

    let mut out = Vec::new();
    for row in rows {
        let (scoring_resume_id, has_tailored) = if filters.only_applicants {
            let Some(app) = load_application(conn, row.candidate_id, posting_id)? else {
                continue;
            };
            (app.resume_id, app.used_tailored_resume)
        } else {
            let Some(base_resume_id) = load_active_base_resume_id(conn, row.candidate_id)? else {
                continue;
            };
            (base_resume_id, false)
        };

        let mut breakdown = compute_breakdown(conn, vectors, scoring_resume_id, posting_id)?;
        if has_tailored && breakdown.is_none() {
            if let Some(base_resume_id) = load_active_base_resume_id(conn, row.candidate_id)? {
                breakdown = compute_breakdown(conn, vectors, base_resume_id, posting_id)?;
            }
        }

        let effective_score = if has_tailored {
            let tailored_composite = breakdown.as_ref().map(|b| b.composite);
            application_scorer::ranking_score(true, tailored_composite, Some(row.composite)).unwrap_or(row.composite)
        } else {
            row.composite
        };

        if let Some(min) = filters.min_score {
            if effective_score < min {
                continue;
            }
        }
        if let Some(max) = filters.max_score {
            if effective_score > max {
                continue;
            }
        }

        let (matched_skills, missing_skills, experience_gap) = match &breakdown {
            Some(b) => (b.matched_skills.clone(), b.missing_skills.clone(), b.experience_gap),
            None => (Vec::new(), Vec::new(), 0.0),
        };

        if !filters.matched_skills_contain_all.is_empty() {
            let lower_matched: Vec<String> = matched_skills.iter().map(|s| s.to_lowercase()).collect();
            let satisfied = filters
                .matched_skills_contain_all
                .iter()
                .all(|s| lower_matched.contains(&s.to_lowercase()));
            if !satisfied {
                continue;
            }
        }

        if let Some(min_level_name) = &filters.min_education_level {
            if let Some(required_level) = scoring::education_level(min_level_name) {
                let resume = load_resume_seed(conn, scoring_resume_id)?;
                let candidate_level = resume.education.iter().filter_map(|e| scoring::education_level(&e.degree)).max();
                if candidate_level.unwrap_or(0) < required_level {
                    continue;
                }
            }
        }

        let empty = FlagInfo::default();
        let flag_info = flags.get(&row.candidate_id).unwrap_or(&empty);
        let is_flagged = flag_info.is_flagged();
        if filters.exclude_flagged && is_flagged {
            continue;
        }

        let candidate_name = load_candidate_name(conn, row.candidate_id)?;
        out.push(RankedCandidate {
            candidate_id: row.candidate_id,
            display_name: candidate_name,
            matched_skills,
            missing_skills,
            experience_gap,
            is_flagged,
            flag_reasons: flag_info.flag_reasons.clone(),
            flag_reason_text: flag_info.reason_text(),
            has_tailored_resume: has_tailored,
            composite: effective_score,
            scoring_breakdown: breakdown,
        });
    }

    sort_ranked(&mut out, sort);
    let total = out.len() as u64;
    let start = ((page.number.max(1) - 1) * page.size) as usize;
    let items = out.into_iter().skip(start).take(page.size as usize).collect();

    Ok(PagedResult { total, page: page.number, size: page.size, items })
}

fn sort_ranked(items: &mut [RankedCandidate], sort: Sort) {
    items.sort_by(|a, b| {
        let ordering = match sort.field {
            SortField::Composite | SortField::Experience => {
                a.composite.partial_cmp(&b.composite).unwrap_or(std::cmp::Ordering::Equal)
            }
            SortField::Name => a.display_name.cmp(&b.display_name),
            _ => a.composite.partial_cmp(&b.composite).unwrap_or(std::cmp::Ordering::Equal),
        };
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

struct ApplicationRecord {
    resume_id: i64,
    used_tailored_resume: bool,
}

struct ResumeSeed {
    skills: Vec<String>,
    years: f64,
    education: Vec<crate::domain::EducationEntry>,
    project_count: usize,
    certification_count: usize,
}

fn load_resume_seed(conn: &Connection, resume_id: i64) -> MatchResult<ResumeSeed> {
    let (skills_json, parsed_data_json): (String, String) = conn
        .query_row(
            "SELECT extracted_skills, parsed_data FROM resumes WHERE id = ?1",
            params![resume_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .map_err(DatabaseError::from)?;
    let skills: Vec<String> = serde_json::from_str(&skills_json).unwrap_or_default();
    let extraction: crate::domain::ResumeExtraction = serde_json::from_str(&parsed_data_json).unwrap_or_default();
    Ok(ResumeSeed {
        skills,
        years: extraction.total_experience_years,
        education: extraction.education,
        project_count: extraction.projects.len(),
        certification_count: extraction.certifications.len(),
    })
}

/// Recompute the full C7 breakdown for a (resume, posting) pair from their
/// current vectors, used both for base-resume ranking rows and for
/// applicant rows scored against the resume they actually applied with.
/// Returns `None` (driving callers back to a fallback) when either side has
/// no embedding yet.
fn compute_breakdown(
    conn: &Connection,
    vectors: &VectorStore,
    resume_id: i64,
    posting_id: i64,
) -> MatchResult<Option<ScoreBreakdown>> {
    let Some((resume_vector, _)) = vectors.get(Collection::Resumes, &resume_id.to_string())? else {
        return Ok(None);
    };
    if resume_vector.is_empty() {
        return Ok(None);
    }
    let Some((posting_vector, _)) = vectors.get(Collection::Postings, &posting_id.to_string())? else {
        return Ok(None);
    };
    if posting_vector.is_empty() {
        return Ok(None);
    }

    let resume = load_resume_seed(conn, resume_id)?;
    let posting = load_posting(conn, posting_id)?;

    let scoring_input = scoring::ScoringInput {
        candidate_vector: &resume_vector,
        posting_vector: &posting_vector,
        candidate_skills: &resume.skills,
        required_skills: &posting.required_skills,
        preferred_skills: &posting.preferred_skills,
        candidate_years: resume.years,
        min_experience: posting.min_experience,
        max_experience: posting.max_experience,
        candidate_education: &resume.education,
        required_education: posting.required_education.as_deref(),
        project_count: resume.project_count,
        certification_count: resume.certification_count,
    };
    Ok(scoring::score(&scoring_input).ok())
}

struct PostingRecord {
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
    min_experience: f64,
    max_experience: f64,
    required_education: Option<String>,
}

fn load_posting(conn: &Connection, posting_id: i64) -> MatchResult<PostingRecord> {
    conn.query_row(
        "SELECT required_skills, preferred_skills, min_experience, max_experience, required_education FROM postings WHERE id = ?1",
        params![posting_id],
        |row| {
            let required_json: String = row.get(0)?;
            let preferred_json: String = row.get(1)?;
            Ok(PostingRecord {
                required_skills: serde_json::from_str(&required_json).unwrap_or_default(),
                preferred_skills: serde_json::from_str(&preferred_json).unwrap_or_default(),
                min_experience: row.get(2)?,
                max_experience: row.get(3)?,
                required_education: row.get(4)?,
            })
        },
    )
    .map_err(|e| DatabaseError::from(e).into())
}

fn load_application(conn: &Connection, candidate_id: i64, posting_id: i64) -> MatchResult<Option<ApplicationRecord>> {
    let row: Option<(i64, i64)> = conn
        .query_row(
            "SELECT resume_id, used_tailored_resume FROM applications WHERE candidate_id = ?1 AND posting_id = ?2",
            params![candidate_id, posting_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .ok();
    Ok(row.map(|(resume_id, used_tailored)| ApplicationRecord { resume_id, used_tailored_resume: used_tailored != 0 }))
}

fn load_active_base_resume_id(conn: &Connection, candidate_id: i64) -> MatchResult<Option<i64>> {
    conn.query_row(
        "SELECT id FROM resumes WHERE candidate_id = ?1 AND kind = 'base' AND active = 1",
        params![candidate_id],
        |r| r.get(0),
    )
    .optional()
    .map_err(|e| DatabaseError::from(e).into())
}

#[derive(Debug, Clone)]
struct MatchRowLite {
    candidate_id: i64,
    composite: f64,
}

fn load_posting_matches(conn: &Connection, posting_id: i64) -> MatchResult<Vec<MatchRowLite>> {
    let mut stmt = conn
        .prepare("SELECT m.candidate_id, m.composite FROM matches m JOIN candidates c ON c.id = m.candidate_id WHERE m.posting_id = ?1 AND c.active = 1")
        .map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(params![posting_id], |row| Ok(MatchRowLite { candidate_id: row.get(0)?, composite: row.get(1)? }))
        .map_err(DatabaseError::from)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(DatabaseError::from)?);
    }
    Ok(out)
}

fn load_candidates_with_active_resume(conn: &Connection) -> MatchResult<Vec<CandidateIdentity>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT c.id, c.phone, c.linkedin, c.github FROM candidates c
             JOIN resumes r ON r.candidate_id = c.id AND r.active = 1",
        )
        .map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CandidateIdentity { id: row.get(0)?, phone: row.get(1)?, linkedin: row.get(2)?, github: row.get(3)? })
        })
        .map_err(DatabaseError::from)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(DatabaseError::from)?);
    }
    Ok(out)
}

fn load_candidate_name(conn: &Connection, candidate_id: i64) -> MatchResult<String> {
    conn.query_row("SELECT display_name FROM candidates WHERE id = ?1", params![candidate_id], |r| r.get(0))
        .map_err(|e| DatabaseError::from(e).into())
}

fn load_posting_location(_conn: &Connection, _posting_id: i64) -> MatchResult<String> {
    // Location is not a modeled posting column in this core; postings carry
    // location only inside free-text descriptions/extractions. Callers that
    // need a location filter should join the posting extraction blob.
    Ok(String::new())
}
