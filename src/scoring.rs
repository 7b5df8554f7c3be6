//! Scoring Engine (C7): candidate × posting × embeddings -> weighted
//! composite score with component breakdown.
//!
//! Weights and component formulas are grounded directly in
//! `matching_engine.py`'s `weights` dict and `_calculate_*` methods; this is
//! the most load-bearing piece of grounding in the whole crate.

use crate::domain::EducationEntry;
use crate::error::{MatchError, MatchResult};
use crate::vector_store::cosine_distance;

pub const WEIGHT_SEMANTIC: f64 = 0.10;
pub const WEIGHT_SKILLS: f64 = 0.45;
pub const WEIGHT_EXPERIENCE: f64 = 0.25;
pub const WEIGHT_EDUCATION: f64 = 0.10;
pub const WEIGHT_PROJECTS_CERTS: f64 = 0.10;

#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub composite: f64,
    pub semantic: f64,
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub projects_certs: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_gap: f64,
}

pub struct ScoringInput<'a> {
    pub candidate_vector: &'a [f32],
    pub posting_vector: &'a [f32],
    pub candidate_skills: &'a [String],
    pub required_skills: &'a [String],
    pub preferred_skills: &'a [String],
    pub candidate_years: f64,
    pub min_experience: f64,
    pub max_experience: f64,
    pub candidate_education: &'a [EducationEntry],
    pub required_education: Option<&'a str>,
    pub project_count: usize,
    pub certification_count: usize,
}

/// Compute the weighted composite score and its breakdown. Fails with
/// `EmbeddingMissing` rather than substituting a default if either vector is
/// empty or all-zero — never silently fall back here.
pub fn score(input: &ScoringInput) -> MatchResult<ScoreBreakdown> {
    let semantic = semantic_match(input.candidate_vector, input.posting_vector)?;
    let (skills, matched_skills, missing_skills) =
        skills_match(input.candidate_skills, input.required_skills, input.preferred_skills);
    let (experience, experience_gap) = experience_match(input.candidate_years, input.min_experience, input.max_experience);
    let education = education_match(input.candidate_education, input.required_education);
    let projects_certs = projects_certs_match(input.project_count, input.certification_count);

    let composite = WEIGHT_SEMANTIC * semantic
        + WEIGHT_SKILLS * skills
        + WEIGHT_EXPERIENCE * experience
        + WEIGHT_EDUCATION * education
        + WEIGHT_PROJECTS_CERTS * projects_certs;

    Ok(ScoreBreakdown {
        composite: round2(composite),
        semantic: round2(semantic),
        skills: round2(skills),
        experience: round2(experience),
        education: round2(education),
        projects_certs: round2(projects_certs),
        matched_skills,
        missing_skills,
        experience_gap,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * cosine_similarity`. Both vectors must be non-empty and non-zero.
fn semantic_match(candidate: &[f32], posting: &[f32]) -> MatchResult<f64> {
    if candidate.is_empty() || is_zero_vector(candidate) {
        return Err(MatchError::EmbeddingMissing("candidate vector missing or zero".to_string()));
    }
    if posting.is_empty() || is_zero_vector(posting) {
        return Err(MatchError::EmbeddingMissing("posting vector missing or zero".to_string()));
    }
    let distance = cosine_distance(candidate, posting);
    let similarity = 1.0 - distance;
    Ok(similarity * 100.0)
}

fn is_zero_vector(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

/// Substring matching: a candidate skill matches a job skill iff one is a
/// substring of the other. This intentionally produces false positives
/// (e.g. "Java" matches "JavaScript") — preserved as-is per the matching
/// engine this is grounded on, not tokenized equality.
fn skills_match(
    candidate_skills: &[String],
    required: &[String],
    preferred: &[String],
) -> (f64, Vec<String>, Vec<String>) {
    let candidate_norm: Vec<String> = candidate_skills.iter().map(|s| normalize_skill(s)).collect();

    let matches = |job_skill: &str| -> bool {
        let job_norm = normalize_skill(job_skill);
        candidate_norm.iter().any(|c| c.contains(&job_norm) || job_norm.contains(c.as_str()))
    };

    let matched_required: Vec<&String> = required.iter().filter(|s| matches(s)).collect();
    let matched_preferred: Vec<&String> = preferred.iter().filter(|s| matches(s)).collect();

    let required_contribution = if required.is_empty() {
        100.0
    } else {
        70.0 * (matched_required.len() as f64 / required.len() as f64)
    };
    let preferred_contribution = if preferred.is_empty() {
        30.0
    } else {
        30.0 * (matched_preferred.len() as f64 / preferred.len() as f64)
    };

    let total = (required_contribution + preferred_contribution).min(100.0);

    let mut matched: Vec<String> = matched_required.into_iter().cloned().collect();
    for skill in matched_preferred {
        if !matched.iter().any(|m| m.eq_ignore_ascii_case(skill)) {
            matched.push(skill.clone());
        }
    }

    let missing: Vec<String> = required
        .iter()
        .filter(|s| !matches(s))
        .cloned()
        .collect();

    (total, matched, missing)
}

fn normalize_skill(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Experience band scoring with exact, inclusive band edges.
fn experience_match(years: f64, lo: f64, hi: f64) -> (f64, f64) {
    let gap = years - lo;
    let score = if years >= lo && years <= hi {
        100.0
    } else if years < lo {
        let g = lo - years;
        if g <= 0.5 {
            90.0
        } else if g <= 1.0 {
            70.0
        } else if g <= 2.0 {
            50.0
        } else {
            30.0
        }
    } else {
        85.0
    };
    (score, gap)
}

const EDUCATION_LEVELS: &[(&str, i32)] = &[
    ("phd", 5),
    ("doctorate", 5),
    ("master", 4),
    ("mba", 4),
    ("bachelor", 3),
    ("diploma", 2),
    ("certificate", 1),
];

pub fn education_level(degree: &str) -> Option<i32> {
    let lower = degree.to_lowercase();
    EDUCATION_LEVELS.iter().find(|(key, _)| lower.contains(key)).map(|(_, level)| *level)
}

fn education_match(candidate_education: &[EducationEntry], required: Option<&str>) -> f64 {
    let required = match required {
        None => return 100.0,
        Some(r) if r.trim().is_empty() => return 100.0,
        Some(r) => r,
    };
    let required_level = match education_level(required) {
        Some(l) => l,
        None => return 100.0,
    };

    let candidate_level = candidate_education
        .iter()
        .filter_map(|e| education_level(&e.degree))
        .max();

    match candidate_level {
        None => 70.0,
        Some(level) if level >= required_level => 100.0,
        Some(level) if level == required_level - 1 => 80.0,
        Some(_) => 50.0,
    }
}

fn projects_certs_match(project_count: usize, cert_count: usize) -> f64 {
    let projects_score = 12.0 * project_count.min(5) as f64;
    let certs_score = 10.0 * cert_count.min(4) as f64;
    (projects_score + certs_score).min(100.0)
}

/// Deterministic fallback explanation when the LLM explanation call fails.
pub fn fallback_explanation(breakdown: &ScoreBreakdown) -> String {
    let tier = if breakdown.composite >= 80.0 {
        "Strong"
    } else if breakdown.composite >= 60.0 {
        "Moderate"
    } else {
        "Weak"
    };
    let matched: Vec<&str> = breakdown.matched_skills.iter().take(3).map(|s| s.as_str()).collect();
    let missing: Vec<&str> = breakdown.missing_skills.iter().take(3).map(|s| s.as_str()).collect();
    format!(
        "{} match ({:.0}/100). {} matched skills ({}), {} missing ({}).",
        tier,
        breakdown.composite,
        breakdown.matched_skills.len(),
        matched.join(", "),
        breakdown.missing_skills.len(),
        missing.join(", "),
    )
}
