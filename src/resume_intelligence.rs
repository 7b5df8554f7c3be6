//! Resume Intelligence (C5): plain text -> structured resume record.
//!
//! Structured extraction runs through the LLM gateway with a regex-based
//! fallback extractor so upload never blocks on the LLM, plus an
//! overlap-merge total-experience calculation.

use crate::domain::{
    EducationEntry, ExperienceEntry, PersonalInfo, ResumeExtraction, SkillBuckets,
};
use crate::llm::{strip_code_fences, GenerationParams, LlmKeyPool};
use chrono::{Datelike, Utc};
use regex::Regex;
use std::collections::HashSet;

const PURPOSE: &str = "resume_parsing";

/// Known-technology keyword list used by the regex fallback, mirroring the
/// original's hardcoded skill-pattern vocabulary (kept short here; C6 owns
/// the larger ~60-token vocabulary used for posting skill extraction).
const FALLBACK_SKILLS: &[&str] = &[
    "python", "java", "javascript", "typescript", "rust", "go", "c++", "c#",
    "react", "react.js", "vue", "angular", "node.js", "django", "flask",
    "fastapi", "spring", "express", "docker", "kubernetes", "aws", "azure",
    "gcp", "postgresql", "mysql", "mongodb", "redis", "sql", "git", "graphql",
];

pub async fn extract(text: &str, llm: Option<&LlmKeyPool>) -> ResumeExtraction {
    if let Some(pool) = llm {
        let prompt = build_prompt(text);
        if let Ok(raw) = pool.generate(&prompt, PURPOSE, GenerationParams::default()).await {
            let cleaned = strip_code_fences(&raw);
            if let Ok(mut extraction) = serde_json::from_str::<ResumeExtraction>(&cleaned) {
                finalize(&mut extraction);
                return extraction;
            }
        }
    }
    let mut extraction = fallback_structure(text);
    finalize(&mut extraction);
    extraction
}

fn build_prompt(text: &str) -> String {
    format!(
        "Extract structured resume data as JSON with fields: personal_info \
         {{name, email, phone, location}}, skills {{technical[], soft[]}}, \
         all_skills[], experience[] {{company, role, start_date (YYYY-MM), \
         end_date (YYYY-MM or Present), description, achievements[]}}, \
         education[] {{degree, field, institution, year, grade}}, \
         projects[] {{name, description, technologies[]}}, certifications[] \
         {{name, issuer, date}}, summary. Resume text:\n\n{}",
        text
    )
}

/// Deterministic fallback when the LLM is unavailable or its output doesn't
/// parse: pulls an email, a phone number, and a keyword skill set via regex,
/// leaving every other field empty. Always succeeds.
fn fallback_structure(text: &str) -> ResumeExtraction {
    let email_re = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
    let phone_re = Regex::new(r"(\+?\d[\d\-\s\(\)]{8,}\d)").unwrap();

    let email = email_re.find(text).map(|m| m.as_str().to_string());
    let phone = phone_re.find(text).map(|m| m.as_str().trim().to_string());

    let lower = text.to_lowercase();
    let mut technical = Vec::new();
    for skill in FALLBACK_SKILLS {
        if lower.contains(skill) {
            technical.push(skill.to_string());
        }
    }

    ResumeExtraction {
        personal_info: PersonalInfo { name: String::new(), email, phone, location: None },
        skills: SkillBuckets { technical: technical.clone(), soft: Vec::new() },
        all_skills: technical,
        experience: Vec::new(),
        education: Vec::new(),
        projects: Vec::new(),
        certifications: Vec::new(),
        total_experience_months: 0,
        total_experience_years: 0.0,
        summary: String::new(),
    }
}

/// Post-process an extraction regardless of its source: recompute derived
/// totals from `experience` and dedupe `all_skills`.
fn finalize(extraction: &mut ResumeExtraction) {
    extraction.total_experience_months = total_experience_months(&extraction.experience);
    extraction.total_experience_years = (extraction.total_experience_months as f64 / 12.0 * 10.0).round() / 10.0;
    extraction.all_skills = dedupe_case_insensitive(&extraction.all_skills);
}

/// Merge overlapping `[start, end)` month ranges and sum the merged lengths,
/// matching `_calculate_total_experience`'s date-range merge exactly.
/// "Present" becomes the current year-month. Unparseable spans are skipped.
pub fn total_experience_months(experience: &[ExperienceEntry]) -> i64 {
    let mut spans: Vec<(i64, i64)> = experience
        .iter()
        .filter_map(|e| parse_span(&e.start_date, &e.end_date))
        .collect();
    if spans.is_empty() {
        return 0;
    }
    spans.sort_by_key(|s| s.0);

    let mut total = 0i64;
    let mut cur_start = spans[0].0;
    let mut cur_end = spans[0].1;
    for &(start, end) in &spans[1..] {
        if start <= cur_end {
            cur_end = cur_end.max(end);
        } else {
            total += cur_end - cur_start;
            cur_start = start;
            cur_end = end;
        }
    }
    total += cur_end - cur_start;
    total
}

fn parse_span(start: &str, end: &str) -> Option<(i64, i64)> {
    let start_months = parse_year_month(start)?;
    let end_months = if end.trim().eq_ignore_ascii_case("present") {
        let now = Utc::now();
        (now.year() as i64) * 12 + now.month() as i64
    } else {
        parse_year_month(end)?
    };
    if end_months < start_months {
        return None;
    }
    Some((start_months, end_months))
}

fn parse_year_month(s: &str) -> Option<i64> {
    let s = s.trim();
    let (year_str, month_str) = s.split_once('-')?;
    let year: i64 = year_str.parse().ok()?;
    let month: i64 = month_str.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(year * 12 + month)
}

/// Case-insensitive uniqueness, first-seen casing preserved.
pub fn dedupe_case_insensitive(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let key = item.to_lowercase();
        if seen.insert(key) {
            out.push(item.clone());
        }
    }
    out
}
