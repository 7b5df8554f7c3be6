//! Posting Intelligence (C6): structured posting extraction and the
//! opt-in skill-suggestion endpoint.
//!
//! Falls back to a section-detecting keyword extractor with an
//! alias-based skill vocabulary when the LLM path is unavailable.

use crate::domain::PostingExtraction;
use crate::llm::{strip_code_fences, GenerationParams, LlmKeyPool};
use std::collections::HashSet;

const PURPOSE: &str = "posting_analysis";
const SKILL_EXTRACTION_PURPOSE: &str = "skill_extraction";

/// ~60-token vocabulary of languages, frameworks, databases, cloud/DevOps
/// tools, and testing libraries, mirroring the original's `skill_patterns`.
const SKILL_VOCABULARY: &[&str] = &[
    "python", "java", "javascript", "typescript", "rust", "go", "golang", "c++",
    "c#", "ruby", "php", "kotlin", "swift", "scala",
    "react", "react.js", "vue", "vue.js", "angular", "svelte", "next.js",
    "node.js", "nodejs", "django", "flask", "fastapi", "spring", "spring boot",
    "express", "express.js", "rails",
    "postgresql", "postgres", "mysql", "mongodb", "redis", "sqlite", "sql",
    "cassandra", "dynamodb",
    "docker", "kubernetes", "aws", "azure", "gcp", "terraform", "ansible",
    "jenkins", "github actions", "gitlab ci", "ci/cd",
    "git", "graphql", "rest", "grpc", "kafka", "rabbitmq",
    "jest", "pytest", "junit", "selenium", "cypress",
    "linux", "bash", "html", "css", "tailwind",
];

/// Canonical casing overrides for a handful of common skills, mirroring the
/// original's small alias table.
const ALIASES: &[(&str, &str)] = &[
    ("react.js", "React"),
    ("react", "React"),
    ("nodejs", "Node.js"),
    ("node.js", "Node.js"),
    ("vue.js", "Vue.js"),
    ("vue", "Vue.js"),
    ("golang", "Go"),
    ("postgres", "PostgreSQL"),
    ("postgresql", "PostgreSQL"),
];

fn canonical_case(skill: &str) -> String {
    let lower = skill.to_lowercase();
    for (alias, canonical) in ALIASES {
        if lower == *alias {
            return canonical.to_string();
        }
    }
    skill.to_string()
}

/// Extract title/description/duration/stipend/location/experience band/
/// education from free text via C2, with no skill auto-extraction (skills
/// stay empty until the company confirms them through the form).
pub async fn extract_from_document(text: &str, llm: Option<&LlmKeyPool>) -> PostingExtraction {
    if let Some(pool) = llm {
        let prompt = format!(
            "Extract posting fields as JSON: title, description, duration, \
             stipend, location, min_experience, max_experience, \
             required_education. Do not extract skills. Posting text:\n\n{}",
            text
        );
        if let Ok(raw) = pool.generate(&prompt, PURPOSE, GenerationParams::default()).await {
            let cleaned = strip_code_fences(&raw);
            if let Ok(extraction) = serde_json::from_str::<PostingExtraction>(&cleaned) {
                return extraction;
            }
        }
    }
    PostingExtraction::default()
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SuggestedSkills {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
}

/// Opt-in skill suggestion: ask C2 for `{required_skills, preferred_skills}`;
/// on failure or an empty result, fall back to the deterministic keyword
/// matcher with its section detector.
pub async fn suggest_skills(description: &str, llm: Option<&LlmKeyPool>) -> SuggestedSkills {
    if let Some(pool) = llm {
        let prompt = format!(
            "From this internship description, return JSON \
             {{\"required_skills\": [...], \"preferred_skills\": [...]}} \
             of concrete technical skills. Description:\n\n{}",
            description
        );
        if let Ok(raw) = pool.generate(&prompt, SKILL_EXTRACTION_PURPOSE, GenerationParams::default()).await {
            let cleaned = strip_code_fences(&raw);
            if let Ok(parsed) = serde_json::from_str::<SuggestedSkills>(&cleaned) {
                if !parsed.required_skills.is_empty() || !parsed.preferred_skills.is_empty() {
                    return normalize(parsed);
                }
            }
        }
    }
    normalize(fallback_keyword_extraction(description))
}

/// Deterministic keyword matcher with a sliding section detector: lines
/// containing `required|must have|mandatory|essential|qualifications` flip
/// mode to required, lines with `preferred|nice to have|plus|bonus|desirable`
/// flip to preferred. If neither section is ever seen, everything required.
fn fallback_keyword_extraction(description: &str) -> SuggestedSkills {
    #[derive(PartialEq, Clone, Copy)]
    enum Mode {
        Required,
        Preferred,
    }

    let required_markers = ["required", "must have", "mandatory", "essential", "qualifications"];
    let preferred_markers = ["preferred", "nice to have", "plus", "bonus", "desirable"];

    let mut mode = Mode::Required;
    let mut saw_section = false;
    let mut required = Vec::new();
    let mut preferred = Vec::new();

    for line in description.lines() {
        let lower_line = line.to_lowercase();
        if required_markers.iter().any(|m| lower_line.contains(m)) {
            mode = Mode::Required;
            saw_section = true;
        } else if preferred_markers.iter().any(|m| lower_line.contains(m)) {
            mode = Mode::Preferred;
            saw_section = true;
        }

        for skill in SKILL_VOCABULARY {
            if lower_line.contains(skill) {
                let canonical = canonical_case(skill);
                match mode {
                    Mode::Required => required.push(canonical),
                    Mode::Preferred => preferred.push(canonical),
                }
            }
        }
    }

    if !saw_section {
        required.extend(preferred.drain(..));
    }

    SuggestedSkills { required_skills: required, preferred_skills: preferred }
}

/// Lowercase-dedupe both arrays; a skill present in both stays only in
/// required.
fn normalize(skills: SuggestedSkills) -> SuggestedSkills {
    let mut seen_required: HashSet<String> = HashSet::new();
    let mut required = Vec::new();
    for skill in skills.required_skills {
        let key = skill.to_lowercase();
        if seen_required.insert(key) {
            required.push(canonical_case(&skill));
        }
    }

    let required_keys: HashSet<String> = required.iter().map(|s| s.to_lowercase()).collect();
    let mut seen_preferred: HashSet<String> = HashSet::new();
    let mut preferred = Vec::new();
    for skill in skills.preferred_skills {
        let key = skill.to_lowercase();
        if required_keys.contains(&key) || !seen_preferred.insert(key) {
            continue;
        }
        preferred.push(canonical_case(&skill));
    }

    SuggestedSkills { required_skills: required, preferred_skills: preferred }
}
