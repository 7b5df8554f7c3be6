//! Duplicate Detector (C11): flags candidates sharing a normalized phone,
//! LinkedIn, or GitHub handle, limited to candidates with an active resume.
//!
//! Pure: never mutates candidate records, only reports.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct CandidateIdentity {
    pub id: i64,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FlagInfo {
    pub flag_reasons: Vec<&'static str>,
    pub flagged_with: HashMap<&'static str, Vec<i64>>,
}

impl FlagInfo {
    pub fn is_flagged(&self) -> bool {
        !self.flag_reasons.is_empty()
    }

    /// Human-readable summary, e.g. "Shares phone number with candidate(s) 4, 9".
    pub fn reason_text(&self) -> String {
        let mut parts = Vec::new();
        for reason in &self.flag_reasons {
            let label = match *reason {
                "same_mobile" => "phone number",
                "same_linkedin" => "LinkedIn profile",
                "same_github" => "GitHub profile",
                other => other,
            };
            if let Some(others) = self.flagged_with.get(reason) {
                let ids: Vec<String> = others.iter().map(|id| id.to_string()).collect();
                parts.push(format!("shares {} with candidate(s) {}", label, ids.join(", ")));
            }
        }
        parts.join("; ")
    }
}

pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Lowercase, strip a leading `http(s)://`, a leading `www.`, and any
/// trailing `/`.
pub fn normalize_url(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut lower = trimmed.to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            lower = rest.to_string();
            break;
        }
    }
    if let Some(rest) = lower.strip_prefix("www.") {
        lower = rest.to_string();
    }
    while lower.ends_with('/') {
        lower.pop();
    }
    if lower.is_empty() {
        None
    } else {
        Some(lower)
    }
}

/// Detect flags across candidates who have an active resume (others are
/// ignored to suppress noise from incomplete profiles). Returns a map from
/// candidate id to its `FlagInfo`; candidates with no collision are absent.
pub fn detect_flagged_candidates(candidates_with_active_resume: &[CandidateIdentity]) -> HashMap<i64, FlagInfo> {
    let mut phone_map: HashMap<String, Vec<i64>> = HashMap::new();
    let mut linkedin_map: HashMap<String, Vec<i64>> = HashMap::new();
    let mut github_map: HashMap<String, Vec<i64>> = HashMap::new();

    for candidate in candidates_with_active_resume {
        if let Some(phone) = candidate.phone.as_deref().and_then(normalize_phone) {
            phone_map.entry(phone).or_default().push(candidate.id);
        }
        if let Some(linkedin) = candidate.linkedin.as_deref().and_then(normalize_url) {
            linkedin_map.entry(linkedin).or_default().push(candidate.id);
        }
        if let Some(github) = candidate.github.as_deref().and_then(normalize_url) {
            github_map.entry(github).or_default().push(candidate.id);
        }
    }

    let mut flags: HashMap<i64, FlagInfo> = HashMap::new();
    apply_dimension(&phone_map, "same_mobile", &mut flags);
    apply_dimension(&linkedin_map, "same_linkedin", &mut flags);
    apply_dimension(&github_map, "same_github", &mut flags);
    flags
}

fn apply_dimension(map: &HashMap<String, Vec<i64>>, dimension: &'static str, flags: &mut HashMap<i64, FlagInfo>) {
    for ids in map.values() {
        if ids.len() < 2 {
            continue;
        }
        let id_set: HashSet<i64> = ids.iter().copied().collect();
        for &id in ids {
            let others: Vec<i64> = id_set.iter().copied().filter(|&other| other != id).collect();
            let entry = flags.entry(id).or_default();
            entry.flag_reasons.push(dimension);
            entry.flagged_with.insert(dimension, others);
        }
    }
}
