//! End-to-end coverage over the public API: upload -> extract -> embed ->
//! score -> materialize -> rank, plus the seeded scenarios and invariants
//! from the matching engine's data model.

use chrono::Utc;
use rusqlite::{params, Connection};
use skillmatch_core::application_scorer::{self, SubmitApplicationInput};
use skillmatch_core::db::{init_database, open_in_memory};
use skillmatch_core::document_parser;
use skillmatch_core::domain::{EducationEntry, MatchRow};
use skillmatch_core::duplicate_detector::{self, CandidateIdentity};
use skillmatch_core::embedding::{DeterministicEmbeddingProvider, EmbeddingGateway};
use skillmatch_core::export;
use skillmatch_core::match_store::{self, Page, Sort};
use skillmatch_core::posting_intelligence;
use skillmatch_core::ranking::{self, PostingRankingFilters, RecommendationFilters};
use skillmatch_core::resume_intelligence;
use skillmatch_core::scoring::{self, ScoringInput};
use skillmatch_core::vector_store::{Collection, VectorStore};

const DIM: usize = 32;

fn setup() -> Connection {
    let conn = open_in_memory().unwrap();
    init_database(&conn).unwrap();
    conn
}

fn seed_company(conn: &Connection, id: i64, name: &str) {
    conn.execute("INSERT INTO companies (id, name) VALUES (?1, ?2)", params![id, name]).unwrap();
}

fn seed_candidate(conn: &Connection, id: i64, name: &str, email: &str) {
    conn.execute(
        "INSERT INTO candidates (id, display_name, email, active) VALUES (?1, ?2, ?3, 1)",
        params![id, name, email],
    )
    .unwrap();
}

#[allow(clippy::too_many_arguments)]
fn seed_posting(
    conn: &Connection,
    id: i64,
    company_id: i64,
    title: &str,
    required: &[&str],
    preferred: &[&str],
    min_exp: f64,
    max_exp: f64,
) {
    let required_json = serde_json::to_string(&required).unwrap();
    let preferred_json = serde_json::to_string(&preferred).unwrap();
    conn.execute(
        "INSERT INTO postings (id, company_id, title, description, required_skills, preferred_skills, min_experience, max_experience, content_hash, active)
         VALUES (?1, ?2, ?3, 'internship posting', ?4, ?5, ?6, ?7, ?8, 1)",
        params![id, company_id, title, required_json, preferred_json, min_exp, max_exp, format!("hash-{}", id)],
    )
    .unwrap();
}

#[allow(clippy::too_many_arguments)]
fn seed_base_resume(
    conn: &Connection,
    id: i64,
    candidate_id: i64,
    skills: &[&str],
    years: f64,
    active: bool,
) -> i64 {
    let skills_json = serde_json::to_string(&skills).unwrap();
    let parsed_data = serde_json::json!({
        "total_experience_years": years,
        "total_experience_months": (years * 12.0) as i64,
    })
    .to_string();
    conn.execute(
        "INSERT INTO resumes (id, candidate_id, file_name, parsed_text, parsed_data, extracted_skills, content_hash, kind, active)
         VALUES (?1, ?2, 'resume.txt', 'resume text', ?3, ?4, ?5, 'base', ?6)",
        params![id, candidate_id, parsed_data, skills_json, format!("hash-r{}", id), active as i64],
    )
    .unwrap();
    conn.execute(
        "UPDATE candidates SET skills = ?1, total_experience_years = ?2 WHERE id = ?3",
        params![skills_json, years, candidate_id],
    )
    .unwrap();
    id
}

fn gateway() -> EmbeddingGateway {
    EmbeddingGateway::new(Box::new(DeterministicEmbeddingProvider::new(DIM)))
}

fn score_for(
    candidate_vector: &[f32],
    posting_vector: &[f32],
    candidate_skills: &[String],
    required: &[String],
    preferred: &[String],
    years: f64,
    min_exp: f64,
    max_exp: f64,
) -> scoring::ScoreBreakdown {
    let input = ScoringInput {
        candidate_vector,
        posting_vector,
        candidate_skills,
        required_skills: required,
        preferred_skills: preferred,
        candidate_years: years,
        min_experience: min_exp,
        max_experience: max_exp,
        candidate_education: &[],
        required_education: None,
        project_count: 0,
        certification_count: 0,
    };
    scoring::score(&input).unwrap()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------
// Full pipeline: document -> extraction -> embedding -> score -> rank
// ---------------------------------------------------------------------

#[tokio::test]
async fn full_pipeline_upload_extract_score_rank() {
    let conn = setup();
    let vectors = VectorStore::new(DIM);
    let gw = gateway();

    seed_company(&conn, 1, "Acme");
    seed_candidate(&conn, 1, "Jane Doe", "jane@example.com");
    seed_posting(&conn, 1, 1, "Backend Intern", &["Python", "FastAPI"], &["Docker"], 1.0, 3.0);

    let resume_bytes = b"Jane Doe\njane@example.com\nSkilled in Python, FastAPI, and Docker.\n2 years of backend experience.";
    let resume_text = document_parser::extract_text("resume.txt", resume_bytes).unwrap();
    let extraction = resume_intelligence::extract(&resume_text, None).await;
    assert!(extraction.all_skills.iter().any(|s| s.eq_ignore_ascii_case("python")));

    let posting_text = "Backend Intern. Required: Python, FastAPI. Preferred: Docker.";
    let posting_suggestion = posting_intelligence::suggest_skills(posting_text, None).await;
    assert!(!posting_suggestion.required_skills.is_empty());

    let candidate_vector = gw.embed(&format!("{} {}", resume_text, extraction.all_skills.join(" "))).await.unwrap();
    let posting_vector = gw.embed(posting_text).await.unwrap();
    vectors.upsert(Collection::Resumes, "1", candidate_vector.clone()).unwrap();
    vectors.upsert(Collection::Postings, "1", posting_vector.clone()).unwrap();

    seed_base_resume(&conn, 1, 1, &["python", "fastapi", "docker"], 2.0, true);

    let breakdown = score_for(
        &candidate_vector,
        &posting_vector,
        &strings(&["python", "fastapi", "docker"]),
        &strings(&["Python", "FastAPI"]),
        &strings(&["Docker"]),
        2.0,
        1.0,
        3.0,
    );
    assert!(breakdown.composite > 0.0 && breakdown.composite <= 100.0);

    let row = MatchRow {
        candidate_id: 1,
        posting_id: 1,
        resume_id: 1,
        composite: breakdown.composite,
        semantic: breakdown.semantic,
        skills: breakdown.skills,
        experience: breakdown.experience,
        last_computed: Utc::now(),
    };
    match_store::upsert_many(&conn, &[row]).unwrap();

    let ranked = ranking::rank_candidates_for_posting(
        &conn,
        &vectors,
        1,
        &PostingRankingFilters::default(),
        Sort::default(),
        Page::default(),
    )
    .unwrap();
    assert_eq!(ranked.items.len(), 1);
    assert_eq!(ranked.items[0].candidate_id, 1);

    let recommended = ranking::recommend_for_candidate(
        &conn,
        1,
        &RecommendationFilters::default(),
        Sort::default(),
        Page::default(),
    )
    .unwrap();
    assert_eq!(recommended.items.len(), 1);
    assert_eq!(recommended.items[0].posting_id, 1);

    // export the ranked slate to CSV
    let export_row = export::build_export_row(
        &ranked.items[0],
        "jane@example.com".to_string(),
        "9998887777".to_string(),
        2.0,
        "Bachelor".to_string(),
        "2026-01-01".to_string(),
        "pending".to_string(),
    );
    let csv = export::to_csv(&[export_row]).unwrap();
    assert!(csv.contains("Jane Doe"));
}

// ---------------------------------------------------------------------
// The six seeded scenarios
// ---------------------------------------------------------------------

#[test]
fn scenario_exact_fit_scores_high_with_no_missing_skills() {
    let v = vec![1.0_f32, 0.0, 0.0];
    let breakdown = score_for(
        &v,
        &v,
        &strings(&["Python", "FastAPI", "Docker"]),
        &strings(&["Python", "FastAPI"]),
        &[],
        2.0,
        1.0,
        3.0,
    );
    assert!(breakdown.composite >= 90.0, "composite={}", breakdown.composite);
    assert!(breakdown.missing_skills.is_empty());
}

#[test]
fn scenario_underqualified_by_1_2_years_applies_the_gap_tier() {
    let v = vec![1.0_f32, 0.0];
    let breakdown = score_for(
        &v,
        &v,
        &strings(&["Python", "FastAPI"]),
        &strings(&["Python", "FastAPI"]),
        &[],
        1.8,
        3.0,
        5.0,
    );
    // gap = 1.2, falls in the (1.0, 2.0] tier -> 50
    assert_eq!(breakdown.experience, 50.0);
    assert!((breakdown.experience_gap - (-1.2)).abs() < 1e-9);
}

#[test]
fn scenario_overqualified_still_scores_well_but_not_perfect() {
    let v = vec![1.0_f32, 0.0];
    let breakdown = score_for(
        &v,
        &v,
        &strings(&["Python", "FastAPI"]),
        &strings(&["Python", "FastAPI"]),
        &[],
        12.0,
        1.0,
        3.0,
    );
    assert_eq!(breakdown.experience, 85.0);
}

#[test]
fn scenario_skills_substring_superset_matches_every_required_skill() {
    let v = vec![1.0_f32, 0.0];
    let breakdown = score_for(
        &v,
        &v,
        &strings(&["Node.js", "React", "PostgreSQL", "Docker", "AWS"]),
        &strings(&["Node", "React", "Postgres"]),
        &[],
        3.0,
        1.0,
        5.0,
    );
    assert!(breakdown.missing_skills.is_empty());
    assert_eq!(breakdown.skills, 100.0);
}

#[tokio::test]
async fn scenario_tailored_resume_blends_with_baseline() {
    let conn = setup();
    let vectors = VectorStore::new(DIM);
    let gw = gateway();

    seed_company(&conn, 1, "Acme");
    seed_candidate(&conn, 1, "Jane Doe", "jane@example.com");
    seed_posting(&conn, 1, 1, "Backend Intern", &["Python", "FastAPI"], &[], 1.0, 3.0);
    seed_base_resume(&conn, 1, 1, &["python", "fastapi"], 2.0, true);

    let base_vector = gw.embed("Python FastAPI generalist resume").await.unwrap();
    let posting_vector = gw.embed("Backend Intern. Required: Python, FastAPI.").await.unwrap();
    vectors.upsert(Collection::Resumes, "1", base_vector).unwrap();
    vectors.upsert(Collection::Postings, "1", posting_vector).unwrap();

    let baseline = score_for(
        &vectors.get(Collection::Resumes, "1").unwrap().unwrap(),
        &vectors.get(Collection::Postings, "1").unwrap().unwrap(),
        &strings(&["python", "fastapi"]),
        &strings(&["Python", "FastAPI"]),
        &[],
        2.0,
        1.0,
        3.0,
    );
    let row = MatchRow {
        candidate_id: 1,
        posting_id: 1,
        resume_id: 1,
        composite: baseline.composite,
        semantic: baseline.semantic,
        skills: baseline.skills,
        experience: baseline.experience,
        last_computed: Utc::now(),
    };
    match_store::upsert_many(&conn, &[row]).unwrap();

    let tailored_bytes = b"Jane Doe tailored for Backend Intern. Python, FastAPI, Docker, Kubernetes expert.";
    let outcome = application_scorer::submit_application(
        &conn,
        &vectors,
        &gw,
        None,
        SubmitApplicationInput {
            candidate_id: 1,
            posting_id: 1,
            tailored_resume_bytes: Some(tailored_bytes),
            tailored_resume_file_name: Some("tailored.txt"),
            use_tailored: true,
        },
    )
    .await
    .unwrap();

    assert!(outcome.used_tailored_resume);
    assert_eq!(outcome.application.application_similarity_score, outcome.application.application_similarity_score.clamp(0, 100));

    let ranking_blend = application_scorer::ranking_score(
        true,
        Some(outcome.application.application_similarity_score as f64),
        Some(baseline.composite),
    );
    assert!(ranking_blend.is_some());
}

#[test]
fn scenario_duplicate_phone_flags_the_pair_and_not_the_unrelated_candidate() {
    let candidates = vec![
        CandidateIdentity { id: 1, phone: Some("999-888-7777".to_string()), linkedin: None, github: None },
        CandidateIdentity { id: 2, phone: Some("(999) 888 7777".to_string()), linkedin: None, github: None },
        CandidateIdentity { id: 3, phone: Some("555-111-2222".to_string()), linkedin: None, github: None },
    ];
    let flags = duplicate_detector::detect_flagged_candidates(&candidates);
    assert!(flags[&1].is_flagged());
    assert!(flags[&2].is_flagged());
    assert!(!flags.contains_key(&3));
}

// ---------------------------------------------------------------------
// Quantified invariants
// ---------------------------------------------------------------------

#[test]
fn invariant_scores_are_bounded_zero_to_one_hundred() {
    let v = vec![1.0_f32, 0.3, -0.2];
    let breakdown = score_for(
        &v,
        &vec![0.2_f32, 1.0, 0.1],
        &strings(&["Python"]),
        &strings(&["Rust", "Go", "C++"]),
        &strings(&["Kubernetes"]),
        0.1,
        5.0,
        8.0,
    );
    for value in [breakdown.composite, breakdown.semantic, breakdown.skills, breakdown.experience, breakdown.education, breakdown.projects_certs] {
        assert!((0.0..=100.0).contains(&value), "value {} out of bounds", value);
    }
}

#[test]
fn invariant_match_row_composite_stays_bounded_through_a_persistence_round_trip() {
    let conn = setup();
    seed_company(&conn, 1, "Acme");
    seed_candidate(&conn, 1, "Jane", "jane@example.com");
    seed_posting(&conn, 1, 1, "Intern", &["Python"], &[], 0.0, 5.0);
    seed_base_resume(&conn, 1, 1, &["python"], 1.0, true);

    let v = vec![1.0_f32, 0.0];
    let breakdown = score_for(&v, &v, &strings(&["python"]), &strings(&["Python"]), &[], 1.0, 0.0, 5.0);
    let row = MatchRow {
        candidate_id: 1,
        posting_id: 1,
        resume_id: 1,
        composite: breakdown.composite,
        semantic: breakdown.semantic,
        skills: breakdown.skills,
        experience: breakdown.experience,
        last_computed: Utc::now(),
    };
    match_store::upsert_many(&conn, &[row]).unwrap();
    let fetched = match_store::get_one(&conn, 1, 1).unwrap().unwrap();
    assert_eq!(fetched.composite, breakdown.composite);
    assert!((0.0..=100.0).contains(&fetched.composite));
}

#[test]
fn invariant_vector_store_collection_size_matches_upsert_count() {
    let store = VectorStore::new(4);
    for i in 0..5 {
        store.upsert(Collection::Resumes, &i.to_string(), vec![1.0, 0.0, 0.0, 0.0]).unwrap();
    }
    assert_eq!(store.count(Collection::Resumes).unwrap(), 5);
    store.delete(Collection::Resumes, "0").unwrap();
    assert_eq!(store.count(Collection::Resumes).unwrap(), 4);
    assert_eq!(store.count(Collection::Postings).unwrap(), 0);
}

#[test]
fn invariant_content_hash_is_stable_for_identical_bytes() {
    use sha2::{Digest, Sha256};
    let bytes = b"identical resume content";
    let hash_of = |b: &[u8]| {
        let mut hasher = Sha256::new();
        hasher.update(b);
        format!("{:x}", hasher.finalize())
    };
    assert_eq!(hash_of(bytes), hash_of(bytes));
    assert_ne!(hash_of(bytes), hash_of(b"different content"));
}

#[test]
fn invariant_flag_co_membership_is_symmetric() {
    let candidates = vec![
        CandidateIdentity { id: 10, phone: None, linkedin: Some("linkedin.com/in/alex".to_string()), github: None },
        CandidateIdentity { id: 11, phone: None, linkedin: Some("https://www.linkedin.com/in/alex/".to_string()), github: None },
    ];
    let flags = duplicate_detector::detect_flagged_candidates(&candidates);
    assert!(flags[&10].flagged_with["same_linkedin"].contains(&11));
    assert!(flags[&11].flagged_with["same_linkedin"].contains(&10));
}

#[test]
fn invariant_missing_embedding_never_silently_defaults() {
    let result = scoring::score(&ScoringInput {
        candidate_vector: &[],
        posting_vector: &[1.0, 0.0],
        candidate_skills: &[],
        required_skills: &[],
        preferred_skills: &[],
        candidate_years: 1.0,
        min_experience: 0.0,
        max_experience: 5.0,
        candidate_education: &[],
        required_education: None,
        project_count: 0,
        certification_count: 0,
    });
    assert!(result.is_err());
}

// ---------------------------------------------------------------------
// Laws
// ---------------------------------------------------------------------

#[test]
fn law_recompute_is_idempotent_for_an_unchanged_match_row() {
    let conn = setup();
    seed_company(&conn, 1, "Acme");
    seed_candidate(&conn, 1, "Jane", "jane@example.com");
    seed_posting(&conn, 1, 1, "Intern", &["Python"], &[], 0.0, 5.0);
    seed_base_resume(&conn, 1, 1, &["python"], 1.0, true);

    let row = MatchRow {
        candidate_id: 1,
        posting_id: 1,
        resume_id: 1,
        composite: 77.0,
        semantic: 70.0,
        skills: 80.0,
        experience: 90.0,
        last_computed: Utc::now(),
    };
    match_store::upsert_many(&conn, &[row.clone()]).unwrap();
    match_store::upsert_many(&conn, &[row]).unwrap();
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn law_adding_a_candidate_skill_never_decreases_the_skills_component() {
    let v = vec![1.0_f32, 0.0];
    let before = score_for(&v, &v, &strings(&["Python"]), &strings(&["Python", "FastAPI"]), &[], 2.0, 1.0, 3.0);
    let after = score_for(
        &v,
        &v,
        &strings(&["Python", "FastAPI"]),
        &strings(&["Python", "FastAPI"]),
        &[],
        2.0,
        1.0,
        3.0,
    );
    assert!(after.skills >= before.skills);
}

#[test]
fn law_experience_band_edges_are_exact_inclusive_bounds() {
    let v = vec![1.0_f32, 0.0];
    let at_low = score_for(&v, &v, &strings(&["Python"]), &strings(&["Python"]), &[], 1.0, 1.0, 3.0);
    let at_high = score_for(&v, &v, &strings(&["Python"]), &strings(&["Python"]), &[], 3.0, 1.0, 3.0);
    let just_under = score_for(&v, &v, &strings(&["Python"]), &strings(&["Python"]), &[], 0.999, 1.0, 3.0);
    assert_eq!(at_low.experience, 100.0);
    assert_eq!(at_high.experience, 100.0);
    assert!(just_under.experience < 100.0);
}

#[test]
fn law_normalize_url_roundtrips_scheme_www_and_trailing_slash() {
    let canonical = duplicate_detector::normalize_url("linkedin.com/in/alice").unwrap();
    let variants = [
        "https://www.linkedin.com/in/alice/",
        "HTTP://LinkedIn.com/in/alice",
        "www.linkedin.com/in/alice/",
    ];
    for variant in variants {
        assert_eq!(duplicate_detector::normalize_url(variant).unwrap(), canonical);
    }
}

#[test]
fn law_overlap_merge_of_experience_spans_matches_the_worked_example() {
    use skillmatch_core::domain::ExperienceEntry;
    let experience = vec![
        ExperienceEntry { start_date: "2022-01".into(), end_date: "2023-01".into(), ..Default::default() },
        ExperienceEntry { start_date: "2022-06".into(), end_date: "2023-06".into(), ..Default::default() },
    ];
    assert_eq!(resume_intelligence::total_experience_months(&experience), 18);
}

#[test]
fn education_entry_is_reachable_from_public_domain_module() {
    // Smoke check that the domain types used throughout these tests are
    // part of the crate's public surface, not just internal plumbing.
    let entry = EducationEntry { degree: "Bachelor".to_string(), ..Default::default() };
    assert_eq!(entry.degree, "Bachelor");
}
