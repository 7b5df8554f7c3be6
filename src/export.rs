//! CSV/XLSX export (out of the hard core but contractually required):
//! ranked-candidate rows for a posting, color-banded by match score.
//!
//! `csv`/`rust_xlsxwriter` are the formatting-concern crates pulled in for
//! this module; neither is load-bearing for the matching engine itself.

use crate::error::{MatchError, MatchResult};
use crate::ranking::RankedCandidate;
use rust_xlsxwriter::{Color, Format, Workbook};

pub const EXPORT_HEADERS: &[&str] = &[
    "Candidate Name",
    "Email",
    "Phone",
    "Match Score %",
    "Top Matching Skills",
    "Experience (Years)",
    "Education Level",
    "Application Date",
    "Application Status",
    "Key Strengths",
    "Semantic Match %",
    "Skills Match %",
    "Experience Match %",
];

pub struct ExportRow {
    pub candidate_name: String,
    pub email: String,
    pub phone: String,
    pub match_score: f64,
    pub top_matching_skills: Vec<String>,
    pub experience_years: f64,
    pub education_level: String,
    pub application_date: String,
    pub application_status: String,
    pub key_strengths: Vec<String>,
    pub semantic_match: f64,
    pub skills_match: f64,
    pub experience_match: f64,
}

pub fn export_filename(posting_title: &str, timestamp: i64, extension: &str) -> String {
    let slug: String = posting_title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.{}", slug, timestamp, extension)
}

/// Sort rows by composite score descending.
pub fn sort_rows_desc(rows: &mut [ExportRow]) {
    rows.sort_by(|a, b| b.match_score.partial_cmp(&a.match_score).unwrap_or(std::cmp::Ordering::Equal));
}

pub fn to_csv(rows: &[ExportRow]) -> MatchResult<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(EXPORT_HEADERS)
        .map_err(|e| MatchError::Io(format!("csv write failed: {}", e)))?;
    for row in rows {
        writer
            .write_record(&[
                row.candidate_name.clone(),
                row.email.clone(),
                // stored as text to defeat spreadsheet formula inference
                format!("'{}", row.phone),
                format!("{:.0}", row.match_score),
                row.top_matching_skills.iter().take(5).cloned().collect::<Vec<_>>().join(", "),
                format!("{:.1}", row.experience_years),
                row.education_level.clone(),
                row.application_date.clone(),
                row.application_status.clone(),
                row.key_strengths.join(", "),
                format!("{:.0}", row.semantic_match),
                format!("{:.0}", row.skills_match),
                format!("{:.0}", row.experience_match),
            ])
            .map_err(|e| MatchError::Io(format!("csv write failed: {}", e)))?;
    }
    let bytes = writer.into_inner().map_err(|e| MatchError::Io(format!("csv flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| MatchError::Io(e.to_string()))
}

fn band_color(score: f64) -> Color {
    if score >= 80.0 {
        Color::RGB(0x2e_7d_32)
    } else if score >= 60.0 {
        Color::RGB(0xed_6c_02)
    } else {
        Color::RGB(0xc6_28_28)
    }
}

pub fn to_xlsx(rows: &[ExportRow]) -> MatchResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *header)
            .map_err(|e| MatchError::Io(format!("xlsx header write failed: {}", e)))?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let format = Format::new().set_font_color(band_color(row.match_score));
        sheet.write_string(r, 0, &row.candidate_name).map_err(io_err)?;
        sheet.write_string(r, 1, &row.email).map_err(io_err)?;
        sheet.write_string(r, 2, &row.phone).map_err(io_err)?;
        sheet.write_number_with_format(r, 3, row.match_score, &format).map_err(io_err)?;
        sheet
            .write_string(r, 4, &row.top_matching_skills.iter().take(5).cloned().collect::<Vec<_>>().join(", "))
            .map_err(io_err)?;
        sheet.write_number(r, 5, row.experience_years).map_err(io_err)?;
        sheet.write_string(r, 6, &row.education_level).map_err(io_err)?;
        sheet.write_string(r, 7, &row.application_date).map_err(io_err)?;
        sheet.write_string(r, 8, &row.application_status).map_err(io_err)?;
        sheet.write_string(r, 9, &row.key_strengths.join(", ")).map_err(io_err)?;
        sheet.write_number(r, 10, row.semantic_match).map_err(io_err)?;
        sheet.write_number(r, 11, row.skills_match).map_err(io_err)?;
        sheet.write_number(r, 12, row.experience_match).map_err(io_err)?;
    }

    workbook.save_to_buffer().map_err(|e| MatchError::Io(format!("xlsx save failed: {}", e)))
}

fn io_err(e: rust_xlsxwriter::XlsxError) -> MatchError {
    MatchError::Io(format!("xlsx write failed: {}", e))
}

/// Build export rows from ranked candidates; caller supplies the remaining
/// per-candidate fields not owned by the ranking pipeline (contact info,
/// application metadata).
pub fn build_export_row(
    ranked: &RankedCandidate,
    email: String,
    phone: String,
    experience_years: f64,
    education_level: String,
    application_date: String,
    application_status: String,
) -> ExportRow {
    ExportRow {
        candidate_name: ranked.display_name.clone(),
        email,
        phone,
        match_score: ranked.composite,
        top_matching_skills: ranked.matched_skills.clone(),
        experience_years,
        education_level,
        application_date,
        application_status,
        key_strengths: ranked.matched_skills.clone(),
        semantic_match: 0.0,
        skills_match: 0.0,
        experience_match: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, score: f64) -> ExportRow {
        ExportRow {
            candidate_name: name.to_string(),
            email: format!("{}@example.com", name),
            phone: "9998887777".to_string(),
            match_score: score,
            top_matching_skills: vec!["Python".to_string()],
            experience_years: 2.0,
            education_level: "Bachelor".to_string(),
            application_date: "2026-01-01".to_string(),
            application_status: "pending".to_string(),
            key_strengths: vec!["Python".to_string()],
            semantic_match: 80.0,
            skills_match: 90.0,
            experience_match: 100.0,
        }
    }

    #[test]
    fn filename_matches_spec_pattern() {
        assert_eq!(export_filename("Backend Intern", 1700000000, "csv"), "Backend_Intern_1700000000.csv");
    }

    #[test]
    fn sort_rows_desc_orders_by_score() {
        let mut rows = vec![row("A", 40.0), row("B", 90.0)];
        sort_rows_desc(&mut rows);
        assert_eq!(rows[0].candidate_name, "B");
    }

    #[test]
    fn csv_contains_header_and_phone_as_text() {
        let rows = vec![row("Jane", 85.0)];
        let csv = to_csv(&rows).unwrap();
        assert!(csv.contains("Candidate Name"));
        assert!(csv.contains("'9998887777"));
    }
}
