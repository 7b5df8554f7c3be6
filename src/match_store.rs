//! Match Store (C8): durable materialized (candidate_id, posting_id) ->
//! {composite, semantic, skills, experience, last_computed}.
//!
//! A derived, rebuildable view — never the source of truth for scores, only
//! a cache of the last C9 run. Bulk upsert-by-PK and delete-by-side are the
//! only mutation paths; everything else is query.

use crate::domain::MatchRow;
use crate::error::{DatabaseError, MatchResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Composite,
    PostedAt,
    Title,
    Experience,
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Sort { field: SortField::Composite, direction: SortDirection::Desc }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Page { number: 1, size: 20 }
    }
}

#[derive(Debug, Clone)]
pub struct PagedResult<T> {
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub items: Vec<T>,
}

/// Bulk insert/update by primary key `(candidate_id, posting_id)`. Rows are
/// idempotent: re-upserting an unchanged row is a write-no-op by value, but
/// we always overwrite `last_computed` to reflect this run.
pub fn upsert_many(conn: &Connection, rows: &[MatchRow]) -> MatchResult<()> {
    for row in rows {
        conn.execute(
            "INSERT INTO matches (candidate_id, posting_id, resume_id, composite, semantic, skills, experience, last_computed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(candidate_id, posting_id) DO UPDATE SET
                resume_id = excluded.resume_id,
                composite = excluded.composite,
                semantic = excluded.semantic,
                skills = excluded.skills,
                experience = excluded.experience,
                last_computed = excluded.last_computed",
            params![
                row.candidate_id,
                row.posting_id,
                row.resume_id,
                row.composite,
                row.semantic,
                row.skills,
                row.experience,
                row.last_computed.to_rfc3339(),
            ],
        )
        .map_err(DatabaseError::from)?;
    }
    Ok(())
}

/// Delete rows for a candidate and/or a posting. At least one of the two
/// must be provided.
pub fn delete_where(conn: &Connection, candidate_id: Option<i64>, posting_id: Option<i64>) -> MatchResult<u64> {
    let affected = match (candidate_id, posting_id) {
        (Some(c), Some(p)) => conn.execute("DELETE FROM matches WHERE candidate_id = ?1 AND posting_id = ?2", params![c, p]),
        (Some(c), None) => conn.execute("DELETE FROM matches WHERE candidate_id = ?1", params![c]),
        (None, Some(p)) => conn.execute("DELETE FROM matches WHERE posting_id = ?1", params![p]),
        (None, None) => return Err(DatabaseError::InvalidData("delete_where requires at least one key".to_string()).into()),
    }
    .map_err(DatabaseError::from)?;
    Ok(affected as u64)
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilters {
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::Composite => "m.composite",
        SortField::PostedAt | SortField::CreatedAt => "p.created_at",
        SortField::Title => "p.title",
        SortField::Experience => "m.experience",
        SortField::Name => "c.display_name",
    }
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

/// Match rows for a candidate, joined with active postings only. Uses
/// anonymous `?` placeholders bound strictly in the order built below, so
/// the WHERE clause and the bind vector must stay in lockstep.
pub fn query_for_candidate(
    conn: &Connection,
    candidate_id: i64,
    filters: &MatchFilters,
    sort: Sort,
    page: Page,
) -> MatchResult<PagedResult<(MatchRow, String)>> {
    let mut where_clauses = vec!["m.candidate_id = ?".to_string(), "p.active = 1".to_string()];
    let mut bind: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(candidate_id)];
    if let Some(min) = filters.min_score {
        where_clauses.push("m.composite >= ?".to_string());
        bind.push(Box::new(min));
    }
    if let Some(max) = filters.max_score {
        where_clauses.push("m.composite <= ?".to_string());
        bind.push(Box::new(max));
    }
    let where_sql = where_clauses.join(" AND ");

    let count_sql = format!(
        "SELECT COUNT(*) FROM matches m JOIN postings p ON p.id = m.posting_id WHERE {}",
        where_sql
    );
    let total: i64 = conn
        .query_row(&count_sql, rusqlite::params_from_iter(bind.iter().map(|b| b.as_ref())), |r| r.get(0))
        .map_err(DatabaseError::from)?;

    let query_sql = format!(
        "SELECT m.candidate_id, m.posting_id, m.resume_id, m.composite, m.semantic, m.skills, m.experience, m.last_computed, p.title
         FROM matches m JOIN postings p ON p.id = m.posting_id
         WHERE {}
         ORDER BY {} {}
         LIMIT ? OFFSET ?",
        where_sql,
        sort_column(sort.field),
        direction_sql(sort.direction),
    );

    let offset = ((page.number.max(1) - 1) * page.size) as i64;
    bind.push(Box::new(page.size as i64));
    bind.push(Box::new(offset));

    let mut stmt = conn.prepare(&query_sql).map_err(DatabaseError::from)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(bind.iter().map(|b| b.as_ref())), |r| {
            Ok((row_to_match(r)?, r.get::<_, String>(8)?))
        })
        .map_err(DatabaseError::from)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row.map_err(DatabaseError::from)?);
    }

    Ok(PagedResult { total: total as u64, page: page.number, size: page.size, items })
}

fn row_to_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRow> {
    let last_computed_str: String = row.get(7)?;
    let last_computed = chrono::DateTime::parse_from_rfc3339(&last_computed_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(MatchRow {
        candidate_id: row.get(0)?,
        posting_id: row.get(1)?,
        resume_id: row.get(2)?,
        composite: row.get(3)?,
        semantic: row.get(4)?,
        skills: row.get(5)?,
        experience: row.get(6)?,
        last_computed,
    })
}

pub fn get_one(conn: &Connection, candidate_id: i64, posting_id: i64) -> MatchResult<Option<MatchRow>> {
    conn.query_row(
        "SELECT candidate_id, posting_id, resume_id, composite, semantic, skills, experience, last_computed
         FROM matches WHERE candidate_id = ?1 AND posting_id = ?2",
        params![candidate_id, posting_id],
        row_to_match,
    )
    .optional()
    .map_err(|e| DatabaseError::from(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, open_in_memory};

    fn seed(conn: &Connection) {
        conn.execute("INSERT INTO companies (id, name) VALUES (1, 'Acme')", []).unwrap();
        conn.execute("INSERT INTO candidates (id, display_name, email) VALUES (1, 'Jane', 'jane@example.com')", []).unwrap();
        conn.execute(
            "INSERT INTO postings (id, company_id, title, description, content_hash, active) VALUES (1, 1, 'Intern', 'd', 'h', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO resumes (id, candidate_id, file_name, parsed_text, parsed_data, content_hash) VALUES (1, 1, 'r.pdf', 't', '{}', 'h')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let conn = open_in_memory().unwrap();
        init_database(&conn).unwrap();
        seed(&conn);
        let row = MatchRow {
            candidate_id: 1,
            posting_id: 1,
            resume_id: 1,
            composite: 90.5,
            semantic: 80.0,
            skills: 95.0,
            experience: 100.0,
            last_computed: Utc::now(),
        };
        upsert_many(&conn, &[row]).unwrap();
        let fetched = get_one(&conn, 1, 1).unwrap().unwrap();
        assert_eq!(fetched.composite, 90.5);
    }

    #[test]
    fn upsert_is_idempotent_by_pk() {
        let conn = open_in_memory().unwrap();
        init_database(&conn).unwrap();
        seed(&conn);
        let mut row = MatchRow {
            candidate_id: 1,
            posting_id: 1,
            resume_id: 1,
            composite: 90.5,
            semantic: 80.0,
            skills: 95.0,
            experience: 100.0,
            last_computed: Utc::now(),
        };
        upsert_many(&conn, &[row.clone()]).unwrap();
        row.composite = 95.0;
        upsert_many(&conn, &[row]).unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM matches", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
        let fetched = get_one(&conn, 1, 1).unwrap().unwrap();
        assert_eq!(fetched.composite, 95.0);
    }

    #[test]
    fn delete_where_requires_a_key() {
        let conn = open_in_memory().unwrap();
        init_database(&conn).unwrap();
        let result = delete_where(&conn, None, None);
        assert!(result.is_err());
    }

    #[test]
    fn query_for_candidate_filters_by_score_band() {
        let conn = open_in_memory().unwrap();
        init_database(&conn).unwrap();
        seed(&conn);
        conn.execute("INSERT INTO companies (id, name) VALUES (2, 'Beta')", []).unwrap();
        conn.execute(
            "INSERT INTO postings (id, company_id, title, description, content_hash, active) VALUES (2, 2, 'Intern2', 'd', 'h2', 1)",
            [],
        )
        .unwrap();
        let rows = vec![
            MatchRow { candidate_id: 1, posting_id: 1, resume_id: 1, composite: 90.0, semantic: 1.0, skills: 1.0, experience: 1.0, last_computed: Utc::now() },
            MatchRow { candidate_id: 1, posting_id: 2, resume_id: 1, composite: 40.0, semantic: 1.0, skills: 1.0, experience: 1.0, last_computed: Utc::now() },
        ];
        upsert_many(&conn, &rows).unwrap();
        let filters = MatchFilters { min_score: Some(50.0), max_score: None };
        let result = query_for_candidate(&conn, 1, &filters, Sort::default(), Page::default()).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].0.posting_id, 1);
    }
}
