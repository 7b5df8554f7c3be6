//! Relational store (SQLite): a `migrations` table tracking applied,
//! numbered, forward-only migrations.

use crate::error::{DatabaseError, MatchResult};
use log::info;
use rusqlite::Connection;
use std::path::Path;

pub fn get_connection(db_path: &Path) -> MatchResult<Connection> {
    Connection::open(db_path).map_err(|e| DatabaseError::from(e).into())
}

pub fn open_in_memory() -> MatchResult<Connection> {
    Connection::open_in_memory().map_err(|e| DatabaseError::from(e).into())
}

pub fn init_database(conn: &Connection) -> MatchResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(DatabaseError::from)?;
    run_migrations(conn)
}

type Migration = (&'static str, fn(&Connection) -> rusqlite::Result<()>);

const MIGRATIONS: &[Migration] = &[
    ("001_initial_schema", migration_001_initial_schema),
    ("002_matches_indexes", migration_002_matches_indexes),
    ("003_posting_experience_level", migration_003_posting_experience_level),
];

fn run_migrations(conn: &Connection) -> MatchResult<()> {
    for (name, apply) in MIGRATIONS {
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations WHERE name = ?", [name], |row| row.get(0))
            .map_err(DatabaseError::from)?;
        if count == 0 {
            info!("running migration: {}", name);
            apply(conn).map_err(DatabaseError::from)?;
            conn.execute("INSERT INTO migrations (name, applied_at) VALUES (?, datetime('now'))", [name])
                .map_err(DatabaseError::from)?;
        }
    }
    Ok(())
}

fn migration_001_initial_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE candidates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            display_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            linkedin TEXT,
            github TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            skills TEXT NOT NULL DEFAULT '[]',
            total_experience_years REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );

        CREATE TABLE postings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL REFERENCES companies(id),
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            required_skills TEXT NOT NULL DEFAULT '[]',
            preferred_skills TEXT NOT NULL DEFAULT '[]',
            min_experience REAL NOT NULL DEFAULT 0,
            max_experience REAL NOT NULL DEFAULT 10,
            required_education TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            content_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE resumes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            candidate_id INTEGER NOT NULL REFERENCES candidates(id),
            storage_key TEXT,
            local_path TEXT,
            file_name TEXT NOT NULL,
            parsed_text TEXT NOT NULL,
            parsed_data TEXT NOT NULL,
            parsed_data_schema_version INTEGER NOT NULL DEFAULT 1,
            extracted_skills TEXT NOT NULL DEFAULT '[]',
            embedding_ref TEXT,
            kind TEXT NOT NULL DEFAULT 'base',
            tailored_for_posting_id INTEGER REFERENCES postings(id),
            base_resume_id INTEGER REFERENCES resumes(id),
            content_hash TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE applications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            candidate_id INTEGER NOT NULL REFERENCES candidates(id),
            posting_id INTEGER NOT NULL REFERENCES postings(id),
            resume_id INTEGER NOT NULL REFERENCES resumes(id),
            match_score INTEGER NOT NULL,
            application_similarity_score INTEGER NOT NULL,
            used_tailored_resume INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(candidate_id, posting_id)
        );

        CREATE TABLE matches (
            candidate_id INTEGER NOT NULL REFERENCES candidates(id),
            posting_id INTEGER NOT NULL REFERENCES postings(id),
            resume_id INTEGER NOT NULL REFERENCES resumes(id),
            composite REAL NOT NULL,
            semantic REAL NOT NULL,
            skills REAL NOT NULL,
            experience REAL NOT NULL,
            last_computed TEXT NOT NULL,
            PRIMARY KEY (candidate_id, posting_id)
        );",
    )
}

fn migration_002_matches_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX idx_matches_candidate_composite ON matches(candidate_id, composite DESC);
         CREATE INDEX idx_matches_posting_composite ON matches(posting_id, composite DESC);
         CREATE INDEX idx_resumes_candidate_active ON resumes(candidate_id, active);
         CREATE INDEX idx_applications_posting ON applications(posting_id);",
    )
}

fn migration_003_posting_experience_level(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("ALTER TABLE postings ADD COLUMN experience_level TEXT;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = open_in_memory().unwrap();
        init_database(&conn).unwrap();
        init_database(&conn).unwrap();
        let applied: i64 = conn.query_row("SELECT COUNT(*) FROM migrations", [], |r| r.get(0)).unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn matches_table_enforces_unique_pair() {
        let conn = open_in_memory().unwrap();
        init_database(&conn).unwrap();
        conn.execute(
            "INSERT INTO companies (id, name) VALUES (1, 'Acme')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO candidates (id, display_name, email) VALUES (1, 'Jane', 'jane@example.com')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO postings (id, company_id, title, description, content_hash) VALUES (1, 1, 'Intern', 'desc', 'hash')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO resumes (id, candidate_id, file_name, parsed_text, parsed_data, content_hash) VALUES (1, 1, 'r.pdf', 'text', '{}', 'hash')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO matches (candidate_id, posting_id, resume_id, composite, semantic, skills, experience, last_computed)
             VALUES (1, 1, 1, 90.0, 80.0, 95.0, 100.0, datetime('now'))",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO matches (candidate_id, posting_id, resume_id, composite, semantic, skills, experience, last_computed)
             VALUES (1, 1, 1, 50.0, 50.0, 50.0, 50.0, datetime('now'))",
            [],
        );
        assert!(result.is_err());
    }
}
