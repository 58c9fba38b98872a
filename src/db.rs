use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::score::DeScoreResult;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS projects (
            id         INTEGER PRIMARY KEY,
            domain     TEXT UNIQUE NOT NULL,
            name       TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS de_scores (
            id               INTEGER PRIMARY KEY,
            project_id       INTEGER NOT NULL REFERENCES projects(id),
            url              TEXT NOT NULL,
            brand_score      INTEGER NOT NULL,
            operations_score INTEGER NOT NULL,
            paid_score       INTEGER NOT NULL,
            total_score      INTEGER NOT NULL,
            breakdown        TEXT NOT NULL,
            scored_at        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scores_project ON de_scores(project_id);

        -- One row per scoring category
        CREATE TABLE IF NOT EXISTS analyses (
            id         INTEGER PRIMARY KEY,
            score_id   INTEGER NOT NULL REFERENCES de_scores(id),
            project_id INTEGER NOT NULL REFERENCES projects(id),
            kind       TEXT NOT NULL CHECK(kind IN ('wallflower','seo','technical','paid','operations')),
            score      INTEGER NOT NULL,
            data       TEXT NOT NULL,
            UNIQUE(score_id, kind)
        );
        CREATE INDEX IF NOT EXISTS idx_analyses_project ON analyses(project_id);

        CREATE TABLE IF NOT EXISTS score_failures (
            id        INTEGER PRIMARY KEY,
            url       TEXT NOT NULL,
            error     TEXT NOT NULL,
            failed_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Projects ──

/// Insert the project or touch its `updated_at`; returns its id.
pub fn upsert_project(conn: &Connection, domain: &str) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO projects (domain, name) VALUES (?1, ?1)
         ON CONFLICT(domain) DO UPDATE SET updated_at = datetime('now')
         RETURNING id",
        params![domain],
        |row| row.get(0),
    )?;
    Ok(id)
}

// ── Scores ──

pub fn save_score(conn: &Connection, domain: &str, result: &DeScoreResult) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let project_id = upsert_project(&tx, domain)?;
    let breakdown = serde_json::to_string(&result.breakdown)?;

    tx.execute(
        "INSERT INTO de_scores
         (project_id, url, brand_score, operations_score, paid_score, total_score, breakdown, scored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            project_id,
            result.breakdown.url,
            result.brand_score,
            result.operations_score,
            result.paid_score,
            result.total_score,
            breakdown,
            Utc::now().to_rfc3339(),
        ],
    )?;
    let score_id = tx.last_insert_rowid();

    {
        let mut stmt = tx.prepare(
            "INSERT INTO analyses (score_id, project_id, kind, score, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (kind, score, data) in analysis_rows(result)? {
            stmt.execute(params![score_id, project_id, kind, score, data])?;
        }
    }
    tx.commit()?;
    Ok(score_id)
}

fn analysis_rows(result: &DeScoreResult) -> Result<Vec<(&'static str, u32, String)>> {
    let b = &result.breakdown;
    Ok(vec![
        ("wallflower", b.wallflower.overall_score, serde_json::to_string(&b.wallflower)?),
        ("seo", b.seo.overall_score, serde_json::to_string(&b.seo)?),
        ("technical", b.technical.overall_score, serde_json::to_string(&b.technical)?),
        (
            "paid",
            result.paid_score,
            serde_json::json!({
                "seoOverall": b.seo.overall_score,
                "performance": b.technical.performance_score,
                "brandPresence": b.wallflower.brand_presence_score,
            })
            .to_string(),
        ),
        (
            "operations",
            result.operations_score,
            serde_json::json!({
                "seoOverall": b.seo.overall_score,
                "technicalOverall": b.technical.overall_score,
                "wallflowerOverall": b.wallflower.overall_score,
            })
            .to_string(),
        ),
    ])
}

pub fn save_failure(conn: &Connection, url: &str, error: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO score_failures (url, error) VALUES (?1, ?2)",
        params![url, error],
    )?;
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    pub domain: String,
    pub url: String,
    pub brand_score: u32,
    pub operations_score: u32,
    pub paid_score: u32,
    pub total_score: u32,
    pub scored_at: DateTime<Utc>,
}

pub fn fetch_history(conn: &Connection, domain: Option<&str>, limit: usize) -> Result<Vec<HistoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT p.domain, s.url, s.brand_score, s.operations_score, s.paid_score, s.total_score, s.scored_at
         FROM de_scores s
         JOIN projects p ON p.id = s.project_id
         WHERE ?1 IS NULL OR p.domain = ?1
         ORDER BY s.id DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![domain, limit as i64], |row| {
            Ok(HistoryRow {
                domain: row.get(0)?,
                url: row.get(1)?,
                brand_score: row.get(2)?,
                operations_score: row.get(3)?,
                paid_score: row.get(4)?,
                total_score: row.get(5)?,
                scored_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Most recent stored result for a project, rebuilt from its row.
pub fn fetch_latest(conn: &Connection, domain: &str) -> Result<Option<DeScoreResult>> {
    let row = conn
        .query_row(
            "SELECT s.brand_score, s.operations_score, s.paid_score, s.total_score, s.breakdown
             FROM de_scores s
             JOIN projects p ON p.id = s.project_id
             WHERE p.domain = ?1
             ORDER BY s.id DESC
             LIMIT 1",
            params![domain],
            |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((brand_score, operations_score, paid_score, total_score, breakdown)) = row else {
        return Ok(None);
    };
    let breakdown = serde_json::from_str(&breakdown)
        .with_context(|| format!("Corrupt breakdown stored for {}", domain))?;
    Ok(Some(DeScoreResult {
        brand_score,
        operations_score,
        paid_score,
        total_score,
        breakdown,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub projects: i64,
    pub scores: i64,
    pub failures: i64,
    pub average_total: Option<f64>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
    };
    Ok(Stats {
        projects: count("projects")?,
        scores: count("de_scores")?,
        failures: count("score_failures")?,
        average_total: conn.query_row("SELECT AVG(total_score) FROM de_scores", [], |r| r.get(0))?,
    })
}
