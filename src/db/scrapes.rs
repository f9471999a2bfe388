use crate::errors::AppError;
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct ScrapeRun {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub listings_seen: Option<i64>,
    pub listings_new: Option<i64>,
    pub listings_posted: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Counters written when a cycle finishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub seen: usize,
    pub new: usize,
    pub posted: usize,
}

pub fn start_scrape_run(conn: &Connection, now: i64) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO scrape_runs (started_at, success) VALUES (?, 0)",
        params![now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_scrape_run(
    conn: &Connection,
    run_id: i64,
    now: i64,
    totals: &RunTotals,
    error: Option<String>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, listings_seen = ?, listings_new = ?, listings_posted = ?, success = ?, error_message = ? WHERE id = ?",
        params![
            now,
            totals.seen as i64,
            totals.new as i64,
            totals.posted as i64,
            error.is_none(),
            error,
            run_id
        ],
    )?;
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection) -> Result<Vec<ScrapeRun>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, started_at, finished_at, listings_seen, listings_new, listings_posted, success, error_message FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT 50",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ScrapeRun {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            listings_seen: row.get(3)?,
            listings_new: row.get(4)?,
            listings_posted: row.get(5)?,
            success: row.get(6)?,
            error_message: row.get(7)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}
