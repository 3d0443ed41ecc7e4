// src/store/sqlite.rs
// =============================================================================
// SQLite implementation of the store traits.
//
// - One connection behind a Mutex; every statement takes the lock briefly
// - Timestamps are stored as Unix milliseconds (INTEGER)
// - Ties on the timestamp fall back to insertion order (rowid)
// =============================================================================

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{
    CheckRecord, CheckStore, KeyedEvent, NewCheck, NewPageView, PageView, PageViewStore, Result,
    StoreError,
};
use crate::checker::SiteStatus;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS website_checks (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('up', 'down')),
    status_code INTEGER,
    response_time_ms INTEGER NOT NULL,
    error_message TEXT,
    checked_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_website_checks_checked_at ON website_checks (checked_at DESC);
CREATE INDEX IF NOT EXISTS idx_website_checks_domain ON website_checks (domain, checked_at DESC);

CREATE TABLE IF NOT EXISTS site_analytics (
    id TEXT PRIMARY KEY,
    page_path TEXT NOT NULL,
    referrer TEXT,
    user_agent TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_site_analytics_created_at ON site_analytics (created_at DESC);
";

const CHECK_COLUMNS: &str =
    "id, url, domain, status, status_code, response_time_ms, error_message, checked_at";

impl ToSql for SiteStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SiteStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened check database");
        Self::with_schema(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&conn)?)
    }

    /// Insert a check with an explicit timestamp
    pub fn insert_check_at(&self, check: &NewCheck, checked_at: DateTime<Utc>) -> Result<CheckRecord> {
        let id = Uuid::new_v4().to_string();
        let millis = checked_at.timestamp_millis();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO website_checks (id, url, domain, status, status_code, response_time_ms, error_message, checked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    check.url,
                    check.domain,
                    check.status,
                    check.status_code,
                    i64::try_from(check.response_time_ms).unwrap_or(i64::MAX),
                    check.error_message,
                    millis,
                ],
            )
        })?;

        Ok(CheckRecord {
            id,
            url: check.url.clone(),
            domain: check.domain.clone(),
            status: check.status,
            status_code: check.status_code,
            response_time_ms: check.response_time_ms,
            error_message: check.error_message.clone(),
            checked_at: from_millis(millis),
        })
    }

    /// Insert a page view with an explicit timestamp
    pub fn insert_page_view_at(&self, view: &NewPageView, created_at: DateTime<Utc>) -> Result<PageView> {
        let id = Uuid::new_v4().to_string();
        let millis = created_at.timestamp_millis();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO site_analytics (id, page_path, referrer, user_agent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, view.page_path, view.referrer, view.user_agent, millis],
            )
        })?;

        Ok(PageView {
            id,
            page_path: view.page_path.clone(),
            referrer: view.referrer.clone(),
            user_agent: view.user_agent.clone(),
            created_at: from_millis(millis),
        })
    }

    fn query_checks(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<CheckRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params, check_from_row)?;
            rows.collect()
        })
    }

    fn count_since(&self, sql: &str, since: Option<DateTime<Utc>>) -> Result<u64> {
        let since = since.map(|at| at.timestamp_millis()).unwrap_or(i64::MIN);
        let count: i64 = self.with_conn(|conn| conn.query_row(sql, params![since], |row| row.get(0)))?;
        Ok(count.max(0) as u64)
    }

    fn keyed_since(&self, sql: &str, since: DateTime<Utc>, limit: usize) -> Result<Vec<KeyedEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt.query_map(params![since.timestamp_millis(), sql_limit(limit)], |row| {
                Ok(KeyedEvent {
                    key: row.get(0)?,
                    at: from_millis(row.get(1)?),
                })
            })?;
            rows.collect()
        })
    }
}

impl CheckStore for SqliteStore {
    fn insert_check(&self, check: &NewCheck) -> Result<CheckRecord> {
        self.insert_check_at(check, Utc::now())
    }

    fn recent_checks(&self, limit: usize) -> Result<Vec<CheckRecord>> {
        self.query_checks(
            &format!(
                "SELECT {CHECK_COLUMNS} FROM website_checks
                 ORDER BY checked_at DESC, rowid DESC LIMIT ?1"
            ),
            params![sql_limit(limit)],
        )
    }

    fn checks_for_domain(&self, domain: &str, limit: usize) -> Result<Vec<CheckRecord>> {
        self.query_checks(
            &format!(
                "SELECT {CHECK_COLUMNS} FROM website_checks WHERE domain = ?1
                 ORDER BY checked_at DESC, rowid DESC LIMIT ?2"
            ),
            params![domain, sql_limit(limit)],
        )
    }

    fn count_checks(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        self.count_since("SELECT COUNT(*) FROM website_checks WHERE checked_at >= ?1", since)
    }

    fn check_domains_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<KeyedEvent>> {
        self.keyed_since(
            "SELECT domain, checked_at FROM website_checks WHERE checked_at >= ?1
             ORDER BY checked_at DESC, rowid DESC LIMIT ?2",
            since,
            limit,
        )
    }
}

impl PageViewStore for SqliteStore {
    fn insert_page_view(&self, view: &NewPageView) -> Result<PageView> {
        self.insert_page_view_at(view, Utc::now())
    }

    fn count_page_views(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        self.count_since("SELECT COUNT(*) FROM site_analytics WHERE created_at >= ?1", since)
    }

    fn page_paths_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<KeyedEvent>> {
        self.keyed_since(
            "SELECT page_path, created_at FROM site_analytics WHERE created_at >= ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            since,
            limit,
        )
    }
}

fn check_from_row(row: &Row<'_>) -> rusqlite::Result<CheckRecord> {
    let response_time_ms: i64 = row.get(5)?;
    Ok(CheckRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        domain: row.get(2)?,
        status: row.get(3)?,
        status_code: row.get(4)?,
        response_time_ms: response_time_ms.max(0) as u64,
        error_message: row.get(6)?,
        checked_at: from_millis(row.get(7)?),
    })
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

// SQLite takes LIMIT as a signed integer
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
