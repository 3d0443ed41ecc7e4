// src/store/mod.rs
// =============================================================================
// Persistence for check records and page-view events.
//
// Two tables, both append-only:
// - website_checks: one row per completed check
// - site_analytics: one row per tracked page view
//
// The traits are what the rest of the crate codes against; `SqliteStore`
// is the implementation used by the binary.
// =============================================================================

mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checker::SiteStatus;

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection lock was poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A check result about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheck {
    pub url: String,
    pub domain: String,
    pub status: SiteStatus,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
}

/// A stored check. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: String,
    pub url: String,
    pub domain: String,
    pub status: SiteStatus,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPageView {
    pub page_path: String,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub id: String,
    pub page_path: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A grouping key with the time it was recorded: (domain, checked_at) for
/// checks, (page_path, created_at) for page views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedEvent {
    pub key: String,
    pub at: DateTime<Utc>,
}

/// Write and read access to check records.
pub trait CheckStore: Send + Sync {
    /// Persist a new record, assigning its id and `checked_at`
    fn insert_check(&self, check: &NewCheck) -> Result<CheckRecord>;

    /// Newest records first, at most `limit`
    fn recent_checks(&self, limit: usize) -> Result<Vec<CheckRecord>>;

    /// Newest records for exactly `domain`, at most `limit`
    fn checks_for_domain(&self, domain: &str, limit: usize) -> Result<Vec<CheckRecord>>;

    /// Number of records checked at or after `since` (all records when `None`)
    fn count_checks(&self, since: Option<DateTime<Utc>>) -> Result<u64>;

    /// (domain, checked_at) pairs since `since`, newest first, at most `limit`
    fn check_domains_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<KeyedEvent>>;
}

/// Write and read access to page-view events.
pub trait PageViewStore: Send + Sync {
    fn insert_page_view(&self, view: &NewPageView) -> Result<PageView>;

    fn count_page_views(&self, since: Option<DateTime<Utc>>) -> Result<u64>;

    /// (page_path, created_at) pairs since `since`, newest first, at most `limit`
    fn page_paths_since(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<KeyedEvent>>;
}
