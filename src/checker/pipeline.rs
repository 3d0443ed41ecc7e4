// src/checker/pipeline.rs
// =============================================================================
// The "check website" operation: normalize -> probe -> record.
//
// What happens here:
// 1. Normalize the input (bad input stops here, nothing is probed or saved)
// 2. Probe the URL (never fails; unreachable sites are just "down")
// 3. Save the result
// 4. Hand the outcome back, even if saving failed (then without an id)
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::{normalize_url, CheckError, NormalizedUrl, Probe, ProbeOutcome, SiteStatus};
use crate::store::{CheckRecord, CheckStore, NewCheck};

/// What a caller gets back from one check.
///
/// `id` is missing when the result could not be saved; `checked_at` is then
/// the time the check finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub domain: String,
    pub status: SiteStatus,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl CheckOutcome {
    pub fn is_up(&self) -> bool {
        self.status == SiteStatus::Up
    }

    /// Outcome for a result that never made it into the store
    fn unsaved(check: NewCheck, checked_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            url: check.url,
            domain: check.domain,
            status: check.status,
            status_code: check.status_code,
            response_time_ms: check.response_time_ms,
            error_message: check.error_message,
            checked_at,
        }
    }
}

impl From<CheckRecord> for CheckOutcome {
    fn from(record: CheckRecord) -> Self {
        Self {
            id: Some(record.id),
            url: record.url,
            domain: record.domain,
            status: record.status,
            status_code: record.status_code,
            response_time_ms: record.response_time_ms,
            error_message: record.error_message,
            checked_at: record.checked_at,
        }
    }
}

pub struct CheckPipeline {
    prober: Arc<dyn Probe>,
    store: Arc<dyn CheckStore>,
}

impl CheckPipeline {
    pub fn new(prober: Arc<dyn Probe>, store: Arc<dyn CheckStore>) -> Self {
        Self { prober, store }
    }

    /// Check one website given whatever the user typed.
    pub async fn check_website(&self, input: &str) -> Result<CheckOutcome, CheckError> {
        let target = normalize_url(input)?;
        let probe = self.prober.probe(&target.url).await;

        info!(
            url = %target.url,
            domain = %target.domain,
            status = %probe.status,
            status_code = ?probe.status_code,
            response_time_ms = probe.response_time_ms,
            used_fallback = probe.used_fallback,
            "website checked"
        );

        Ok(self.record(target, probe))
    }

    // Saves the result; a storage failure is logged and the caller still
    // gets the outcome
    fn record(&self, target: NormalizedUrl, probe: ProbeOutcome) -> CheckOutcome {
        let check = NewCheck {
            url: target.url,
            domain: target.domain,
            status: probe.status,
            status_code: probe.status_code,
            response_time_ms: probe.response_time_ms,
            error_message: probe.error_message,
        };

        match self.store.insert_check(&check) {
            Ok(record) => record.into(),
            Err(e) => {
                error!(domain = %check.domain, error = %e, "failed to save check result");
                CheckOutcome::unsaved(check, Utc::now())
            }
        }
    }
}
