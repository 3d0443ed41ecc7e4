// src/server/handlers.rs
// =============================================================================
// Request handlers.
//
// Store reads are short SQLite queries and run inline on the request task.
// The page-view insert is handed to the blocking pool and not awaited: the
// client gets 202 whether or not the row lands.
// =============================================================================

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::{ApiError, AppState};
use crate::analytics::{self, Summary};
use crate::checker::{self, normalize_url, BatchState, CheckOutcome};
use crate::store::{CheckRecord, CheckStore, NewPageView};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    // Caller's limit, or the default, never above `max`
    fn resolve(&self, default: usize, max: usize) -> usize {
        self.limit.unwrap_or(default).min(max)
    }
}

/// Checks for one domain, newest first. `current` repeats the newest one.
#[derive(Debug, Serialize)]
pub struct DomainHistory {
    pub domain: String,
    pub current: Option<CheckRecord>,
    pub history: Vec<CheckRecord>,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api/check with `{ "url": "..." }`
///
/// A body that isn't JSON at all is a 500, like any other unexpected failure.
/// A JSON body without a usable `url` string is a 400.
pub async fn check_website(State(state): State<AppState>, body: Bytes) -> Result<Json<CheckOutcome>, ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "check request body is not JSON");
        ApiError::Internal
    })?;

    let url = body.get("url").and_then(Value::as_str).unwrap_or_default();
    let outcome = state.pipeline.check_website(url).await?;

    Ok(Json(outcome))
}

pub async fn check_all(State(state): State<AppState>) -> Json<BatchState> {
    Json(checker::check_all(&state.pipeline, &state.config.batch.targets).await)
}

pub async fn recent_checks(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CheckRecord>>, ApiError> {
    let policy = &state.config.history;
    let limit = query.resolve(policy.recent_limit, policy.max_limit);

    Ok(Json(state.store.recent_checks(limit)?))
}

pub async fn domain_checks(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<DomainHistory>, ApiError> {
    let policy = &state.config.history;
    let limit = query.resolve(policy.domain_limit, policy.max_limit);
    // Same key a check stores: parsed host, punycode, one "www." stripped
    let domain = normalize_url(&domain)?.domain;

    let history = state.store.checks_for_domain(&domain, limit)?;

    Ok(Json(DomainHistory {
        current: history.first().cloned(),
        domain,
        history,
    }))
}

pub async fn track_page_view(
    State(state): State<AppState>,
    payload: Result<Json<NewPageView>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(view) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if !view.page_path.starts_with('/') {
        return Err(ApiError::BadRequest("page_path must start with '/'".to_string()));
    }

    let store = state.store.clone();
    tokio::task::spawn_blocking(move || {
        analytics::record_page_view(store.as_ref(), &view);
    });

    Ok(StatusCode::ACCEPTED)
}

pub async fn admin_summary(State(state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    let summary = analytics::build_summary(state.store.as_ref(), Utc::now(), &state.config.analytics)?;
    Ok(Json(summary))
}
