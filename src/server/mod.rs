// src/server/mod.rs
// =============================================================================
// HTTP API.
//
// Routes:
//   GET  /health
//   POST /api/check               { "url": "..." } -> CheckOutcome
//   POST /api/check-all           -> BatchState
//   GET  /api/checks/recent       ?limit=
//   GET  /api/checks/domain/:d    ?limit=
//   POST /api/page-views          -> 202
//   GET  /api/admin/summary       (Bearer token when admin_token is set)
//
// CORS is wide open (any origin, method and header) so a browser front end
// on another origin can call every route, pre-flight included.
// =============================================================================

mod error;
mod handlers;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::checker::{CheckPipeline, Probe};
use crate::config::Config;
use crate::store::SqliteStore;

pub use error::ApiError;

/// Everything a handler needs. Cloned per request, so it's all `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CheckPipeline>,
    pub store: Arc<SqliteStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<SqliteStore>, prober: Arc<dyn Probe>) -> Self {
        let pipeline = CheckPipeline::new(prober, store.clone());
        Self {
            pipeline: Arc::new(pipeline),
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route("/api/admin/summary", get(handlers::admin_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/check", post(handlers::check_website))
        .route("/api/check-all", post(handlers::check_all))
        .route("/api/checks/recent", get(handlers::recent_checks))
        .route("/api/checks/domain/:domain", get(handlers::domain_checks))
        .route("/api/page-views", post(handlers::track_page_view))
        .merge(admin)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// Lets the request through when no admin token is configured, or when it
// carries `Authorization: Bearer <admin_token>`
async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented.is_some_and(|token| constant_time_eq(token, expected)) {
        next.run(req).await
    } else {
        ApiError::Unauthorized.into_response()
    }
}

// Compares every byte whatever the first mismatch, so response timing
// says nothing about how much of the token was right
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

/// Serve the API on `bind` until Ctrl+C.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(addr = %listener.local_addr()?, "site-status API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
