// src/checker/http.rs
// =============================================================================
// This module checks if a website is up by making HTTP requests.
//
// Key functionality:
// - Makes an HTTP HEAD request first (lightweight, no body download)
// - Falls back to ONE GET request if HEAD fails (some servers mishandle HEAD)
// - Every attempt has a hard timeout and follows redirects
// - Turns every failure (timeout, DNS, TLS, refused) into a normal "down"
//   outcome instead of an error
//
// Rust concepts:
// - async/await: For network I/O
// - Traits: `Probe` lets the pipeline work with any prober (tests use fakes)
// - Enums: To represent up/down
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::config::ProbeConfig;

// Whether a site answered acceptably
//
// Serialized as "up" / "down" (that's also how it is stored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Up,
    Down,
}

impl SiteStatus {
    /// Any status code below 400 counts as up. Redirects were already followed.
    pub fn from_status_code(code: u16) -> Self {
        if code < 400 {
            SiteStatus::Up
        } else {
            SiteStatus::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Up => "up",
            SiteStatus::Down => "down",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown site status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for SiteStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(SiteStatus::Up),
            "down" => Ok(SiteStatus::Down),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

// The result of probing one URL
//
// Invariant: exactly one of `status_code` / `error_message` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: SiteStatus,
    /// HTTP status of the final response (after redirects)
    pub status_code: Option<u16>,
    /// Why no response was obtained
    pub error_message: Option<String>,
    /// Wall-clock time of the whole probe, fallback included
    pub response_time_ms: u64,
    /// Whether the GET fallback ran
    pub used_fallback: bool,
}

impl ProbeOutcome {
    /// Outcome for a probe that got an HTTP response
    pub fn responded(status_code: u16, response_time_ms: u64, used_fallback: bool) -> Self {
        Self {
            status: SiteStatus::from_status_code(status_code),
            status_code: Some(status_code),
            error_message: None,
            response_time_ms,
            used_fallback,
        }
    }

    /// Outcome for a probe where both attempts failed before any response
    pub fn unreachable(error_message: String, response_time_ms: u64) -> Self {
        Self {
            status: SiteStatus::Down,
            status_code: None,
            error_message: Some(error_message),
            response_time_ms,
            used_fallback: true,
        }
    }
}

/// Anything that can tell us whether a URL is reachable.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probe an already-normalized absolute URL. Never fails: unreachable
    /// targets come back as a `down` outcome.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

// The real prober: HEAD, then GET if HEAD errored
//
// One client is reused for all probes (connection pooling).
// The client-level timeout drops the in-flight request when it fires,
// which closes the underlying connection.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration, max_redirects: usize, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            config.max_redirects,
            &config.user_agent,
        )
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let started = Instant::now();

        // First, try a HEAD request (faster, no body download)
        let (attempt, used_fallback) = match self.client.head(url).send().await {
            Ok(response) => (Ok(response.status()), false),
            Err(head_error) => {
                debug!(%url, error = %head_error, "HEAD probe failed, retrying with GET");
                // The body is never read; dropping the response closes it
                let fallback = self.client.get(url).send().await.map(|response| response.status());
                (fallback, true)
            }
        };

        let response_time_ms = elapsed_ms(started);

        match attempt {
            Ok(status) => ProbeOutcome::responded(status.as_u16(), response_time_ms, used_fallback),
            Err(e) => ProbeOutcome::unreachable(describe_error(&e), response_time_ms),
        }
    }
}

// Milliseconds since `started`, rounded to the nearest integer
fn elapsed_ms(started: Instant) -> u64 {
    (started.elapsed().as_secs_f64() * 1000.0).round() as u64
}

// Turns a reqwest error into a short human-readable message
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
// - etc.
//
// The returned text is never empty.
fn describe_error(error: &reqwest::Error) -> String {
    // Only the causes are inspected: the top-level message embeds the URL,
    // and a host like "dnsimple.com" must not read as a DNS failure
    let causes = cause_chain(error);
    let lowered = causes.to_lowercase();

    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else if lowered.contains("dns") || lowered.contains("failed to lookup address") {
        "Could not resolve hostname".to_string()
    } else if lowered.contains("certificate") || lowered.contains("ssl") || lowered.contains("tls") {
        "SSL certificate error".to_string()
    } else if error.is_connect() {
        "Connection failed".to_string()
    } else if !causes.is_empty() {
        causes
    } else {
        error.to_string()
    }
}

// Joins the messages of every error below `error`, skipping repeats
fn cause_chain(error: &reqwest::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.trim().is_empty() && !parts.iter().any(|part| part.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}
