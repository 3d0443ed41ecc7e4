// src/checker/normalize.rs
// =============================================================================
// This module turns whatever the visitor typed into something we can probe.
//
// Rules:
// 1. Trim whitespace; an empty string is rejected before anything else
// 2. No "http://" or "https://" prefix? Prepend "https://"
// 3. Parse with the `url` crate; anything unparseable (or host-less) is rejected
// 4. The domain is the parsed host with ONE leading "www." removed
//
// Internationalized hosts come out of the parser in punycode ("bücher.de"
// becomes "xn--bcher-kva.de"), so lookups must go through `normalize_url` too.
//
// No network access happens here.
// =============================================================================

use url::Url;

use super::CheckError;

/// A URL that passed validation, plus the domain used to group its history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// The trimmed input with a scheme guaranteed
    pub url: String,
    /// Lower-cased host without a leading "www."
    pub domain: String,
}

// Normalizes free-text input into an absolute URL and its domain
//
// Examples:
//   "google.com"           -> ("https://google.com", "google.com")
//   "www.example.com/docs" -> ("https://www.example.com/docs", "example.com")
//   "http://Example.COM"   -> ("http://Example.COM", "example.com")
pub fn normalize_url(input: &str) -> Result<NormalizedUrl, CheckError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CheckError::MissingUrl);
    }

    let url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&url).map_err(|e| CheckError::InvalidUrl {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| CheckError::InvalidUrl {
            input: trimmed.to_string(),
            reason: "URL has no host".to_string(),
        })?;

    Ok(NormalizedUrl {
        domain: canonical_domain(host),
        url,
    })
}

// Lower-cases a parsed host and strips exactly one leading "www."
//
// A bare "www." stays as-is so we never return an empty domain.
fn canonical_domain(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}
