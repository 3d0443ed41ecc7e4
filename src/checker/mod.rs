// src/checker/mod.rs
// =============================================================================
// This module contains the website availability check.
//
// Submodules:
// - normalize: Turns free text into (url, domain)
// - http: Probes a URL (HEAD, then GET as a fallback)
// - pipeline: normalize -> probe -> record, the "check website" operation
// - batch: Runs the pipeline over a list of sites, one after another
//
// This file (mod.rs) is the module root: it declares the errors callers can
// see and re-exports the public API.
// =============================================================================

mod batch;
mod http;
mod normalize;
mod pipeline;

use thiserror::Error;

pub use batch::{check_all, check_all_with, BatchState, TargetProgress};
pub use http::{HttpProber, Probe, ProbeOutcome, SiteStatus};
pub use normalize::{normalize_url, NormalizedUrl};
pub use pipeline::{CheckOutcome, CheckPipeline};

/// Input errors. These are the only errors that stop a check; every
/// network problem becomes a "down" outcome instead.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL format")]
    InvalidUrl { input: String, reason: String },
}
