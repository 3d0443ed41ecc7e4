// src/config.rs
// =============================================================================
// Runtime configuration.
//
// Everything has a default, so the config file is optional. When given with
// --config, a TOML file overrides whichever fields it sets:
//
//   database_path = "site-status.db"
//   bind = "0.0.0.0:8080"
//   admin_token = "change-me"
//
//   [probe]
//   timeout_secs = 10
//
//   [batch]
//   targets = ["example.com", "rust-lang.org"]
//
// Command-line flags (--database, --bind) win over the file.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind: String,
    /// Bearer token required on /api/admin/* (open when unset)
    pub admin_token: Option<String>,
    pub probe: ProbeConfig,
    pub history: HistoryConfig,
    pub analytics: AnalyticsConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hard limit for each attempt (HEAD, then GET)
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub recent_limit: usize,
    pub domain_limit: usize,
    /// Upper bound for a caller-supplied ?limit=
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Days in the zero-filled daily series, today included
    pub window_days: u32,
    /// How far back top domains / top pages look
    pub lookback_days: u32,
    /// Most recent rows read for the top lists and the daily series
    pub row_cap: usize,
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub targets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("site-status.db"),
            bind: "127.0.0.1:8080".to_string(),
            admin_token: None,
            probe: ProbeConfig::default(),
            history: HistoryConfig::default(),
            analytics: AnalyticsConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_redirects: 10,
            user_agent: concat!("site-status/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_limit: 20,
            domain_limit: 10,
            max_limit: 100,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            lookback_days: 30,
            row_cap: 1000,
            top_n: 10,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        let targets = [
            "facebook.com",
            "youtube.com",
            "instagram.com",
            "twitter.com",
            "whatsapp.com",
            "tiktok.com",
            "reddit.com",
            "netflix.com",
            "amazon.com",
            "google.com",
        ];
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or use the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_title = |f: &mut fmt::Formatter<'_>, label: &str| writeln!(f, "  {}", label);
        let write_value = |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
            writeln!(f, "    {}: {}", label, value)
        };

        writeln!(f, "Current configuration:")?;
        write_title(f, "Service")?;
        write_value(f, "Database", &self.database_path.display())?;
        write_value(f, "Bind address", &self.bind)?;
        write_value(
            f,
            "Admin token",
            &if self.admin_token.is_some() { "set" } else { "not set" },
        )?;
        write_title(f, "Probe")?;
        write_value(f, "Timeout (s)", &self.probe.timeout_secs)?;
        write_value(f, "Max redirects", &self.probe.max_redirects)?;
        write_value(f, "User agent", &self.probe.user_agent)?;
        write_title(f, "History")?;
        write_value(f, "Recent limit", &self.history.recent_limit)?;
        write_value(f, "Domain limit", &self.history.domain_limit)?;
        write_value(f, "Max limit", &self.history.max_limit)?;
        write_title(f, "Analytics")?;
        write_value(f, "Window (days)", &self.analytics.window_days)?;
        write_value(f, "Lookback (days)", &self.analytics.lookback_days)?;
        write_value(f, "Row cap", &self.analytics.row_cap)?;
        write_value(f, "Top N", &self.analytics.top_n)?;
        write_title(f, "Batch")?;
        write_value(f, "Targets", &self.batch.targets.join(", "))?;

        Ok(())
    }
}
