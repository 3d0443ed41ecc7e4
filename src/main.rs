// src/main.rs
// =============================================================================
// Entry point for the site-status CLI and HTTP service.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging and load the configuration
// 3. Open the database and dispatch to the subcommand handler
// 4. Exit with a proper code (0 = up / success, 1 = site down, 2 = error)
//
// Rust concepts used:
// - async/await: probes and the HTTP server run on tokio
// - Arc<T>: the store and prober are shared between the pipeline and the API
// - match: pattern matching on the subcommand
// =============================================================================

mod analytics;     // src/analytics/ - page views and the admin summary
mod checker;       // src/checker/ - normalize, probe, record, batch
mod cli;           // src/cli.rs - command-line parsing
mod config;        // src/config.rs - TOML config with defaults
mod logging;       // src/logging.rs - tracing subscriber setup
mod server;        // src/server/ - HTTP API
mod store;         // src/store/ - SQLite persistence

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;

use checker::{normalize_url, CheckOutcome, CheckPipeline, HttpProber, SiteStatus, TargetProgress};
use cli::{Cli, Commands};
use config::Config;
use store::{CheckRecord, CheckStore, SqliteStore};

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = success / site up
//   Ok(1) = at least one site down
//   Ok(2) = bad input
//   Err   = unexpected error (also exits 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    // The server logs requests at info; one-shot commands stay quiet
    let level = match cli.command {
        Commands::Serve { .. } => LevelFilter::INFO,
        _ => LevelFilter::WARN,
    };
    logging::init(level);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    match cli.command {
        Commands::Check { url, json } => handle_check(&config, &url, json).await,
        Commands::CheckAll { json } => handle_check_all(&config, json).await,
        Commands::Recent { limit, json } => handle_recent(&config, limit, json),
        Commands::Domain { domain, limit, json } => handle_domain(&config, &domain, limit, json),
        Commands::Summary { json } => handle_summary(&config, json),
        Commands::Serve { bind } => handle_serve(config, bind).await,
        Commands::Config => {
            print!("{}", config);
            Ok(0)
        }
    }
}

fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    Ok(Arc::new(store))
}

fn build_prober(config: &Config) -> Result<Arc<HttpProber>> {
    let prober = HttpProber::from_config(&config.probe).context("Failed to build HTTP client")?;
    Ok(Arc::new(prober))
}

fn build_pipeline(config: &Config) -> Result<CheckPipeline> {
    Ok(CheckPipeline::new(build_prober(config)?, open_store(config)?))
}

// Caller's limit, or the configured default, never above the configured max
fn history_limit(requested: Option<usize>, default: usize, config: &Config) -> usize {
    requested.unwrap_or(default).min(config.history.max_limit)
}

// Handles the 'check' subcommand
async fn handle_check(config: &Config, url: &str, json: bool) -> Result<i32> {
    let pipeline = build_pipeline(config)?;

    if !json {
        println!("🔍 Checking {}", url.trim());
    }

    let outcome = match pipeline.check_website(url).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("❌ {}", e);
            }
            return Ok(2);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    Ok(if outcome.is_up() { 0 } else { 1 })
}

// Handles the 'check-all' subcommand
async fn handle_check_all(config: &Config, json: bool) -> Result<i32> {
    let pipeline = build_pipeline(config)?;
    let targets = &config.batch.targets;

    if !json {
        println!("🌐 Checking {} site(s)...\n", targets.len());
        println!("{:<30} {:<10} {:<8} {:<10} {}", "SITE", "STATUS", "CODE", "TIME", "ERROR");
        println!("{}", "=".repeat(80));
    }

    let state = checker::check_all_with(&pipeline, targets, |entry| {
        if json || entry.progress == TargetProgress::Checking {
            return;
        }
        let status = match entry.progress {
            TargetProgress::Up => "✅ UP",
            _ => "❌ DOWN",
        };
        println!(
            "{:<30} {:<10} {:<8} {:<10} {}",
            entry.target,
            status,
            display_code(entry.status_code),
            entry.response_time_ms.map(|ms| format!("{}ms", ms)).unwrap_or_default(),
            entry.error.as_deref().unwrap_or("")
        );
    })
    .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!();
        println!("📊 Summary:");
        println!("   ✅ Up: {}", state.up_count());
        println!("   ❌ Down: {}", state.down_count());
        println!("   📋 Total: {}", state.targets.len());
    }

    Ok(if state.down_count() > 0 { 1 } else { 0 })
}

// Handles the 'recent' subcommand
fn handle_recent(config: &Config, limit: Option<usize>, json: bool) -> Result<i32> {
    let store = open_store(config)?;
    let limit = history_limit(limit, config.history.recent_limit, config);
    let records = store.recent_checks(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No checks recorded yet");
    } else {
        print_records(&records);
    }

    Ok(0)
}

// Handles the 'domain' subcommand
fn handle_domain(config: &Config, domain: &str, limit: Option<usize>, json: bool) -> Result<i32> {
    let store = open_store(config)?;
    let domain = match normalize_url(domain) {
        Ok(normalized) => normalized.domain,
        Err(e) => {
            eprintln!("❌ {}", e);
            return Ok(2);
        }
    };
    let limit = history_limit(limit, config.history.domain_limit, config);
    let records = store.checks_for_domain(&domain, limit)?;

    if json {
        let body = serde_json::json!({
            "domain": domain,
            "current": records.first(),
            "history": records,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(0);
    }

    match records.first() {
        None => println!("No checks recorded for {}", domain),
        Some(current) => {
            println!(
                "{} is {} (last checked {})\n",
                domain,
                format_status(current.status),
                current.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            print_records(&records);
        }
    }

    Ok(0)
}

// Handles the 'summary' subcommand
fn handle_summary(config: &Config, json: bool) -> Result<i32> {
    let store = open_store(config)?;
    let summary = analytics::build_summary(store.as_ref(), Utc::now(), &config.analytics)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(0);
    }

    let totals = &summary.totals;
    println!("📊 Totals:");
    println!("   Checks: {} ({} today)", totals.total_checks, totals.today_checks);
    println!("   Page views: {} ({} today)", totals.total_page_views, totals.today_page_views);

    println!("\n🌐 Top domains (last {} days):", config.analytics.lookback_days);
    for entry in &summary.top_domains {
        println!("   {:<40} {}", entry.domain, entry.count);
    }

    println!("\n📄 Top pages (last {} days):", config.analytics.lookback_days);
    for entry in &summary.top_pages {
        println!("   {:<40} {}", entry.path, entry.count);
    }

    println!("\n📅 Daily:");
    println!("   {:<12} {:<8} {}", "DATE", "CHECKS", "VIEWS");
    for day in &summary.daily {
        println!("   {:<12} {:<8} {}", day.date, day.checks, day.page_views);
    }

    Ok(0)
}

// Handles the 'serve' subcommand
async fn handle_serve(config: Config, bind: Option<String>) -> Result<i32> {
    let bind = bind.unwrap_or_else(|| config.bind.clone());
    let store = open_store(&config)?;
    let prober = build_prober(&config)?;

    let state = server::AppState::new(config, store, prober);
    server::serve(state, &bind).await?;

    Ok(0)
}

fn print_outcome(outcome: &CheckOutcome) {
    println!();
    println!("   Domain:   {}", outcome.domain);
    println!("   Status:   {}", format_status(outcome.status));
    println!("   Code:     {}", display_code(outcome.status_code));
    println!("   Time:     {}ms", outcome.response_time_ms);
    if let Some(message) = &outcome.error_message {
        println!("   Error:    {}", message);
    }
    if outcome.id.is_none() {
        println!("   ⚠️  Result could not be saved");
    }
}

fn print_records(records: &[CheckRecord]) {
    println!(
        "{:<24} {:<30} {:<10} {:<6} {}",
        "CHECKED AT", "DOMAIN", "STATUS", "CODE", "TIME"
    );
    println!("{}", "=".repeat(80));

    for record in records {
        // Truncate long domains for display
        let domain: String = if record.domain.chars().count() > 27 {
            format!("{}...", record.domain.chars().take(27).collect::<String>())
        } else {
            record.domain.clone()
        };

        println!(
            "{:<24} {:<30} {:<10} {:<6} {}ms",
            record.checked_at.format("%Y-%m-%d %H:%M:%S"),
            domain,
            format_status(record.status),
            display_code(record.status_code),
            record.response_time_ms
        );
    }
}

fn format_status(status: SiteStatus) -> &'static str {
    match status {
        SiteStatus::Up => "✅ UP",
        SiteStatus::Down => "❌ DOWN",
    }
}

fn display_code(code: Option<u16>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}
