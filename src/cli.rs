// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Every subcommand shares two global flags:
//   --config <PATH>    optional TOML file (see src/config.rs)
//   --database <PATH>  SQLite file, overrides `database_path` from the config
//
// Rust concepts:
// - Derive macros: clap generates the parser from these types
// - Option<T>: flags the user may leave out
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "site-status",
    version,
    about = "Check whether websites are up and keep a history of the results",
    long_about = "site-status probes a website (HEAD, falling back to GET), records the outcome \
                  in a local SQLite database, and serves the same operations over HTTP."
)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check one website and record the result
    ///
    /// Example: site-status check example.com
    ///
    /// Exits 0 when the site is up, 1 when it's down, 2 on bad input or error.
    Check {
        /// URL or bare domain (https:// is assumed when no scheme is given)
        url: String,

        /// Output the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check every configured target, one after another
    CheckAll {
        /// Output the final batch state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent checks across all sites
    Recent {
        /// How many checks to show (default from config, 20)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show the check history for one domain
    ///
    /// Example: site-status domain www.example.com
    Domain {
        /// Domain to look up (case and a leading www. are ignored)
        domain: String,

        /// How many checks to show (default from config, 10)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Print the admin summary: totals, top domains and pages, daily counts
    Summary {
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "site-status",
            "recent",
            "--limit",
            "5",
            "--database",
            "/tmp/checks.db",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("/tmp/checks.db")));
        match cli.command {
            Commands::Recent { limit, json } => {
                assert_eq!(limit, Some(5));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_all_is_kebab_case() {
        let cli = Cli::try_parse_from(["site-status", "check-all", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckAll { json: true }));
    }
}
