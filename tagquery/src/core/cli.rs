use clap::{Parser, Subcommand};

use std::path::PathBuf;

use crate::filter::LikeMode;
use crate::sql::Dialect;

use super::constants::{ENV_CONFIG, ENV_DIALECT, ENV_LIKE_MODE, ENV_MAX_DEPTH, MAX_DEPTH_LIMIT};

#[derive(Parser)]
#[command(name = "tagquery")]
#[command(
    version,
    about = "Compile tagged JSON filters to SQL or document queries",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Maximum filter nesting depth (top level is 0)
    #[arg(long, global = true, env = ENV_MAX_DEPTH, value_parser = parse_max_depth)]
    pub max_depth: Option<usize>,

    /// How $like$/$text$ operands are used (raw or contains)
    #[arg(long, global = true, env = ENV_LIKE_MODE, value_parser = parse_like_mode)]
    pub like_mode: Option<LikeMode>,

    /// Keep field name case instead of lowercasing
    #[arg(long, global = true)]
    pub keep_case: bool,
}

/// Parse SQL dialect from CLI/env string
fn parse_dialect(s: &str) -> Result<Dialect, String> {
    s.parse()
}

/// Parse LIKE mode from CLI/env string
fn parse_like_mode(s: &str) -> Result<LikeMode, String> {
    s.parse()
}

/// Parse and bound the nesting depth
fn parse_max_depth(s: &str) -> Result<usize, String> {
    let depth: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid max depth '{}'. Expected a number", s))?;
    if depth > MAX_DEPTH_LIMIT {
        return Err(format!(
            "Max depth {} is too large. Maximum is {}",
            depth, MAX_DEPTH_LIMIT
        ));
    }
    Ok(depth)
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Compile a filter to a SQL WHERE fragment
    Sql {
        /// SQL dialect (postgres, mysql, sqlite, mssql)
        #[arg(long, short, env = ENV_DIALECT, value_parser = parse_dialect)]
        dialect: Option<Dialect>,

        /// Number of values already bound before this clause
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Sort keys such as "-createTime,status"
        #[arg(long)]
        order_by: Option<String>,

        /// Filter JSON file (reads stdin when omitted or "-")
        input: Option<PathBuf>,
    },
    /// Compile a filter to a document-store query
    Document {
        /// Filter JSON file (reads stdin when omitted or "-")
        input: Option<PathBuf>,
    },
    /// Prune a filter with allow/deny lists and defaults
    Sanitize {
        /// Fields to keep (comma-separated or JSON array)
        #[arg(long)]
        allow: Option<String>,

        /// Fields to remove at any depth (comma-separated or JSON array)
        #[arg(long)]
        deny: Option<String>,

        /// JSON object of top-level values to force
        #[arg(long)]
        defaults: Option<String>,

        /// Filter JSON file (reads stdin when omitted or "-")
        input: Option<PathBuf>,
    },
    /// Compile an update map to a SET list and a document update
    Update {
        /// SQL dialect (postgres, mysql, sqlite, mssql)
        #[arg(long, short, env = ENV_DIALECT, value_parser = parse_dialect)]
        dialect: Option<Dialect>,

        /// Update JSON file (reads stdin when omitted or "-")
        input: Option<PathBuf>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub max_depth: Option<usize>,
    pub like_mode: Option<LikeMode>,
    pub keep_case: bool,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        max_depth: cli.max_depth,
        like_mode: cli.like_mode,
        keep_case: cli.keep_case,
    };
    (config, cli.command)
}
