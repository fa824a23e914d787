pub mod manifest;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::DateTime;

use crate::error::ArchiveError;

/// Environment variable consulted when `--level` is not given.
pub const LEVEL_ENV: &str = "PACKZIP_LEVEL";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create a ZIP archive from files and directories.
    #[command(alias = "c")]
    Create {
        /// Files or directories to add. Directories are walked recursively.
        inputs: Vec<PathBuf>,

        /// The path for the output archive file (e.g., release.zip).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level (0-9). 0 stores files uncompressed; out-of-range values are clamped.
        #[arg(long, allow_negative_numbers = true)]
        level: Option<i32>,

        /// Store every file under its file name only, discarding directories.
        #[arg(long)]
        flatten: bool,

        /// Archive comment written to the end record.
        #[arg(long)]
        comment: Option<String>,

        /// Directory to strip from entry names instead of the inferred common prefix.
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Timestamp applied to every entry (RFC 3339, e.g. 2024-01-01T00:00:00Z).
        #[arg(long, value_parser = parse_stamp)]
        stamp: Option<SystemTime>,

        /// JSON manifest describing the request. Command-line flags override its
        /// fields; its "level" overrides PACKZIP_LEVEL.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

/// Parses an RFC 3339 timestamp.
pub fn parse_stamp(s: &str) -> Result<SystemTime, String> {
    DateTime::parse_from_rfc3339(s)
        .map(SystemTime::from)
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", s, e))
}

/// Gets the compression level from an explicit setting or the `PACKZIP_LEVEL`
/// environment variable.
///
/// Priority:
/// 1. `level_opt` (`--level`, or the manifest's `level` when the flag is absent).
/// 2. `PACKZIP_LEVEL` environment variable.
/// 3. Returns `Ok(None)` if neither is present, leaving the default to the caller.
pub fn get_level_from_opt_or_env(level_opt: Option<i32>) -> Result<Option<i32>, ArchiveError> {
    if let Some(level) = level_opt {
        return Ok(Some(level));
    }
    match std::env::var(LEVEL_ENV) {
        Ok(raw) => raw
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|e| {
                ArchiveError::Configuration(format!(
                    "{}='{}' is not an integer: {}",
                    LEVEL_ENV, raw, e
                ))
            }),
        Err(_) => Ok(None),
    }
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Args {
    Args::parse()
}
