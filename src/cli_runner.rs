//! CLI runner shared by the `packzip` binary: turns parsed arguments (plus an
//! optional manifest and the environment) into an [`ArchiveRequest`] and
//! hands it to the [`ArchiveBuilder`].

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::SystemTime;

use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use crate::builder::ArchiveBuilder;
use crate::cli::manifest::ArchiveManifest;
use crate::cli::{self, Commands};
use crate::common::{ArchiveRequest, SourceFile, DEFAULT_LEVEL};
use crate::error::{ArchiveError, Result};

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    // A second init (e.g. from an embedding host) is not an error for us.
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

/// Expands directory inputs into the files below them, sorted by name so the
/// archive order does not depend on directory listing order. Files and
/// paths that do not exist are passed through untouched; the writer reports
/// the latter as missing.
pub fn collect_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in inputs {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.clone());
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory loop"));
                ArchiveError::io(io, at)
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

/// Options gathered from the command line, before merging with a manifest.
#[derive(Debug, Default)]
pub struct CreateOptions {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub level: Option<i32>,
    pub flatten: bool,
    pub comment: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub stamp: Option<SystemTime>,
}

/// Merges command-line options over an optional manifest. Command-line
/// values win; `flatten` is on if either side asks for it. The level comes
/// from `--level`, then the manifest, then `PACKZIP_LEVEL`, then the default.
pub fn build_request(
    opts: CreateOptions,
    manifest: Option<ArchiveManifest>,
) -> Result<ArchiveRequest> {
    let manifest = manifest.unwrap_or_default();

    let inputs = if opts.inputs.is_empty() { manifest.files } else { opts.inputs };
    let output = opts
        .output
        .or(manifest.output)
        .ok_or_else(|| {
            ArchiveError::Configuration("an output path is required (--output)".into())
        })?;
    let level = cli::get_level_from_opt_or_env(opts.level.or(manifest.level))?
        .unwrap_or(DEFAULT_LEVEL);

    let files = collect_files(&inputs)?.into_iter().map(SourceFile::from).collect();
    let mut request = ArchiveRequest::new(files, output)
        .with_level(level)
        .with_flatten(opts.flatten || manifest.flatten);
    if let Some(comment) = opts.comment.or(manifest.comment) {
        request = request.with_comment(comment);
    }
    if let Some(base) = opts.base_dir.or(manifest.base_dir) {
        request = request.with_base_path(base);
    }
    if let Some(stamp) = opts.stamp.or(manifest.stamp.map(SystemTime::from)) {
        request = request.with_stamp(stamp);
    }
    Ok(request)
}

/// Public entry for running CLI logic.
pub fn run_cli_app() -> std::result::Result<ExitCode, Box<dyn std::error::Error>> {
    let args = cli::run();
    init_logging(args.verbose);
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    match args.command {
        Commands::Create {
            inputs,
            output,
            level,
            flatten,
            comment,
            base_dir,
            stamp,
            manifest,
        } => {
            let manifest = manifest.as_deref().map(ArchiveManifest::load).transpose()?;
            let opts = CreateOptions {
                inputs,
                output,
                level,
                flatten,
                comment,
                base_dir,
                stamp,
            };
            let request = build_request(opts, manifest)?;

            let Some(report) = ArchiveBuilder::default().run(&request) else {
                return Ok(ExitCode::FAILURE);
            };
            println!(
                "Created {}: {} entries, {} skipped, {} -> {} bytes",
                request.destination().display(),
                report.entries.len(),
                report.skipped.len(),
                report.total_uncompressed(),
                report.total_compressed()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
