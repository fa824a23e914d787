//! # packzip Core Library
//!
//! Packages an ordered list of files into a single ZIP archive.
//!
//! The pipeline is linear: [`builder::ArchiveBuilder`] validates an
//! [`ArchiveRequest`], [`paths::PathNormalizer`] infers the directory prefix
//! shared by the inputs and derives each entry name, and
//! [`archive::ArchiveWriter`] reads every file, checksums it with
//! [`checksum`], compresses it and streams it out, followed by the central
//! directory.
//!
//! ## Key Modules
//!
//! - [`archive`]: ZIP record layout and the single-pass writer.
//! - [`checksum`]: Table-driven CRC32, streaming and one-shot.
//! - [`paths`]: Base-path inference and entry-name normalization.
//! - [`compress`]: Level clamping and payload encoding (store / DEFLATE).
//! - [`fsx`], [`log`]: The filesystem and logger ports.
//!
//! ## Examples
//!
//! ```no_run
//! use packzip::{ArchiveBuilder, ArchiveRequest};
//!
//! let request = ArchiveRequest::new(
//!     vec!["/srv/site/index.html".into(), "/srv/site/css/main.css".into()],
//!     "/tmp/site.zip",
//! )
//! .with_level(9)
//! .with_comment("site snapshot");
//!
//! // Entries are named `index.html` and `css/main.css`.
//! assert!(ArchiveBuilder::default().build(&request));
//! ```

pub mod archive;
pub mod builder;
pub mod checksum;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod compress;
pub mod error;
pub mod log;
pub mod paths;

// Filesystem port
pub mod fsx;

pub use builder::ArchiveBuilder;
pub use common::{ArchiveEntry, ArchiveReport, ArchiveRequest, SourceFile};
pub use error::{ArchiveError, Result};
