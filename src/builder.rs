//! # Archive Builder
//!
//! Entry point for creating an archive from an [`ArchiveRequest`]:
//! validate, resolve entry names, write, finalize. Recoverable problems
//! (missing sources) surface as warnings through the [`Logger`]; fatal ones
//! are logged once as an error and turned into a failed result, never a panic.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveWriter, ResolvedSource};
use crate::common::{ArchiveReport, ArchiveRequest, SourceFile};
use crate::error::{ArchiveError, Result};
use crate::fsx::{FileSystem, OsFileSystem};
use crate::log::{Logger, TracingLogger};
use crate::paths::PathNormalizer;

/// Orchestrates path normalization and archive writing for one request at a
/// time. Holds only borrowed ports, so it is cheap to construct per call.
pub struct ArchiveBuilder<'a> {
    fs: &'a dyn FileSystem,
    log: &'a dyn Logger,
}

impl Default for ArchiveBuilder<'static> {
    /// Real filesystem, messages to `tracing`.
    fn default() -> Self {
        ArchiveBuilder {
            fs: &OsFileSystem,
            log: &TracingLogger,
        }
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ArchiveError::io(e, "."))?;
    Ok(cwd.join(path))
}

/// True when both paths name the same file. Paths that cannot be resolved
/// (typically because they do not exist yet) are compared as given.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Makes sure the destination's directory exists and can take a new file.
/// Runs before the destination itself is opened.
fn prepare_destination(destination: &Path) -> Result<()> {
    if destination.as_os_str().is_empty() {
        return Err(ArchiveError::Configuration("no destination path given".into()));
    }
    if destination.is_dir() {
        return Err(ArchiveError::Configuration(format!(
            "destination '{}' is a directory",
            destination.display()
        )));
    }
    let Some(dir) = destination.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(dir).map_err(|e| {
        ArchiveError::Configuration(format!(
            "cannot create destination directory '{}': {}",
            dir.display(),
            e
        ))
    })?;
    let meta = fs::metadata(dir).map_err(|e| {
        ArchiveError::Configuration(format!(
            "cannot inspect destination directory '{}': {}",
            dir.display(),
            e
        ))
    })?;
    if meta.permissions().readonly() {
        return Err(ArchiveError::Configuration(format!(
            "destination directory '{}' is read-only",
            dir.display()
        )));
    }
    Ok(())
}

impl<'a> ArchiveBuilder<'a> {
    /// A builder over custom ports, e.g. an in-memory filesystem and a
    /// recording logger.
    pub fn with_ports(fs: &'a dyn FileSystem, log: &'a dyn Logger) -> Self {
        Self { fs, log }
    }

    /// Builds the archive and reports only whether it succeeded. Skipped
    /// files do not count as failure.
    pub fn build(&self, request: &ArchiveRequest) -> bool {
        self.run(request).is_some()
    }

    /// Like [`build`](Self::build) but hands back the report on success.
    /// Errors have already been logged when `None` is returned.
    pub fn run(&self, request: &ArchiveRequest) -> Option<ArchiveReport> {
        match self.try_build(request) {
            Ok(report) => Some(report),
            Err(e) => {
                self.log.error(&format!(
                    "Failed to create archive '{}': {}",
                    request.destination().display(),
                    e
                ));
                None
            }
        }
    }

    /// Builds the archive, returning the first fatal error.
    ///
    /// Configuration problems are detected before the destination file is
    /// opened, so an existing file at that path is left untouched.
    pub fn try_build(&self, request: &ArchiveRequest) -> Result<ArchiveReport> {
        if request.files().is_empty() {
            return Err(ArchiveError::Configuration("no source files given".into()));
        }
        if request.comment().map_or(0, str::len) > u16::MAX as usize {
            return Err(ArchiveError::Configuration(
                "archive comment longer than 65535 bytes".into(),
            ));
        }

        let destination = request.destination();
        let target = absolutize(destination)?;

        // An archive written into one of its own input directories must not
        // be packed into itself on the next run.
        let (files, own_output): (Vec<SourceFile>, Vec<SourceFile>) = request
            .files()
            .iter()
            .map(|f| absolutize(f.path()).map(SourceFile::from))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .partition(|f| !same_file(f.path(), &target));
        for f in &own_output {
            self.log.warn(&format!(
                "Skipping '{}': it is the archive being written",
                f.path().display()
            ));
        }

        let base_override = request.base_path().map(absolutize).transpose()?;
        let normalizer =
            PathNormalizer::resolve(&files, request.flatten(), base_override.as_deref())?;

        let sources: Vec<ResolvedSource> = files
            .iter()
            .map(|f| ResolvedSource {
                path: f.path().to_path_buf(),
                name: normalizer.entry_name(f.path()),
            })
            .collect();

        prepare_destination(destination)?;
        let output = File::create(destination).map_err(|e| ArchiveError::io(e, destination))?;

        tracing::debug!(
            destination = %destination.display(),
            files = sources.len(),
            level = request.level(),
            algo = request.algo().name(),
            "writing archive"
        );

        let mut writer = ArchiveWriter::new(output, request.algo()).with_destination(destination);
        let mut report = writer.write_sources(self.fs, self.log, &sources, request.stamp())?;
        report.skipped.extend(own_output.iter().map(|f| f.path().to_path_buf()));
        let output = writer.finish(request.comment())?;
        output.sync_all().map_err(|e| ArchiveError::io(e, destination))?;

        self.log.info(&format!(
            "Created '{}' with {} entries ({} skipped)",
            destination.display(),
            report.entries.len(),
            report.skipped.len()
        ));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsx::MemoryFileSystem;
    use crate::log::{Level, RecordingLogger};
    use std::io::Read;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tempfile::tempdir;

    const THREE: [&str; 3] = ["/a/b/c/f1.txt", "/a/b/d/f2.txt", "/a/b/c/f3.txt"];

    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn memory_fs(paths: &[&str]) -> MemoryFileSystem {
        let fs = MemoryFileSystem::new();
        for p in paths {
            fs.insert(*p, format!("contents of {p}\n").repeat(20).into_bytes(), t0());
        }
        fs
    }

    fn request(paths: &[&str], dest: &Path) -> ArchiveRequest {
        ArchiveRequest::new(paths.iter().map(|p| SourceFile::from(*p)).collect(), dest)
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let file = File::open(path).expect("open archive");
        let mut archive = zip::ZipArchive::new(file).expect("valid zip");
        (0..archive.len()).map(|i| archive.by_index(i).expect("entry").name().to_string()).collect()
    }

    #[test]
    fn names_are_relative_to_inferred_base() -> Result<()> {
        let dir = tempdir().map_err(ArchiveError::from)?;
        let dest = dir.path().join("out.zip");
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();

        let report = ArchiveBuilder::with_ports(&fs, &log).try_build(&request(&THREE, &dest))?;
        assert_eq!(report.entries.len(), 3);
        assert_eq!(entry_names(&dest), vec!["c/f1.txt", "d/f2.txt", "c/f3.txt"]);

        // One info per file, plus the summary line.
        assert_eq!(log.messages(Level::Info).len(), 4);
        assert!(log.messages(Level::Warn).is_empty());
        Ok(())
    }

    #[test]
    fn flatten_names_by_file_only() {
        let dir = tempdir().expect("tempdir");
        let dest = dir.path().join("flat.zip");
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();

        let builder = ArchiveBuilder::with_ports(&fs, &log);
        assert!(builder.build(&request(&THREE, &dest).with_flatten(true)));
        assert_eq!(entry_names(&dest), vec!["f1.txt", "f2.txt", "f3.txt"]);
    }

    #[test]
    fn missing_file_is_tolerated() {
        let dir = tempdir().expect("tempdir");
        let dest = dir.path().join("partial.zip");
        let fs = memory_fs(&["/a/b/c/f1.txt", "/a/b/c/f3.txt"]);
        let log = RecordingLogger::new();

        assert!(ArchiveBuilder::with_ports(&fs, &log).build(&request(&THREE, &dest)));

        let warnings = log.messages(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("/a/b/d/f2.txt"));
        assert!(log.messages(Level::Error).is_empty());
        assert_eq!(entry_names(&dest), vec!["c/f1.txt", "c/f3.txt"]);
    }

    #[test]
    fn all_files_missing_still_succeeds() {
        let dir = tempdir().expect("tempdir");
        let dest = dir.path().join("empty.zip");
        let fs = MemoryFileSystem::new();
        let log = RecordingLogger::new();

        let report = ArchiveBuilder::with_ports(&fs, &log)
            .run(&request(&THREE, &dest))
            .expect("success");
        assert!(report.entries.is_empty());
        assert_eq!(report.skipped.len(), 3);
        assert!(entry_names(&dest).is_empty());
    }

    #[test]
    fn empty_input_fails_and_leaves_destination_alone() -> std::io::Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("existing.zip");
        std::fs::write(&dest, b"previous contents")?;
        let fs = MemoryFileSystem::new();
        let log = RecordingLogger::new();

        assert!(!ArchiveBuilder::with_ports(&fs, &log).build(&request(&[], &dest)));

        let errors = log.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Configuration error"));
        assert_eq!(std::fs::read(&dest)?, b"previous contents");

        let fresh = dir.path().join("never.zip");
        assert!(!ArchiveBuilder::with_ports(&fs, &log).build(&request(&[], &fresh)));
        assert!(!fresh.exists());
        Ok(())
    }

    #[test]
    fn destination_directory_is_created() {
        let dir = tempdir().expect("tempdir");
        let dest = dir.path().join("nested/deeper/out.zip");
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();

        assert!(ArchiveBuilder::with_ports(&fs, &log).build(&request(&THREE, &dest)));
        assert!(dest.is_file());
    }

    #[test]
    fn destination_listed_as_input_is_not_packed() -> std::io::Result<()> {
        let dir = tempdir()?;
        let input = dir.path().join("a.txt");
        let dest = dir.path().join("out.zip");
        std::fs::write(&input, b"data")?;
        std::fs::write(&dest, b"archive from an earlier run")?;
        let log = RecordingLogger::new();

        let files = vec![SourceFile::from(input.as_path()), SourceFile::from(dest.as_path())];
        let report = ArchiveBuilder::with_ports(&OsFileSystem, &log)
            .run(&ArchiveRequest::new(files, &dest))
            .expect("success");

        assert_eq!(entry_names(&dest), vec!["a.txt"]);
        assert_eq!(report.skipped, vec![dest.clone()]);
        let warnings = log.messages(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("out.zip"));
        Ok(())
    }

    #[test]
    fn destination_as_only_input_fails_and_leaves_it_alone() -> std::io::Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("out.zip");
        std::fs::write(&dest, b"archive from an earlier run")?;
        let log = RecordingLogger::new();

        let request = ArchiveRequest::new(vec![SourceFile::from(dest.as_path())], &dest);
        assert!(!ArchiveBuilder::with_ports(&OsFileSystem, &log).build(&request));
        assert_eq!(std::fs::read(&dest)?, b"archive from an earlier run");
        Ok(())
    }

    #[test]
    fn destination_that_is_a_directory_fails() {
        let dir = tempdir().expect("tempdir");
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();

        let err = ArchiveBuilder::with_ports(&fs, &log)
            .try_build(&request(&THREE, dir.path()))
            .expect_err("directory destination");
        assert!(matches!(err, ArchiveError::Configuration(_)));
    }

    #[test]
    fn level_is_clamped_at_both_ends() -> std::io::Result<()> {
        let dir = tempdir()?;
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();
        let builder = ArchiveBuilder::with_ports(&fs, &log);

        let mut outputs = Vec::new();
        for (name, level) in [("neg.zip", -5), ("zero.zip", 0), ("huge.zip", 99), ("nine.zip", 9)] {
            let dest = dir.path().join(name);
            assert!(builder.build(&request(&THREE, &dest).with_level(level)));
            outputs.push(std::fs::read(&dest)?);
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[2], outputs[3]);
        assert!(outputs[3].len() < outputs[1].len());
        Ok(())
    }

    #[test]
    fn repeated_runs_are_identical() -> std::io::Result<()> {
        let dir = tempdir()?;
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();
        let builder = ArchiveBuilder::with_ports(&fs, &log);

        let first = dir.path().join("one.zip");
        let second = dir.path().join("two.zip");
        assert!(builder.build(&request(&THREE, &first).with_comment("nightly")));
        assert!(builder.build(&request(&THREE, &second).with_comment("nightly")));
        assert_eq!(std::fs::read(&first)?, std::fs::read(&second)?);
        Ok(())
    }

    #[test]
    fn round_trip_content_and_comment() -> std::io::Result<()> {
        let dir = tempdir()?;
        let dest = dir.path().join("rt.zip");
        let fs = memory_fs(&THREE);
        let log = RecordingLogger::new();

        let builder = ArchiveBuilder::with_ports(&fs, &log);
        assert!(builder.build(&request(&THREE, &dest).with_comment("release 1.2")));

        let mut archive = zip::ZipArchive::new(File::open(&dest)?).expect("valid zip");
        assert_eq!(archive.comment(), b"release 1.2");
        for (i, path) in THREE.iter().enumerate() {
            let mut entry = archive.by_index(i).expect("entry");
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            assert_eq!(content, fs.read(Path::new(path))?);
        }
        Ok(())
    }
}
