//! Archives built from real files must extract, with a standard ZIP reader,
//! to byte-identical content under the resolved names.

use packzip::log::{Level, RecordingLogger};
use packzip::fsx::OsFileSystem;
use packzip::{checksum, ArchiveBuilder, ArchiveRequest, SourceFile};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

// ---------- helpers ----------
fn create_tree(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let specs: [(&str, Vec<u8>); 4] = [
        ("proj/src/main.rs", b"fn main() { println!(\"hi\"); }\n".repeat(40)),
        ("proj/src/util/mod.rs", b"pub fn noop() {}\n".repeat(10)),
        ("proj/docs/readme.md", b"# readme\n".to_vec()),
        (
            "proj/assets/blob.bin",
            (0..65_536u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 11) as u8).collect(),
        ),
    ];
    let mut paths = Vec::new();
    for (rel, data) in specs {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(&path, data)?;
        paths.push(path);
    }
    Ok(paths)
}

fn read_all(archive: &mut zip::ZipArchive<File>) -> Vec<(String, u32, Vec<u8>)> {
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), entry.crc32(), data)
        })
        .collect()
}

fn sources(paths: &[PathBuf]) -> Vec<SourceFile> {
    paths.iter().cloned().map(SourceFile::from).collect()
}

#[test]
fn roundtrip_all_levels() {
    let src = tempdir().unwrap();
    let paths = create_tree(src.path()).unwrap();
    let out = tempdir().unwrap();

    for level in [0, 1, 6, 9] {
        let dest = out.path().join(format!("level{}.zip", level));
        let request = ArchiveRequest::new(sources(&paths), &dest).with_level(level);
        assert!(ArchiveBuilder::default().build(&request), "level {} failed", level);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let entries = read_all(&mut archive);
        let names: Vec<_> = entries.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["src/main.rs", "src/util/mod.rs", "docs/readme.md", "assets/blob.bin"]
        );

        for ((_, crc, data), path) in entries.iter().zip(&paths) {
            let original = fs::read(path).unwrap();
            assert_eq!(data, &original);
            assert_eq!(*crc, checksum::compute(&original));
        }
    }
}

#[test]
fn deterministic_metadata_across_runs() {
    let src = tempdir().unwrap();
    let paths = create_tree(src.path()).unwrap();
    let out = tempdir().unwrap();
    let stamp = UNIX_EPOCH + Duration::from_secs(1_704_067_200);

    let mut runs = Vec::new();
    for name in ["a.zip", "b.zip"] {
        let dest = out.path().join(name);
        let request = ArchiveRequest::new(sources(&paths), &dest).with_level(6).with_stamp(stamp);
        let report = ArchiveBuilder::default().run(&request).expect("build");
        let summary: Vec<_> = report
            .entries
            .iter()
            .map(|e| (e.name.clone(), e.uncompressed_size, e.crc32))
            .collect();
        runs.push((summary, fs::read(&dest).unwrap()));
    }
    assert_eq!(runs[0].0, runs[1].0);
    // Same compressor and uniform stamp: the bytes match too.
    assert_eq!(runs[0].1, runs[1].1);
}

#[test]
fn missing_file_yields_one_warning() {
    let src = tempdir().unwrap();
    let mut paths = create_tree(src.path()).unwrap();
    paths.truncate(3);
    fs::remove_file(&paths[1]).unwrap();

    let dest = src.path().join("partial.zip");
    let log = RecordingLogger::new();
    let request = ArchiveRequest::new(sources(&paths), &dest);
    assert!(ArchiveBuilder::with_ports(&OsFileSystem, &log).build(&request));

    let warnings = log.messages(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("mod.rs"));

    let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
    let names: Vec<_> = read_all(&mut archive).into_iter().map(|(n, _, _)| n).collect();
    assert_eq!(names, vec!["src/main.rs", "docs/readme.md"]);
}

#[test]
fn base_override_and_flatten() {
    let src = tempdir().unwrap();
    let paths = create_tree(src.path()).unwrap();

    let dest = src.path().join("based.zip");
    let request = ArchiveRequest::new(sources(&paths[..2]), &dest).with_base_path(src.path());
    assert!(ArchiveBuilder::default().build(&request));
    let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
    let names: Vec<_> = read_all(&mut archive).into_iter().map(|(n, _, _)| n).collect();
    assert_eq!(names, vec!["proj/src/main.rs", "proj/src/util/mod.rs"]);

    let dest = src.path().join("flat.zip");
    let request = ArchiveRequest::new(sources(&paths), &dest).with_flatten(true);
    assert!(ArchiveBuilder::default().build(&request));
    let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
    let names: Vec<_> = read_all(&mut archive).into_iter().map(|(n, _, _)| n).collect();
    assert_eq!(names, vec!["main.rs", "mod.rs", "readme.md", "blob.bin"]);
}
