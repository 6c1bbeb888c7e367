// Local log archival
// Zips the retrieved .txt logs into `{label}.{YYYYMMDDHHMM}.zip`, then removes them

use crate::errors::{ExtractorError, ExtractorResult};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;

pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub archive_path: PathBuf,
    pub archived: Vec<PathBuf>,
    /// Files that were zipped but could not be removed afterwards
    pub not_removed: Vec<PathBuf>,
}

pub fn archive_name(label: &str, at: DateTime<Local>) -> String {
    format!("{}.{}.zip", label, at.format(ARCHIVE_TIMESTAMP_FORMAT))
}

/// `.txt` files directly under `dir`, sorted by name.
pub fn collect_log_files(dir: &Path) -> ExtractorResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ExtractorError::io(format!("reading {}", dir.display()), e))? {
        let path = entry.map_err(|e| ExtractorError::io("reading directory entry", e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn archive_and_clear(source_dir: &Path, dest_dir: &Path, label: &str) -> ExtractorResult<Option<ArchiveReport>> {
    archive_and_clear_at(source_dir, dest_dir, label, Local::now())
}

/// Returns `None` when there is nothing to archive.
pub fn archive_and_clear_at(
    source_dir: &Path,
    dest_dir: &Path,
    label: &str,
    at: DateTime<Local>,
) -> ExtractorResult<Option<ArchiveReport>> {
    let files = collect_log_files(source_dir)?;
    if files.is_empty() {
        info!(dir = %source_dir.display(), "no log files to archive");
        return Ok(None);
    }

    fs::create_dir_all(dest_dir)
        .map_err(|e| ExtractorError::io(format!("creating {}", dest_dir.display()), e))?;
    let archive_path = dest_dir.join(archive_name(label, at));

    write_archive_or_remove(&archive_path, &files)?;

    let mut not_removed = Vec::new();
    for path in &files {
        if let Err(e) = fs::remove_file(path) {
            warn!(file = %path.display(), error = %e, "could not remove archived log");
            not_removed.push(path.clone());
        }
    }

    info!(archive = %archive_path.display(), count = files.len(), "logs archived");
    Ok(Some(ArchiveReport {
        archive_path,
        archived: files,
        not_removed,
    }))
}

/// A failed write leaves no partial archive behind.
fn write_archive_or_remove(archive_path: &Path, files: &[PathBuf]) -> ExtractorResult<()> {
    let result = write_archive(archive_path, files);
    if result.is_err() && archive_path.exists() {
        if let Err(e) = fs::remove_file(archive_path) {
            warn!(archive = %archive_path.display(), error = %e, "could not remove partial archive");
        }
    }
    result
}

fn write_archive(archive_path: &Path, files: &[PathBuf]) -> ExtractorResult<()> {
    let file = File::create(archive_path)
        .map_err(|e| ExtractorError::io(format!("creating {}", archive_path.display()), e))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ExtractorError::io("archiving", std::io::Error::other("file without a name")))?;
        let content = fs::read(path).map_err(|e| ExtractorError::io(format!("reading {}", path.display()), e))?;

        zip.start_file(name.as_str(), options)
            .map_err(|e| ExtractorError::archive(format!("adding {name}"), e))?;
        zip.write_all(&content)
            .map_err(|e| ExtractorError::io(format!("writing {name} into zip"), e))?;
        debug!(file = %name, "archived");
    }

    zip.finish()
        .map_err(|e| ExtractorError::archive("finalizing zip", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn archive_name_uses_minute_precision() {
        let at = Local.with_ymd_and_hms(2020, 8, 1, 9, 7, 59).unwrap();
        assert_eq!(archive_name("debug@example.com", at), "debug@example.com.202008010907.zip");
    }

    #[test]
    fn archives_only_text_files_and_removes_them() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(src.path().join("20200801-100405-07L1.txt"), "log one").unwrap();
        fs::write(src.path().join("20200801-090000-07L2.txt"), "log two").unwrap();
        fs::write(src.path().join("apex-logids.csv"), "Id\n07L1\n").unwrap();

        let at = Local.with_ymd_and_hms(2020, 8, 1, 10, 30, 0).unwrap();
        let report = archive_and_clear_at(src.path(), dest.path(), "debug", at)
            .unwrap()
            .unwrap();

        assert_eq!(report.archive_path, dest.path().join("debug.202008011030.zip"));
        assert_eq!(report.archived.len(), 2);
        assert!(report.not_removed.is_empty());
        assert!(report.archive_path.exists());
        assert!(!src.path().join("20200801-100405-07L1.txt").exists());
        assert!(src.path().join("apex-logids.csv").exists());

        let reader = zip::ZipArchive::new(File::open(&report.archive_path).unwrap()).unwrap();
        let mut names: Vec<_> = reader.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["20200801-090000-07L2.txt", "20200801-100405-07L1.txt"]);
    }

    #[test]
    fn failed_write_removes_partial_archive() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let present = src.path().join("20200801-100405-07L1.txt");
        fs::write(&present, "log one").unwrap();
        let vanished = src.path().join("20200801-110000-07L9.txt");
        let archive_path = dest.path().join("debug.202008011030.zip");

        let err = write_archive_or_remove(&archive_path, &[present.clone(), vanished]).unwrap_err();

        assert!(matches!(err, ExtractorError::Io { .. }));
        assert!(!archive_path.exists());
        assert!(present.exists());
    }

    #[test]
    fn empty_directory_produces_no_archive() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        assert!(archive_and_clear(src.path(), dest.path(), "debug").unwrap().is_none());
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}
