//! Record store: JSON collection files with atomic replace
//!
//! A collection is one JSON array of [`PaperRecord`] objects. Writes go to a
//! sibling `<file>.tmp` first and are renamed over the target, so an
//! interrupted run never leaves a truncated collection behind.

use crate::record::PaperRecord;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Load a collection that must already exist
pub fn load(path: &Path) -> Result<Vec<PaperRecord>> {
    if !path.is_file() {
        return Err(Error::NotFound(format!(
            "record file {} does not exist",
            path.display()
        )));
    }

    let file = File::open(path)?;
    let records: Vec<PaperRecord> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(path = %path.display(), count = records.len(), "Loaded record collection");
    Ok(records)
}

/// Load a collection, treating a missing file as empty
pub fn load_or_empty(path: &Path) -> Result<Vec<PaperRecord>> {
    if !path.exists() {
        debug!(path = %path.display(), "No existing record file, starting empty");
        return Ok(Vec::new());
    }
    load(path)
}

/// Sibling temporary path used while saving `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the collection to the temporary sibling of `path`
///
/// On failure the temporary file is removed before the error is returned.
/// The target itself is not touched; [`save`] renames the result into place.
pub fn write_temp(path: &Path, records: &[PaperRecord]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    let written = File::create(&tmp)
        .map_err(Error::from)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records).map_err(|source| Error::Json {
                path: tmp.clone(),
                source,
            })?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
            file.sync_all()?;
            Ok(())
        });

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

/// Atomically replace `path` with the given collection
pub fn save(path: &Path, records: &[PaperRecord]) -> Result<()> {
    let tmp = write_temp(path, records)?;

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::Io(e));
    }

    info!(path = %path.display(), count = records.len(), "Saved record collection");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample() -> Vec<PaperRecord> {
        vec![PaperRecord::new(
            "http://arxiv.org/abs/2401.00001v1",
            "Röntgen-grade placement",
            "An abstract",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )]
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let p = Path::new("/data/papers.json");
        assert_eq!(temp_path(p), PathBuf::from("/data/papers.json.tmp"));
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_or_empty_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let records = load_or_empty(&dir.path().join("absent.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_save_writes_pretty_unescaped_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("papers.json");
        save(&path, &sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));
        assert!(text.contains("Röntgen"));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("papers.json");
        save(&path, &sample()).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn test_malformed_file_reports_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"identifier\": ").unwrap();
        assert!(matches!(load(&path).unwrap_err(), Error::Json { .. }));
    }
}
