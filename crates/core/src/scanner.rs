//! Lists a selected folder into [`FileRecord`]s the way a browser directory
//! picker would: paths relative to the folder's parent, `/`-separated.

use crate::config::ScanConfig;
use crate::models::FileRecord;
use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub fn list_directory(root: &Path, scan: &ScanConfig) -> anyhow::Result<Vec<FileRecord>> {
    let root = fs::canonicalize(root).with_context(|| format!("cannot open {:?}", root))?;
    if !root.is_dir() {
        anyhow::bail!("{:?} is not a directory", root);
    }
    let root_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{:?} has no usable folder name", root))?
        .to_string();
    let exclude_set = build_globset(&scan.exclude)?;

    let mut records = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || should_descend(e.path(), &root, scan.include_hidden, &exclude_set)
        });
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = relative_path(entry.path(), &root) else {
            continue;
        };

        let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
        let mtime_ms = match modified.and_then(epoch_millis) {
            Some(ms) => ms,
            None => {
                warn!(path = %entry.path().display(), "no usable modification time; using the epoch");
                0
            }
        };

        records.push(FileRecord::new(format!("{root_name}/{relative}"), mtime_ms));
    }
    records.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(root = %root.display(), files = records.len(), "listed directory");
    Ok(records)
}

/// Signed milliseconds since the Unix epoch; earlier times are negative.
fn epoch_millis(time: SystemTime) -> Option<i64> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).ok(),
        Err(before) => i64::try_from(before.duration().as_millis())
            .ok()
            .map(|ms| -ms),
    }
}

fn relative_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    match parts {
        Some(parts) if !parts.is_empty() => Some(parts.join("/")),
        Some(_) => None,
        None => {
            warn!(path = %path.display(), "skipping non UTF-8 path");
            None
        }
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid exclude glob {pat:?}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, root: &Path, include_hidden: bool, excludes: &GlobSet) -> bool {
    if !include_hidden && is_hidden(path) {
        return false;
    }
    !is_excluded(path, root, excludes)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_excluded(path: &Path, root: &Path, excludes: &GlobSet) -> bool {
    relative_path(path, root)
        .map(|rel| excludes.is_match(rel))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn lists_files_relative_to_the_folder_parent() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("2024 TRANSFER");
        touch(&root, "05-01/PHOTOS/RAW/a.cr2");
        touch(&root, "05-01/PHOTOS/EDITED/a.jpg");
        touch(&root, "05-02/VIDEOS/b.mp4");

        let records = list_directory(&root, &ScanConfig::default()).unwrap();
        assert_eq!(
            paths(&records),
            vec![
                "2024 TRANSFER/05-01/PHOTOS/EDITED/a.jpg",
                "2024 TRANSFER/05-01/PHOTOS/RAW/a.cr2",
                "2024 TRANSFER/05-02/VIDEOS/b.mp4",
            ]
        );
        assert!(records.iter().all(|r| r.mtime_ms > 0));
    }

    #[test]
    fn skips_hidden_and_excluded_entries() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("2024 TRANSFER");
        touch(&root, "05-01/PHOTOS/a.jpg");
        touch(&root, "05-01/PHOTOS/.DS_Store");
        touch(&root, "05-01/.cache/b.jpg");
        touch(&root, "05-01/PHOTOS/Thumbs.db");

        let records = list_directory(&root, &ScanConfig::default()).unwrap();
        assert_eq!(paths(&records), vec!["2024 TRANSFER/05-01/PHOTOS/a.jpg"]);

        let all = ScanConfig {
            exclude: vec![],
            include_hidden: true,
        };
        assert_eq!(list_directory(&root, &all).unwrap().len(), 4);
    }

    #[test]
    fn modification_times_before_the_epoch_stay_negative() {
        use std::time::Duration;
        assert_eq!(epoch_millis(UNIX_EPOCH + Duration::from_millis(2_500)), Some(2_500));
        assert_eq!(epoch_millis(UNIX_EPOCH - Duration::from_millis(1_500)), Some(-1_500));
        assert_eq!(epoch_millis(UNIX_EPOCH), Some(0));
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(list_directory(&temp.path().join("nope"), &ScanConfig::default()).is_err());
    }
}
