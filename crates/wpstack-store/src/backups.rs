//! Backup file naming, listing, validation, and restore path resolution.
//!
//! Backups are `backup-<YYYYMMDD>-<HHMMSS>.sql.gz` files (UTC) in the
//! project's backups directory. A backup is only valid when it is non-empty.

use crate::layout::ProjectLayout;
use crate::StoreError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use wpstack_schema::descriptor::dirs;

pub const BACKUP_PREFIX: &str = "backup-";
pub const BACKUP_SUFFIX: &str = ".sql.gz";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BackupRecord {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// RFC 3339 timestamp decoded from the file name, when it follows the naming scheme.
    pub created_at: Option<String>,
}

pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{BACKUP_PREFIX}{}{BACKUP_SUFFIX}", at.format(TIMESTAMP_FORMAT))
}

pub fn parse_backup_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    let stamp = file_name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn is_compressed(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn is_dump_file(name: &str) -> bool {
    name.ends_with(".sql") || name.ends_with(".sql.gz")
}

/// Size of a finished backup, rejecting missing and zero-byte files.
pub fn validate_backup(path: &Path) -> Result<u64, StoreError> {
    let meta = fs::metadata(path).map_err(|_| StoreError::BackupNotFound {
        input: path.display().to_string(),
        tried: vec![path.to_path_buf()],
    })?;
    if meta.len() == 0 {
        return Err(StoreError::EmptyBackup(path.to_path_buf()));
    }
    Ok(meta.len())
}

pub fn record_for(path: &Path) -> Result<BackupRecord, StoreError> {
    let size_bytes = validate_backup(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let created_at = parse_backup_timestamp(&file_name).map(|t| t.to_rfc3339());
    Ok(BackupRecord {
        file_name,
        path: path.to_path_buf(),
        size_bytes,
        created_at,
    })
}

/// All dump files in the backups directory, newest first. Zero-byte files are skipped.
pub fn list_backups(layout: &ProjectLayout) -> Result<Vec<BackupRecord>, StoreError> {
    let dir = layout.backups_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_dump_file(&name) {
            continue;
        }
        match record_for(&entry.path()) {
            Ok(rec) => records.push(rec),
            Err(e) => tracing::warn!("skipping backup '{name}': {e}"),
        }
    }
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });
    Ok(records)
}

/// Candidate locations for a restore argument, in resolution order:
/// the path itself when absolute, the path under the backups directory
/// (a leading `backups/` is accepted), then the bare file name inside the
/// backups directory. Relative paths never resolve against the project root.
pub fn restore_candidates(layout: &ProjectLayout, input: &str) -> Vec<PathBuf> {
    let given = Path::new(input);
    if given.is_absolute() {
        return vec![given.to_path_buf()];
    }
    let backups = layout.backups_dir();
    let within = given.strip_prefix(dirs::BACKUPS).unwrap_or(given);
    let mut candidates = vec![backups.join(within)];
    if let Some(name) = given.file_name() {
        let bare = backups.join(name);
        if !candidates.contains(&bare) {
            candidates.push(bare);
        }
    }
    candidates
}

/// Resolve a restore argument to an existing file. First match wins.
pub fn resolve_backup_path(layout: &ProjectLayout, input: &str) -> Result<PathBuf, StoreError> {
    let candidates = restore_candidates(layout, input);
    candidates
        .iter()
        .find(|c| c.is_file())
        .cloned()
        .ok_or_else(|| StoreError::BackupNotFound {
            input: input.to_owned(),
            tried: candidates,
        })
}
