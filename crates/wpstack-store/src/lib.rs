//! On-disk state of a wpstack project.
//!
//! This crate owns the filesystem side of an environment: the fixed
//! directory layout (`ProjectLayout`), the persisted lifecycle record
//! (`StateStore`), backup file naming, listing and restore-path resolution,
//! and the skeletons written for new plugins and themes.

pub mod artifacts;
pub mod backups;
pub mod layout;
pub mod state;

pub use artifacts::{
    artifact_name_from_url, describe, list_artifact_dirs, validate_artifact_name, write_skeleton,
    ArtifactKind,
};
pub use backups::{
    backup_file_name, is_compressed, list_backups, parse_backup_timestamp, resolve_backup_path,
    validate_backup, BackupRecord,
};
pub use layout::ProjectLayout;
pub use state::{EnvRecord, EnvState, StateStore};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state record {path} failed its integrity check: expected {expected}, got {actual}")]
    IntegrityFailure {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("backup '{input}' not found (tried: {})", display_paths(.tried))]
    BackupNotFound { input: String, tried: Vec<PathBuf> },
    #[error("backup {} is empty", .0.display())]
    EmptyBackup(PathBuf),
    #[error("{} already exists", .0.display())]
    ArtifactExists(PathBuf),
    #[error("{} does not exist", .0.display())]
    ArtifactMissing(PathBuf),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_invalid_name() {
        let e = StoreError::InvalidName("bad".to_owned());
        assert!(e.to_string().contains("invalid name"));
    }

    #[test]
    fn backup_not_found_lists_candidates() {
        let e = StoreError::BackupNotFound {
            input: "x.sql.gz".to_owned(),
            tried: vec![PathBuf::from("/p/x.sql.gz"), PathBuf::from("/p/backups/x.sql.gz")],
        };
        let msg = e.to_string();
        assert!(msg.contains("/p/x.sql.gz"));
        assert!(msg.contains("/p/backups/x.sql.gz"));
    }

    #[test]
    fn empty_backup_display() {
        let e = StoreError::EmptyBackup(PathBuf::from("/b/backup.sql.gz"));
        assert!(e.to_string().contains("is empty"));
    }
}
