//! Database snapshots.
//!
//! Dumps run entirely inside the database container and land in the shared
//! backups mount, so dump bytes never pass through this process. Restores
//! stream the file from the host into the database client's stdin.

use crate::engine::Engine;
use crate::CoreError;
use chrono::Utc;
use flate2::read::GzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wpstack_runtime::{ExecRequest, ProjectSpec};
use wpstack_schema::descriptor::mounts;
use wpstack_schema::services;
use wpstack_store::backups::record_for;
use wpstack_store::{
    backup_file_name, is_compressed, list_backups, resolve_backup_path, validate_backup,
    BackupRecord,
};

/// `$1` is the uncompressed output path, `$2` the `uid:gid` to hand the file to.
const DUMP_SCRIPT: &str = r#"set -u
out="$1"
if ! MYSQL_PWD="$MARIADB_ROOT_PASSWORD" mariadb-dump -uroot --single-transaction --routines --triggers "$MARIADB_DATABASE" > "$out"; then
  rm -f "$out"
  exit 2
fi
if [ ! -s "$out" ]; then
  rm -f "$out"
  exit 3
fi
gzip -f "$out" || exit 2
chown "$2" "$out.gz" 2>/dev/null || echo "chown $2 failed" >&2
chmod 644 "$out.gz"
"#;

const DUMP_EMPTY_EXIT: i32 = 3;

const RESTORE_SCRIPT: &str =
    "MYSQL_PWD=\"$MARIADB_ROOT_PASSWORD\" exec mariadb -uroot \"$MARIADB_DATABASE\"";

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub path: PathBuf,
    pub compressed: bool,
    pub size_bytes: u64,
}

impl Engine {
    /// Dump the database to a new timestamped, compressed file in the backups
    /// directory. A dump that produces no bytes is an error, never a backup.
    pub fn backup(&self) -> Result<BackupRecord, CoreError> {
        let _lock = self.lock()?;
        let (_config, project) = self.running_project(services::DB)?;

        let file_name = backup_file_name(Utc::now());
        let uncompressed = file_name.trim_end_matches(".gz");
        let container_path = format!("{}/{uncompressed}", mounts::BACKUPS);
        let owner = host_owner();
        info!("dumping database to {file_name}");

        let request = ExecRequest::new(
            services::DB,
            [
                "sh",
                "-c",
                DUMP_SCRIPT,
                "sh",
                container_path.as_str(),
                owner.as_str(),
            ],
        );
        let out = self.runtime().exec(&project, &request)?;
        if out.code == DUMP_EMPTY_EXIT {
            return Err(CoreError::Validation(format!(
                "database dump for {file_name} was empty; no backup written"
            )));
        }
        let out = out.check("database dump")?;
        if !out.stderr.trim().is_empty() {
            warn!("{}", out.stderr.trim());
        }

        let host_path = self.layout().backups_dir().join(&file_name);
        let record = record_for(&host_path)?;
        info!("backup written: {} ({} bytes)", host_path.display(), record.size_bytes);
        Ok(record)
    }

    /// Replace the database contents with a dump. There is no implicit backup
    /// beforehand.
    pub fn restore(&self, input: &str) -> Result<RestoreReport, CoreError> {
        let _lock = self.lock()?;
        let path = resolve_backup_path(self.layout(), input)?;
        let (_config, project) = self.running_project(services::DB)?;
        self.restore_file(&project, &path)
    }

    /// Copy a host dump into the backups directory under its own file name,
    /// then restore it.
    pub fn import(&self, source: &Path) -> Result<RestoreReport, CoreError> {
        let _lock = self.lock()?;
        if !source.is_file() {
            return Err(CoreError::Precondition(format!(
                "import source {} does not exist",
                source.display()
            )));
        }
        let Some(file_name) = source.file_name() else {
            return Err(CoreError::Precondition(format!(
                "import source {} has no file name",
                source.display()
            )));
        };
        let (_config, project) = self.running_project(services::DB)?;

        let dest = self.layout().backups_dir().join(file_name);
        if same_file(source, &dest) {
            debug!("{} is already in the backups directory", dest.display());
        } else {
            std::fs::create_dir_all(self.layout().backups_dir())?;
            std::fs::copy(source, &dest)?;
            info!("copied {} to {}", source.display(), dest.display());
        }
        self.restore_file(&project, &dest)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupRecord>, CoreError> {
        Ok(list_backups(self.layout())?)
    }

    fn restore_file(&self, project: &ProjectSpec, path: &Path) -> Result<RestoreReport, CoreError> {
        let size_bytes = validate_backup(path)?;
        let compressed = is_compressed(path);
        info!(
            "restoring {} ({size_bytes} bytes{})",
            path.display(),
            if compressed { ", compressed" } else { "" }
        );

        let file = BufReader::new(File::open(path)?);
        let mut reader: Box<dyn Read> = if compressed {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let request = ExecRequest::new(services::DB, ["sh", "-c", RESTORE_SCRIPT]);
        self.runtime()
            .exec_with_input(project, &request, &mut *reader)?
            .check("database restore")?;

        Ok(RestoreReport {
            path: path.to_path_buf(),
            compressed,
            size_bytes,
        })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// `uid:gid` of the invoking user, so dumps written by the container's root
/// user stay readable on the host.
fn host_owner() -> String {
    // SAFETY: getuid and getgid have no preconditions and cannot fail.
    #[allow(unsafe_code)]
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    format!("{uid}:{gid}")
}
