use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Exclusive advisory lock on `.wpstack/lock`, held while a mutating
/// operation runs. Released when dropped.
pub struct ProjectLock {
    file: File,
}

impl ProjectLock {
    /// Take the lock without waiting. `Ok(None)` means another process holds it.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;
        if file.try_lock_exclusive().is_err() {
            debug!("lock {} is held elsewhere", lock_path.display());
            return Ok(None);
        }
        Ok(Some(Self { file }))
    }
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C interrupts the current wait; a second one exits immediately.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\ninterrupt received, stopping after the current step...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_creates_state_directory() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join(".wpstack").join("lock");

        let _lock = ProjectLock::try_acquire(&lock_path).unwrap().unwrap();
        assert!(lock_path.exists());
    }

    #[test]
    fn second_holder_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("lock");

        let _held = ProjectLock::try_acquire(&lock_path).unwrap().unwrap();
        assert!(ProjectLock::try_acquire(&lock_path).unwrap().is_none());
    }

    #[test]
    fn dropping_releases() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("lock");

        drop(ProjectLock::try_acquire(&lock_path).unwrap().unwrap());
        assert!(ProjectLock::try_acquire(&lock_path).unwrap().is_some());
    }
}
