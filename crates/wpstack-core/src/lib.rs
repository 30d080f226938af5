//! Lifecycle orchestration for wpstack development environments.
//!
//! This crate ties the configuration and descriptor layer, the on-disk project
//! state, and a container runtime together into the [`Engine`]: the API for
//! bringing an environment up and down, installing the application, taking and
//! restoring database backups, reporting health, and managing plugin and theme
//! directories. It also provides the project lock, interrupt handling, the
//! readiness wait primitive, and lifecycle transition validation.

pub mod artifacts;
pub mod backup;
pub mod concurrency;
pub mod engine;
pub mod health;
pub mod lifecycle;
pub mod wait;

pub use artifacts::{ArtifactInfo, ArtifactOutcome, RepoOutcome, SideEffect, SyncState, VcsState};
pub use backup::RestoreReport;
pub use concurrency::{install_signal_handler, shutdown_requested, ProjectLock};
pub use engine::{
    CleanOutcome, Engine, InitReport, InstallReport, RenderReport, StatusReport, UpReport,
    CLEAN_CONFIRMATION,
};
pub use health::{CheckStatus, HealthCheck, HealthReport};
pub use lifecycle::validate_transition;
pub use wait::{wait_until, WaitOutcome, WaitPolicy};

use thiserror::Error;
use wpstack_runtime::RuntimeError;
use wpstack_schema::ConfigError;
use wpstack_store::StoreError;

/// Failure classes an operator can act on differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing argument, missing target, target already exists, service not running.
    Precondition,
    /// The container runtime or a tool inside a container exited non-zero.
    ExternalTool,
    /// The database never answered within the readiness timeout.
    Timeout,
    /// An operation reported success but its output failed verification.
    Validation,
    Internal,
}

impl ErrorKind {
    /// Prefix used on user-facing error messages.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Precondition => "precondition failed",
            ErrorKind::ExternalTool => "external tool failed",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Validation => "validation failed",
            ErrorKind::Internal => "error",
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Precondition(String),
    #[error("{0}")]
    Validation(String),
    #[error(
        "{service} did not answer a query within {waited_secs}s{}",
        recent_log_block(.recent_logs)
    )]
    Timeout {
        service: String,
        waited_secs: u64,
        recent_logs: Vec<String>,
    },
    #[error("interrupted while waiting for {0}")]
    Interrupted(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn recent_log_block(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    format!(
        "\n--- last {} log lines ---\n{}",
        lines.len(),
        lines.join("\n")
    )
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Precondition(_) | CoreError::InvalidTransition { .. } => {
                ErrorKind::Precondition
            }
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Timeout { .. } => ErrorKind::Timeout,
            CoreError::Config(_) => ErrorKind::Precondition,
            CoreError::Store(e) => match e {
                StoreError::BackupNotFound { .. } | StoreError::EmptyBackup(_) => {
                    ErrorKind::Validation
                }
                StoreError::InvalidName(_)
                | StoreError::ArtifactExists(_)
                | StoreError::ArtifactMissing(_) => ErrorKind::Precondition,
                _ => ErrorKind::Internal,
            },
            CoreError::Runtime(e) => match e {
                RuntimeError::ExecFailed { .. } => ErrorKind::ExternalTool,
                RuntimeError::BackendUnavailable(_)
                | RuntimeError::ToolUnavailable(_)
                | RuntimeError::NotRunning(_) => ErrorKind::Precondition,
                _ => ErrorKind::Internal,
            },
            CoreError::Interrupted(_) | CoreError::Io(_) | CoreError::Serialization(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message with the failure-class prefix, as shown to the operator.
    pub fn user_message(&self) -> String {
        format!("{}: {self}", self.kind().label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn timeout_message_includes_recent_logs() {
        let e = CoreError::Timeout {
            service: "db".to_owned(),
            waited_secs: 60,
            recent_logs: vec!["[ERROR] InnoDB: cannot allocate memory".to_owned()],
        };
        let msg = e.user_message();
        assert!(msg.starts_with("timed out: db did not answer"));
        assert!(msg.contains("InnoDB"));
        assert_eq!(e.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn store_errors_are_classified() {
        let missing: CoreError = StoreError::BackupNotFound {
            input: "x.sql.gz".to_owned(),
            tried: vec![PathBuf::from("/p/x.sql.gz")],
        }
        .into();
        assert_eq!(missing.kind(), ErrorKind::Validation);

        let exists: CoreError = StoreError::ArtifactExists(PathBuf::from("/p/plugins/foo")).into();
        assert_eq!(exists.kind(), ErrorKind::Precondition);
        assert!(exists.user_message().starts_with("precondition failed:"));
    }

    #[test]
    fn exec_failure_is_external_tool() {
        let e: CoreError = RuntimeError::ExecFailed {
            what: "compose up".to_owned(),
            code: 1,
            detail: "boom".to_owned(),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::ExternalTool);
    }
}
