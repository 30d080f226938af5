//! Container runtime backends and external tool access for wpstack.
//!
//! The [`ContainerRuntime`] trait is the only way the rest of the workspace
//! talks to containers. [`ComposeRuntime`] drives a compose CLI and
//! [`MockRuntime`] keeps everything in memory. Git access for plugin and
//! theme repositories lives behind [`Vcs`].

pub mod backend;
pub mod compose;
pub mod git;
pub mod mock;
pub mod prereq;

pub use backend::{
    select_runtime, ContainerRuntime, ExecOutput, ExecRequest, ProjectSpec, ServiceStatus,
    DEADLINE_EXIT_CODE,
};
pub use compose::ComposeRuntime;
pub use git::{GitCli, Vcs};
pub use mock::MockRuntime;
pub use prereq::{check_runtime_prereqs, check_vcs_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("required tool '{0}' is not installed")]
    ToolUnavailable(String),
    #[error("service '{0}' is not running")]
    NotRunning(String),
    #[error("{what} failed (exit code {code}): {detail}")]
    ExecFailed {
        what: String,
        code: i32,
        detail: String,
    },
    #[error("unexpected runtime output: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for RuntimeError {
    fn from(e: serde_json::Error) -> Self {
        RuntimeError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_failed_display_names_the_step() {
        let e = RuntimeError::ExecFailed {
            what: "compose up".to_owned(),
            code: 1,
            detail: "port is already allocated".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("compose up failed"));
        assert!(msg.contains("port is already allocated"));
    }
}
