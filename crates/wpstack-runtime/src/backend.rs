use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a backend needs to address one compose project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectSpec {
    pub name: String,
    pub root: PathBuf,
    pub compose_file: PathBuf,
    pub env_file: PathBuf,
    /// Services declared by the descriptor.
    pub services: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service: String,
    pub running: bool,
    pub state: String,
    #[serde(default)]
    pub health: Option<String>,
}

/// A command to run inside a service container. Arguments are passed as an
/// argv vector, never through a host shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub service: String,
    pub argv: Vec<String>,
    pub user: Option<String>,
    /// Upper bound on the whole call. A command still running when it
    /// passes is killed and reported as exit code [`DEADLINE_EXIT_CODE`].
    pub deadline: Option<Duration>,
}

/// Exit code reported for a command killed at its deadline, as `timeout(1)` does.
pub const DEADLINE_EXIT_CODE: i32 = 124;

impl ExecRequest {
    pub fn new<I, S>(service: &str, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: service.to_owned(),
            argv: argv.into_iter().map(Into::into).collect(),
            user: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn as_user(mut self, user: &str) -> Self {
        self.user = Some(user.to_owned());
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.service, self.argv.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Convert a non-zero exit into [`RuntimeError::ExecFailed`].
    pub fn check(self, what: &str) -> Result<Self, RuntimeError> {
        if self.success() {
            Ok(self)
        } else {
            let detail = if self.stderr.trim().is_empty() {
                self.stdout.trim().to_owned()
            } else {
                self.stderr.trim().to_owned()
            };
            Err(RuntimeError::ExecFailed {
                what: what.to_owned(),
                code: self.code,
                detail,
            })
        }
    }
}

pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Request every service to start, in dependency order.
    fn up(&self, project: &ProjectSpec) -> Result<(), RuntimeError>;

    /// Stop and remove containers. Named volumes survive unless `remove_volumes`.
    fn down(&self, project: &ProjectSpec, remove_volumes: bool) -> Result<(), RuntimeError>;

    fn status(&self, project: &ProjectSpec) -> Result<Vec<ServiceStatus>, RuntimeError>;

    /// Run a command and capture its output. A non-zero exit is reported in
    /// the returned [`ExecOutput`], not as an error.
    fn exec(&self, project: &ProjectSpec, request: &ExecRequest)
        -> Result<ExecOutput, RuntimeError>;

    /// Like [`exec`](Self::exec), streaming `input` to the command's stdin.
    fn exec_with_input(
        &self,
        project: &ProjectSpec,
        request: &ExecRequest,
        input: &mut dyn Read,
    ) -> Result<ExecOutput, RuntimeError>;

    /// Run attached to the caller's terminal and return the exit code.
    fn exec_interactive(
        &self,
        project: &ProjectSpec,
        request: &ExecRequest,
    ) -> Result<i32, RuntimeError>;

    /// The last `tail` log lines of one service, or of all services.
    fn logs(
        &self,
        project: &ProjectSpec,
        service: Option<&str>,
        tail: usize,
    ) -> Result<String, RuntimeError>;

    /// Stream logs to the caller's terminal until interrupted.
    fn follow_logs(
        &self,
        project: &ProjectSpec,
        service: Option<&str>,
        tail: usize,
    ) -> Result<i32, RuntimeError>;

    fn is_running(&self, project: &ProjectSpec, service: &str) -> Result<bool, RuntimeError> {
        Ok(self
            .status(project)?
            .iter()
            .any(|s| s.service == service && s.running))
    }
}

pub fn select_runtime(name: &str) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
    match name {
        "compose" | "docker" => Ok(Box::new(crate::compose::ComposeRuntime::detect()?)),
        "mock" => Ok(Box::new(crate::mock::MockRuntime::new())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
