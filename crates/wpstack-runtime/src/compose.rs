use crate::backend::{
    ContainerRuntime, ExecOutput, ExecRequest, ProjectSpec, ServiceStatus, DEADLINE_EXIT_CODE,
};
use crate::RuntimeError;
use serde::Deserialize;
use std::io::{IsTerminal, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Drives a compose implementation (`docker compose`, `docker-compose` or
/// `podman compose`) through its command line.
pub struct ComposeRuntime {
    bin: String,
    args: Vec<String>,
}

const CANDIDATES: [&[&str]; 3] = [
    &["docker", "compose"],
    &["docker-compose"],
    &["podman", "compose"],
];

impl ComposeRuntime {
    /// Use `bin` followed by `args` (e.g. `docker` + `["compose"]`) for every call.
    pub fn with_program(bin: &str, args: &[&str]) -> Self {
        Self {
            bin: bin.to_owned(),
            args: args.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Pick the first compose implementation that answers `version`.
    pub fn detect() -> Result<Self, RuntimeError> {
        for candidate in CANDIDATES {
            let Some((bin, rest)) = candidate.split_first() else {
                continue;
            };
            let ok = Command::new(bin)
                .args(rest.iter().copied())
                .arg("version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if ok {
                debug!("using compose implementation: {}", candidate.join(" "));
                return Ok(Self::with_program(bin, rest));
            }
        }
        Err(RuntimeError::BackendUnavailable(
            "no compose implementation found (docker compose, docker-compose, podman compose)"
                .to_owned(),
        ))
    }

    pub fn program(&self) -> String {
        std::iter::once(self.bin.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self, project: &ProjectSpec) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(&self.args);
        cmd.arg("--project-name").arg(&project.name);
        cmd.arg("--project-directory").arg(&project.root);
        cmd.arg("--file").arg(&project.compose_file);
        if project.env_file.exists() {
            cmd.arg("--env-file").arg(&project.env_file);
        }
        cmd.current_dir(&project.root);
        cmd
    }

    fn exec_command(&self, project: &ProjectSpec, request: &ExecRequest, tty: bool) -> Command {
        let mut cmd = self.command(project);
        cmd.arg("exec");
        if !tty {
            cmd.arg("-T");
        }
        if let Some(user) = &request.user {
            cmd.arg("--user").arg(user);
        }
        cmd.arg(&request.service);
        cmd.args(&request.argv);
        cmd
    }

    fn run_checked(&self, mut cmd: Command, what: &str) -> Result<ExecOutput, RuntimeError> {
        debug!("running {cmd:?}");
        let output = cmd.output().map_err(|e| self.spawn_error(&e))?;
        to_exec_output(&output).check(what)
    }

    fn spawn_error(&self, e: &std::io::Error) -> RuntimeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            RuntimeError::BackendUnavailable(self.program())
        } else {
            RuntimeError::Io(std::io::Error::new(e.kind(), e.to_string()))
        }
    }
}

const DEADLINE_POLL: Duration = Duration::from_millis(50);
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Drain a pipe on its own thread. The thread is detached so that a
/// grandchild still holding the pipe cannot block the caller.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_string(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Collect a piped child's output, killing it once `limit` has passed.
fn wait_with_deadline(mut child: Child, limit: Duration) -> Result<ExecOutput, RuntimeError> {
    let out = drain(child.stdout.take());
    let err = drain(child.stderr.take());
    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) if started.elapsed() < limit => std::thread::sleep(DEADLINE_POLL),
            Ok(None) => {
                debug!("killing exec after {limit:?}");
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RuntimeError::Io(e));
            }
        }
    };
    Ok(match status {
        Some(status) => ExecOutput {
            code: status.code().unwrap_or(-1),
            stdout: out.recv().unwrap_or_default(),
            stderr: err.recv().unwrap_or_default(),
        },
        None => ExecOutput {
            code: DEADLINE_EXIT_CODE,
            stdout: out.recv_timeout(KILL_GRACE).unwrap_or_default(),
            stderr: format!(
                "{}killed after {:.1}s without finishing\n",
                err.recv_timeout(KILL_GRACE).unwrap_or_default(),
                limit.as_secs_f32()
            ),
        },
    })
}

fn to_exec_output(output: &std::process::Output) -> ExecOutput {
    ExecOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Health", default)]
    health: String,
}

/// Parse `ps --format json`, which is a JSON array on older compose releases
/// and one object per line on newer ones.
pub fn parse_ps_output(raw: &str) -> Result<Vec<ServiceStatus>, RuntimeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?
    };
    Ok(entries
        .into_iter()
        .map(|e| ServiceStatus {
            running: e.state.eq_ignore_ascii_case("running"),
            service: e.service,
            state: e.state,
            health: if e.health.is_empty() {
                None
            } else {
                Some(e.health)
            },
        })
        .collect())
}

impl ContainerRuntime for ComposeRuntime {
    fn name(&self) -> &'static str {
        "compose"
    }

    fn up(&self, project: &ProjectSpec) -> Result<(), RuntimeError> {
        let mut cmd = self.command(project);
        cmd.args(["up", "--detach", "--remove-orphans"]);
        self.run_checked(cmd, "compose up")?;
        Ok(())
    }

    fn down(&self, project: &ProjectSpec, remove_volumes: bool) -> Result<(), RuntimeError> {
        let mut cmd = self.command(project);
        cmd.args(["down", "--remove-orphans"]);
        if remove_volumes {
            cmd.arg("--volumes");
        }
        self.run_checked(cmd, "compose down")?;
        Ok(())
    }

    fn status(&self, project: &ProjectSpec) -> Result<Vec<ServiceStatus>, RuntimeError> {
        let mut cmd = self.command(project);
        cmd.args(["ps", "--all", "--format", "json"]);
        let out = self.run_checked(cmd, "compose ps")?;
        parse_ps_output(&out.stdout)
    }

    fn exec(
        &self,
        project: &ProjectSpec,
        request: &ExecRequest,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut cmd = self.exec_command(project, request, false);
        cmd.stdin(Stdio::null());
        debug!("exec {}", request.display());
        let Some(limit) = request.deadline else {
            let output = cmd.output().map_err(|e| self.spawn_error(&e))?;
            return Ok(to_exec_output(&output));
        };
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let child = cmd.spawn().map_err(|e| self.spawn_error(&e))?;
        wait_with_deadline(child, limit)
    }

    fn exec_with_input(
        &self,
        project: &ProjectSpec,
        request: &ExecRequest,
        input: &mut dyn Read,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut cmd = self.exec_command(project, request, false);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("exec (streaming stdin) {}", request.display());
        let mut child = cmd.spawn().map_err(|e| self.spawn_error(&e))?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let (copy_result, out, err) = std::thread::scope(|scope| {
            let out_reader = scope.spawn(move || {
                let mut buf = String::new();
                if let Some(s) = stdout.as_mut() {
                    let _ = s.read_to_string(&mut buf);
                }
                buf
            });
            let err_reader = scope.spawn(move || {
                let mut buf = String::new();
                if let Some(s) = stderr.as_mut() {
                    let _ = s.read_to_string(&mut buf);
                }
                buf
            });
            let copy_result = match child.stdin.take() {
                Some(mut stdin) => std::io::copy(input, &mut stdin).map(|_| ()),
                None => Ok(()),
            };
            (
                copy_result,
                out_reader.join().unwrap_or_default(),
                err_reader.join().unwrap_or_default(),
            )
        });
        let status = child.wait()?;
        if let Err(e) = copy_result {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(RuntimeError::Io(e));
            }
        }
        Ok(ExecOutput {
            code: status.code().unwrap_or(-1),
            stdout: out,
            stderr: err,
        })
    }

    fn exec_interactive(
        &self,
        project: &ProjectSpec,
        request: &ExecRequest,
    ) -> Result<i32, RuntimeError> {
        let tty = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
        let mut cmd = self.exec_command(project, request, tty);
        let status = cmd.status().map_err(|e| self.spawn_error(&e))?;
        Ok(status.code().unwrap_or(-1))
    }

    fn logs(
        &self,
        project: &ProjectSpec,
        service: Option<&str>,
        tail: usize,
    ) -> Result<String, RuntimeError> {
        let mut cmd = self.command(project);
        cmd.args(["logs", "--no-color", "--tail"])
            .arg(tail.to_string());
        if let Some(s) = service {
            cmd.arg(s);
        }
        let out = self.run_checked(cmd, "compose logs")?;
        // Compose writes container stderr to its own stderr.
        Ok(format!("{}{}", out.stdout, out.stderr))
    }

    fn follow_logs(
        &self,
        project: &ProjectSpec,
        service: Option<&str>,
        tail: usize,
    ) -> Result<i32, RuntimeError> {
        let mut cmd = self.command(project);
        cmd.args(["logs", "--follow", "--tail"])
            .arg(tail.to_string());
        if let Some(s) = service {
            cmd.arg(s);
        }
        let status = cmd.status().map_err(|e| self.spawn_error(&e))?;
        Ok(status.code().unwrap_or(-1))
    }
}
