//! Version-control access for plugin and theme directories.
//!
//! Only the handful of git operations the artifact commands need are
//! exposed, behind the [`Vcs`] trait so they can be replaced in tests.

use crate::backend::ExecOutput;
use crate::RuntimeError;
use std::path::Path;
use std::process::Command;
use tracing::debug;

const FALLBACK_NAME: &str = "wpstack";
const FALLBACK_EMAIL: &str = "wpstack@localhost";

pub trait Vcs: Send + Sync {
    fn is_repo(&self, dir: &Path) -> bool;

    fn init(&self, dir: &Path) -> Result<(), RuntimeError>;

    /// Stage everything and commit it with `message`.
    fn commit_all(&self, dir: &Path, message: &str) -> Result<(), RuntimeError>;

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), RuntimeError>;

    /// URL of the `origin` remote, if configured.
    fn remote_url(&self, dir: &Path) -> Option<String>;

    fn fetch(&self, dir: &Path) -> Result<(), RuntimeError>;

    /// Commits ahead of and behind the upstream branch. `None` when no upstream is set.
    fn divergence(&self, dir: &Path) -> Option<(u32, u32)>;

    fn commit_count(&self, dir: &Path) -> u32;
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<ExecOutput, RuntimeError> {
        let mut cmd = Command::new("git");
        if let Some(d) = dir {
            cmd.arg("-C").arg(d);
        }
        cmd.args(args);
        debug!("git {}", args.join(" "));
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RuntimeError::ToolUnavailable("git".to_owned())
            } else {
                RuntimeError::Io(e)
            }
        })?;
        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn config_value(&self, dir: &Path, key: &str) -> Option<String> {
        let out = self.run(Some(dir), &["config", "--get", key]).ok()?;
        let value = out.stdout.trim();
        (out.success() && !value.is_empty()).then(|| value.to_owned())
    }
}

impl Vcs for GitCli {
    fn is_repo(&self, dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    fn init(&self, dir: &Path) -> Result<(), RuntimeError> {
        self.run(Some(dir), &["init", "--quiet"])?.check("git init")?;
        Ok(())
    }

    fn commit_all(&self, dir: &Path, message: &str) -> Result<(), RuntimeError> {
        self.run(Some(dir), &["add", "--all"])?.check("git add")?;

        let mut args: Vec<String> = Vec::new();
        if self.config_value(dir, "user.name").is_none() {
            args.extend(["-c".to_owned(), format!("user.name={FALLBACK_NAME}")]);
        }
        if self.config_value(dir, "user.email").is_none() {
            args.extend(["-c".to_owned(), format!("user.email={FALLBACK_EMAIL}")]);
        }
        args.extend(["commit", "--quiet", "--allow-empty", "-m", message].map(str::to_owned));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(Some(dir), &refs)?.check("git commit")?;
        Ok(())
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), RuntimeError> {
        let dest_str = dest.to_string_lossy();
        self.run(None, &["clone", "--quiet", "--", url, &dest_str])?
            .check("git clone")?;
        Ok(())
    }

    fn remote_url(&self, dir: &Path) -> Option<String> {
        self.config_value(dir, "remote.origin.url")
    }

    fn fetch(&self, dir: &Path) -> Result<(), RuntimeError> {
        self.run(Some(dir), &["fetch", "--quiet"])?.check("git fetch")?;
        Ok(())
    }

    fn divergence(&self, dir: &Path) -> Option<(u32, u32)> {
        let out = self
            .run(
                Some(dir),
                &["rev-list", "--left-right", "--count", "HEAD...@{upstream}"],
            )
            .ok()?;
        if !out.success() {
            return None;
        }
        parse_divergence(&out.stdout)
    }

    fn commit_count(&self, dir: &Path) -> u32 {
        self.run(Some(dir), &["rev-list", "--count", "HEAD"])
            .ok()
            .filter(ExecOutput::success)
            .and_then(|o| o.stdout.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Parse `rev-list --left-right --count` output: `<ahead>\t<behind>`.
pub fn parse_divergence(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some((ahead, behind))
}
