//! Plugin and theme directories as independently versioned units.
//!
//! Artifacts live outside the application tree and are bind-mounted into it,
//! so they survive `down` and `clean`. Activation inside the running
//! application is always best-effort and reported as a [`SideEffect`].

use crate::engine::{wp_request, Engine};
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wpstack_schema::services;
use wpstack_store::{
    artifact_name_from_url, describe, list_artifact_dirs, validate_artifact_name, write_skeleton,
    ArtifactKind, StoreError,
};

const README: &str = "README.md";
const INITIAL_COMMIT: &str = "Initial commit";

/// Outcome of a secondary step whose failure does not fail the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum SideEffect {
    Ok,
    Skipped(String),
    Failed(String),
}

impl SideEffect {
    pub fn is_ok(&self) -> bool {
        matches!(self, SideEffect::Ok)
    }
}

impl std::fmt::Display for SideEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SideEffect::Ok => f.write_str("ok"),
            SideEffect::Skipped(reason) => write!(f, "skipped ({reason})"),
            SideEffect::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub name: String,
    pub path: PathBuf,
    pub activation: SideEffect,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoOutcome {
    pub kind: ArtifactKind,
    pub name: String,
    pub path: PathBuf,
    /// False when the directory was already a repository and nothing changed.
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum VcsState {
    Untracked,
    TrackedNoRemote,
    TrackedWithRemote { url: String, sync: SyncState },
}

/// Position relative to the upstream branch, as of the last fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SyncState {
    UpToDate,
    Ahead { commits: u32 },
    Behind { commits: u32 },
    Diverged { ahead: u32, behind: u32 },
    NoUpstream,
}

impl SyncState {
    pub fn classify(divergence: Option<(u32, u32)>) -> Self {
        match divergence {
            None => SyncState::NoUpstream,
            Some((0, 0)) => SyncState::UpToDate,
            Some((ahead, 0)) => SyncState::Ahead { commits: ahead },
            Some((0, behind)) => SyncState::Behind { commits: behind },
            Some((ahead, behind)) => SyncState::Diverged { ahead, behind },
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::UpToDate => f.write_str("up to date"),
            SyncState::Ahead { commits } => write!(f, "{commits} ahead"),
            SyncState::Behind { commits } => write!(f, "{commits} behind"),
            SyncState::Diverged { ahead, behind } => {
                write!(f, "diverged ({ahead} ahead, {behind} behind)")
            }
            SyncState::NoUpstream => f.write_str("no upstream"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub path: PathBuf,
    pub vcs: VcsState,
    pub commits: u32,
    /// Activation reported by the application; absent when it is not running.
    pub active: Option<bool>,
}

#[derive(Deserialize)]
struct ListedArtifact {
    name: String,
    status: String,
}

impl Engine {
    /// Write a minimal plugin or theme skeleton and try to activate it.
    pub fn create_artifact(&self, kind: ArtifactKind, name: &str) -> Result<ArtifactOutcome, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Precondition(format!("{kind} name is required")));
        }
        let dir = self.artifact_dir(kind, name)?;
        let written = write_skeleton(&dir, kind, name)?;
        info!("created {kind} '{name}' ({} file(s))", written.len());

        let activation = self.activate(kind, name);
        Ok(ArtifactOutcome {
            kind,
            name: name.to_owned(),
            path: dir,
            activation,
        })
    }

    /// Turn an existing artifact directory into its own repository with a
    /// generated README and one initial commit.
    pub fn init_artifact_repo(&self, kind: ArtifactKind, name: &str) -> Result<RepoOutcome, CoreError> {
        let dir = self.artifact_dir(kind, name)?;
        if !dir.is_dir() {
            return Err(StoreError::ArtifactMissing(dir).into());
        }
        let outcome = |initialized| RepoOutcome {
            kind,
            name: name.to_owned(),
            path: dir.clone(),
            initialized,
        };
        if self.vcs().is_repo(&dir) {
            warn!("{kind} '{name}' is already a repository; leaving it unchanged");
            return Ok(outcome(false));
        }

        self.vcs().init(&dir)?;
        let readme = dir.join(README);
        if !readme.exists() {
            std::fs::write(&readme, describe(kind, name))?;
        }
        self.vcs().commit_all(&dir, INITIAL_COMMIT)?;
        info!("initialized repository for {kind} '{name}'");
        Ok(outcome(true))
    }

    /// Clone `url` into the artifact root. The name comes from the URL unless
    /// overridden. An existing directory is never touched.
    pub fn clone_artifact(
        &self,
        kind: ArtifactKind,
        url: &str,
        name_override: Option<&str>,
    ) -> Result<ArtifactOutcome, CoreError> {
        if url.trim().is_empty() {
            return Err(CoreError::Precondition("repository URL is required".to_owned()));
        }
        let name = match name_override.filter(|n| !n.trim().is_empty()) {
            Some(n) => n.to_owned(),
            None => artifact_name_from_url(url).ok_or_else(|| {
                CoreError::Precondition(format!("cannot derive a {kind} name from '{url}'"))
            })?,
        };
        let dir = self.artifact_dir(kind, &name)?;
        if dir.exists() {
            return Err(StoreError::ArtifactExists(dir).into());
        }
        std::fs::create_dir_all(kind.root(self.layout()))?;

        info!("cloning {url} into {}", dir.display());
        self.vcs().clone_repo(url, &dir)?;

        let activation = self.activate(kind, &name);
        Ok(ArtifactOutcome {
            kind,
            name,
            path: dir,
            activation,
        })
    }

    /// Every artifact directory with its repository and sync state. With
    /// `fetch`, remotes are fetched first; fetch failures only warn.
    pub fn list_artifacts(&self, kind: ArtifactKind, fetch: bool) -> Result<Vec<ArtifactInfo>, CoreError> {
        let names = list_artifact_dirs(self.layout(), kind)?;
        let activation = if names.is_empty() {
            None
        } else {
            self.activation_status(kind)
        };

        let root = kind.root(self.layout());
        Ok(names
            .into_iter()
            .map(|name| {
                let path = root.join(&name);
                let (vcs, commits) = self.vcs_state(&path, fetch);
                let active = activation
                    .as_ref()
                    .map(|m| m.get(&name).copied().unwrap_or(false));
                ArtifactInfo {
                    name,
                    path,
                    vcs,
                    commits,
                    active,
                }
            })
            .collect())
    }

    fn artifact_dir(&self, kind: ArtifactKind, name: &str) -> Result<PathBuf, CoreError> {
        validate_artifact_name(name)?;
        Ok(kind.root(self.layout()).join(name))
    }

    fn vcs_state(&self, dir: &Path, fetch: bool) -> (VcsState, u32) {
        let vcs = self.vcs();
        if !vcs.is_repo(dir) {
            return (VcsState::Untracked, 0);
        }
        let commits = vcs.commit_count(dir);
        let Some(url) = vcs.remote_url(dir) else {
            return (VcsState::TrackedNoRemote, commits);
        };
        if fetch {
            if let Err(e) = vcs.fetch(dir) {
                warn!("fetch failed for {}: {e}", dir.display());
            }
        }
        let sync = SyncState::classify(vcs.divergence(dir));
        (VcsState::TrackedWithRemote { url, sync }, commits)
    }

    fn activate(&self, kind: ArtifactKind, name: &str) -> SideEffect {
        let config = match self.config() {
            Ok(c) => c,
            Err(_) => return SideEffect::Skipped("project is not initialized".to_owned()),
        };
        let project = self.project_spec(&config);
        match self.runtime().is_running(&project, services::WPCLI) {
            Ok(true) => {}
            Ok(false) => return SideEffect::Skipped("environment is not running".to_owned()),
            Err(e) => return SideEffect::Skipped(e.to_string()),
        }
        match self.wp_checked(&project, &[kind.as_str(), "activate", name], "activation") {
            Ok(_) => {
                info!("activated {kind} '{name}'");
                SideEffect::Ok
            }
            Err(e) => {
                warn!("could not activate {kind} '{name}': {e}");
                SideEffect::Failed(e.to_string())
            }
        }
    }

    /// Name to active flag, or `None` when the application cannot be asked.
    fn activation_status(&self, kind: ArtifactKind) -> Option<BTreeMap<String, bool>> {
        let config = self.config().ok()?;
        let project = self.project_spec(&config);
        if !self.runtime().is_running(&project, services::WPCLI).ok()? {
            debug!("application not running; omitting activation status");
            return None;
        }
        let out = self
            .runtime()
            .exec(
                &project,
                &wp_request(&[kind.as_str(), "list", "--format=json", "--fields=name,status"]),
            )
            .ok()
            .filter(wpstack_runtime::ExecOutput::success)?;
        parse_activation(&out.stdout)
    }
}

fn parse_activation(json: &str) -> Option<BTreeMap<String, bool>> {
    let listed: Vec<ListedArtifact> = match serde_json::from_str(json.trim()) {
        Ok(l) => l,
        Err(e) => {
            debug!("unparseable activation list: {e}");
            return None;
        }
    };
    Some(
        listed
            .into_iter()
            .map(|a| {
                let active = matches!(a.status.as_str(), "active" | "active-network");
                (a.name, active)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_divergence() {
        assert_eq!(SyncState::classify(None), SyncState::NoUpstream);
        assert_eq!(SyncState::classify(Some((0, 0))), SyncState::UpToDate);
        assert_eq!(SyncState::classify(Some((2, 0))), SyncState::Ahead { commits: 2 });
        assert_eq!(SyncState::classify(Some((0, 3))), SyncState::Behind { commits: 3 });
        assert_eq!(
            SyncState::classify(Some((1, 4))),
            SyncState::Diverged { ahead: 1, behind: 4 }
        );
    }

    #[test]
    fn side_effect_serializes_with_reason() {
        let json = serde_json::to_value(SideEffect::Skipped("down".to_owned())).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "down");
        let ok = serde_json::to_value(SideEffect::Ok).unwrap();
        assert_eq!(ok["outcome"], "ok");
    }

    #[test]
    fn parses_activation_list() {
        let map = parse_activation(
            r#"[{"name":"akismet","status":"inactive"},{"name":"mine","status":"active"}]"#,
        )
        .unwrap();
        assert_eq!(map.get("mine"), Some(&true));
        assert_eq!(map.get("akismet"), Some(&false));
        assert!(parse_activation("Error: not installed").is_none());
    }

    #[test]
    fn vcs_state_serializes_tagged() {
        let state = VcsState::TrackedWithRemote {
            url: "https://example.com/x.git".to_owned(),
            sync: SyncState::Ahead { commits: 1 },
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "tracked-with-remote");
        assert_eq!(json["sync"]["status"], "ahead");
    }
}
