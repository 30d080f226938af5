//! Credential generation and the redacted, shareable copy of the configuration.

use crate::config::{load_env_file, EnvConfig};
use crate::{write_atomic, ConfigError};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Value written in place of every generated secret in the redacted template.
pub const REDACTED_PLACEHOLDER: &str = "CHANGE_ME";

const SECRET_LENGTH: usize = 24;

/// A freshly generated pair of database credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    pub password: String,
    pub root_password: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("password", &"<redacted>")
            .field("root_password", &"<redacted>")
            .finish()
    }
}

pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate() -> Secrets {
    Secrets {
        password: random_token(SECRET_LENGTH),
        root_password: random_token(SECRET_LENGTH),
    }
}

impl EnvConfig {
    #[must_use]
    pub fn with_secrets(&self, secrets: &Secrets) -> Self {
        let mut next = self.clone();
        next.database.password.clone_from(&secrets.password);
        next.database.root_password.clone_from(&secrets.root_password);
        next
    }
}

/// Copy of `config` with every generated secret replaced by [`REDACTED_PLACEHOLDER`].
pub fn redact(config: &EnvConfig) -> EnvConfig {
    let mut copy = config.clone();
    REDACTED_PLACEHOLDER.clone_into(&mut copy.database.password);
    REDACTED_PLACEHOLDER.clone_into(&mut copy.database.root_password);
    copy
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateStatus {
    Created,
    /// A live configuration already existed and was left untouched.
    Existing,
    Regenerated,
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub status: CreateStatus,
    pub config: EnvConfig,
}

/// Create the live configuration at `live` and its redacted copy at `template`.
///
/// An existing live file is never overwritten unless `regenerate` is set, in
/// which case its settings are kept and only the secrets are replaced.
pub fn create_config(
    live: &Path,
    template: &Path,
    base: &EnvConfig,
    regenerate: bool,
) -> Result<CreateOutcome, ConfigError> {
    let (status, config) = if live.exists() {
        let existing = load_env_file(live)?;
        if regenerate {
            info!("regenerating secrets in {}", live.display());
            let next = existing.with_secrets(&generate());
            write_atomic(live, &next.to_env_string())?;
            (CreateStatus::Regenerated, next)
        } else {
            warn!(
                "{} already exists; keeping existing configuration",
                live.display()
            );
            (CreateStatus::Existing, existing)
        }
    } else {
        let next = base.with_secrets(&generate());
        write_atomic(live, &next.to_env_string())?;
        info!("wrote configuration {}", live.display());
        (CreateStatus::Created, next)
    };

    write_atomic(template, &redact(&config).to_env_string())?;
    make_world_readable(template)?;

    Ok(CreateOutcome { status, config })
}

#[cfg(unix)]
fn make_world_readable(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_world_readable(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secrets_are_random_and_distinct() {
        let a = generate();
        let b = generate();
        assert_eq!(a.password.len(), SECRET_LENGTH);
        assert_ne!(a.password, a.root_password);
        assert_ne!(a.password, b.password);
        assert!(a.password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn secrets_debug_does_not_leak() {
        let s = generate();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains(&s.password));
        assert!(!dbg.contains(&s.root_password));
    }

    #[test]
    fn redact_does_not_mutate_original() {
        let live = EnvConfig::default().with_secrets(&generate());
        let before = live.clone();
        let redacted = redact(&live);
        assert_eq!(live, before);
        assert_eq!(redacted.database.password, REDACTED_PLACEHOLDER);
        assert_eq!(redacted.database.root_password, REDACTED_PLACEHOLDER);
        assert_eq!(redacted.ports, live.ports);
    }

    #[test]
    fn create_writes_live_and_redacted_files() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join(".env");
        let template = dir.path().join(".env.example");

        let out = create_config(&live, &template, &EnvConfig::default(), false).unwrap();
        assert_eq!(out.status, CreateStatus::Created);
        assert!(out.config.has_secrets());

        let live_text = std::fs::read_to_string(&live).unwrap();
        let template_text = std::fs::read_to_string(&template).unwrap();
        assert!(live_text.contains(&out.config.database.password));
        assert!(!template_text.contains(&out.config.database.password));
        assert!(!template_text.contains(&out.config.database.root_password));
        assert!(template_text.contains(REDACTED_PLACEHOLDER));
    }

    #[test]
    fn second_create_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join(".env");
        let template = dir.path().join(".env.example");

        let first = create_config(&live, &template, &EnvConfig::default(), false).unwrap();
        let before = std::fs::read_to_string(&live).unwrap();
        let second = create_config(&live, &template, &EnvConfig::default(), false).unwrap();

        assert_eq!(second.status, CreateStatus::Existing);
        assert_eq!(second.config, first.config);
        assert_eq!(std::fs::read_to_string(&live).unwrap(), before);
    }

    #[test]
    fn regenerate_keeps_settings_and_replaces_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join(".env");
        let template = dir.path().join(".env.example");
        std::fs::write(&live, "WP_PORT=9000\nDB_PASSWORD=old\nDB_ROOT_PASSWORD=oldroot\n").unwrap();

        let out = create_config(&live, &template, &EnvConfig::default(), true).unwrap();
        assert_eq!(out.status, CreateStatus::Regenerated);
        assert_eq!(out.config.ports.web, 9000);
        assert_ne!(out.config.database.password, "old");
        assert_eq!(load_env_file(&live).unwrap(), out.config);
    }
}
