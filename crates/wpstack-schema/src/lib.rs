//! Environment configuration, secrets, and descriptor rendering for wpstack.
//!
//! This crate defines the declarative layer: parsing and rendering the
//! line-oriented configuration artifact (`EnvConfig`), generating credentials
//! and the redacted shareable template (`secrets`), and building the typed
//! container-orchestration descriptor (`descriptor`). Nothing here spawns
//! processes or talks to a container runtime.

pub mod config;
pub mod descriptor;
pub mod secrets;
pub mod types;

pub use config::{load_env_file, parse_env_str, EnvConfig};
pub use descriptor::{
    build, fingerprint, render, render_mail_plugin, render_php_ini, ComposeFile,
};
pub use secrets::{create_config, redact, CreateOutcome, CreateStatus, Secrets};
pub use types::{services, Fingerprint};

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration line {line}: '{content}' (expected KEY=value)")]
    MalformedLine { line: usize, content: String },
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("failed to serialize descriptor: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Write `content` to `dest` through a synced temp file in the same directory.
pub fn write_atomic(dest: &Path, content: &str) -> Result<(), std::io::Error> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    std::fs::create_dir_all(&dir)?;
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
