use crate::layout::ProjectLayout;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A plugin or theme kept as its own directory under the project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Plugin,
    Theme,
}

impl ArtifactKind {
    /// Subcommand name understood by the application CLI (`wp plugin ...`).
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Plugin => "plugin",
            ArtifactKind::Theme => "theme",
        }
    }

    pub fn root(self, layout: &ProjectLayout) -> PathBuf {
        match self {
            ArtifactKind::Plugin => layout.plugins_dir(),
            ArtifactKind::Theme => layout.themes_dir(),
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn validate_artifact_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("name must not be empty".to_owned()));
    }
    if name.len() > 100 || name.starts_with('.') || name.starts_with('-') {
        return Err(StoreError::InvalidName(format!(
            "'{name}' must be 1-100 characters and not start with '.' or '-'"
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(StoreError::InvalidName(format!(
            "'{name}' must match [A-Za-z0-9._-]"
        )));
    }
    Ok(())
}

/// Artifact name implied by a repository URL: its last path segment without `.git`.
///
/// Handles `https://host/user/foo.git`, `git@host:user/foo.git` and trailing slashes.
pub fn artifact_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        None
    } else {
        Some(name.to_owned())
    }
}

fn display_title(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn skeleton_files(kind: ArtifactKind, name: &str) -> Vec<(String, String)> {
    let title = display_title(name);
    match kind {
        ArtifactKind::Plugin => vec![(
            format!("{name}.php"),
            format!(
                "<?php\n\
                 /**\n \
                 * Plugin Name: {title}\n \
                 * Description: Development plugin.\n \
                 * Version: 0.1.0\n \
                 * Text Domain: {name}\n \
                 */\n\
                 \n\
                 defined( 'ABSPATH' ) || exit;\n"
            ),
        )],
        ArtifactKind::Theme => vec![
            (
                "style.css".to_owned(),
                format!(
                    "/*\n\
                     Theme Name: {title}\n\
                     Description: Development theme.\n\
                     Version: 0.1.0\n\
                     Text Domain: {name}\n\
                     */\n"
                ),
            ),
            (
                "index.php".to_owned(),
                "<?php\nget_header();\n\nif ( have_posts() ) {\n\twhile ( have_posts() ) {\n\t\tthe_post();\n\t\tthe_content();\n\t}\n}\n\nget_footer();\n"
                    .to_owned(),
            ),
            (
                "functions.php".to_owned(),
                "<?php\n\ndefined( 'ABSPATH' ) || exit;\n".to_owned(),
            ),
        ],
    }
}

/// Create `dir` with a minimal valid manifest for `kind`. Fails if `dir` exists.
pub fn write_skeleton(dir: &Path, kind: ArtifactKind, name: &str) -> Result<Vec<PathBuf>, StoreError> {
    validate_artifact_name(name)?;
    if dir.exists() {
        return Err(StoreError::ArtifactExists(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (file, content) in skeleton_files(kind, name) {
        let path = dir.join(file);
        fs::write(&path, content)?;
        written.push(path);
    }
    Ok(written)
}

/// Generated description file placed in a newly initialized artifact repository.
pub fn describe(kind: ArtifactKind, name: &str) -> String {
    format!(
        "# {title}\n\nWordPress {kind} `{name}`.\n\n\
         This directory is mounted into the development environment at\n\
         `wp-content/{kind}s/{name}` and is versioned independently of it.\n",
        title = display_title(name),
    )
}

/// Artifact directories under the root for `kind`, sorted by name.
pub fn list_artifact_dirs(layout: &ProjectLayout, kind: ArtifactKind) -> Result<Vec<String>, StoreError> {
    let root = kind.root(layout);
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
