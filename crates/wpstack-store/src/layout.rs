use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};
use wpstack_schema::descriptor::{dirs, MAIL_PLUGIN_FILE, PHP_INI_FILE};

pub const ENV_FILE: &str = ".env";
pub const ENV_TEMPLATE_FILE: &str = ".env.example";
pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const STATE_DIR: &str = ".wpstack";
const GITIGNORE: &str = ".gitignore";

const GITIGNORE_CONTENT: &str = "\
# wpstack: generated and machine-local content
.env
.wpstack/
docker-compose.yml
config/php.ini
wordpress/
uploads/
backups/
# plugins and themes are their own repositories
plugins/
themes/
";

/// Directory layout of one development environment.
///
/// Application core, plugins, themes, uploads, and backups each live in a
/// fixed top-level directory. All subdirectories are created lazily on
/// [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn env_file(&self) -> PathBuf {
        self.root.join(ENV_FILE)
    }

    /// The redacted configuration template, the only config artifact meant to be shared.
    #[inline]
    pub fn env_template(&self) -> PathBuf {
        self.root.join(ENV_TEMPLATE_FILE)
    }

    #[inline]
    pub fn compose_file(&self) -> PathBuf {
        self.root.join(COMPOSE_FILE)
    }

    #[inline]
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(dirs::CONFIG)
    }

    #[inline]
    pub fn php_ini(&self) -> PathBuf {
        self.config_dir().join(PHP_INI_FILE)
    }

    /// Mail-capture must-use plugin, mounted read-only into the application.
    pub fn mail_plugin(&self) -> PathBuf {
        self.config_dir().join(MAIL_PLUGIN_FILE)
    }

    #[inline]
    pub fn core_dir(&self) -> PathBuf {
        self.root.join(dirs::CORE)
    }

    #[inline]
    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join(dirs::PLUGINS)
    }

    #[inline]
    pub fn themes_dir(&self) -> PathBuf {
        self.root.join(dirs::THEMES)
    }

    #[inline]
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(dirs::UPLOADS)
    }

    #[inline]
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(dirs::BACKUPS)
    }

    #[inline]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    #[inline]
    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join("state.json")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.state_dir().join("lock")
    }

    /// Marker file whose presence means core files have been materialized.
    #[inline]
    pub fn core_marker(&self) -> PathBuf {
        self.core_dir().join("wp-load.php")
    }

    pub fn is_created(&self) -> bool {
        self.env_file().exists()
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        for dir in [
            self.core_dir(),
            self.plugins_dir(),
            self.themes_dir(),
            self.uploads_dir(),
            self.backups_dir(),
            self.config_dir(),
            self.state_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }

        let gitignore = self.root.join(GITIGNORE);
        if !gitignore.exists() {
            fs::write(gitignore, GITIGNORE_CONTENT)?;
        }
        Ok(())
    }

    /// Generated content removed by a confirmed clean. Plugins, themes,
    /// backups and the redacted template are never part of this set.
    pub fn generated_content(&self) -> Vec<PathBuf> {
        vec![
            self.core_dir(),
            self.uploads_dir(),
            self.compose_file(),
            self.php_ini(),
            self.mail_plugin(),
            self.state_dir(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = ProjectLayout::new("/tmp/wp");
        assert_eq!(layout.env_file(), PathBuf::from("/tmp/wp/.env"));
        assert_eq!(layout.env_template(), PathBuf::from("/tmp/wp/.env.example"));
        assert_eq!(
            layout.compose_file(),
            PathBuf::from("/tmp/wp/docker-compose.yml")
        );
        assert_eq!(layout.php_ini(), PathBuf::from("/tmp/wp/config/php.ini"));
        assert_eq!(
            layout.mail_plugin(),
            PathBuf::from("/tmp/wp/config/wpstack-mail.php")
        );
        assert_eq!(layout.backups_dir(), PathBuf::from("/tmp/wp/backups"));
        assert_eq!(
            layout.state_file(),
            PathBuf::from("/tmp/wp/.wpstack/state.json")
        );
    }

    #[test]
    fn initialize_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        layout.initialize().unwrap();

        assert!(layout.core_dir().is_dir());
        assert!(layout.plugins_dir().is_dir());
        assert!(layout.themes_dir().is_dir());
        assert!(layout.uploads_dir().is_dir());
        assert!(layout.backups_dir().is_dir());
        assert!(dir.path().join(".gitignore").is_file());
    }

    #[test]
    fn initialize_keeps_existing_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "custom\n").unwrap();
        let layout = ProjectLayout::new(dir.path());
        layout.initialize().unwrap();
        layout.initialize().unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(".gitignore")).unwrap(),
            "custom\n"
        );
    }

    #[test]
    fn generated_content_excludes_shared_and_persistent_paths() {
        let layout = ProjectLayout::new("/tmp/wp");
        let generated = layout.generated_content();
        assert!(!generated.contains(&layout.backups_dir()));
        assert!(!generated.contains(&layout.plugins_dir()));
        assert!(!generated.contains(&layout.themes_dir()));
        assert!(!generated.contains(&layout.env_template()));
    }
}
