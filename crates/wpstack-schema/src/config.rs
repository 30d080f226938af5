use crate::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_PROJECT_NAME: &str = "wpdev";
pub const DEFAULT_WEB_PORT: u16 = 8080;
pub const DEFAULT_ADMIN_UI_PORT: u16 = 8081;
pub const DEFAULT_MAIL_UI_PORT: u16 = 8025;
pub const DEFAULT_MAIL_SMTP_PORT: u16 = 1025;
pub const DEFAULT_PHP_VERSION: &str = "8.2";
pub const DEFAULT_DB_WAIT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_DB_WAIT_INTERVAL_SECS: u64 = 1;

/// Host-facing port assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ports {
    pub web: u16,
    pub admin_ui: u16,
    pub mail_ui: u16,
    pub mail_smtp: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhpSettings {
    pub version: String,
    pub memory_limit: String,
    pub upload_max_filesize: String,
    pub max_execution_time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    pub name: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub root_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordPressSettings {
    pub debug: bool,
    pub cron_disabled: bool,
    pub disallow_file_edit: bool,
    pub title: String,
    pub admin_user: String,
    pub admin_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessSettings {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

/// Declarative settings of one development environment.
///
/// Values are immutable once loaded; producing different settings (for example
/// fresh secrets) always yields a new `EnvConfig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvConfig {
    pub project_name: String,
    pub ports: Ports,
    pub php: PhpSettings,
    pub database: DatabaseSettings,
    pub wordpress: WordPressSettings,
    pub readiness: ReadinessSettings,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_owned(),
            ports: Ports {
                web: DEFAULT_WEB_PORT,
                admin_ui: DEFAULT_ADMIN_UI_PORT,
                mail_ui: DEFAULT_MAIL_UI_PORT,
                mail_smtp: DEFAULT_MAIL_SMTP_PORT,
            },
            php: PhpSettings {
                version: DEFAULT_PHP_VERSION.to_owned(),
                memory_limit: "256M".to_owned(),
                upload_max_filesize: "64M".to_owned(),
                max_execution_time: 300,
            },
            database: DatabaseSettings {
                name: "wordpress".to_owned(),
                user: "wordpress".to_owned(),
                password: String::new(),
                root_password: String::new(),
            },
            wordpress: WordPressSettings {
                debug: true,
                cron_disabled: false,
                disallow_file_edit: false,
                title: "WordPress Dev".to_owned(),
                admin_user: "admin".to_owned(),
                admin_email: "admin@example.com".to_owned(),
            },
            readiness: ReadinessSettings {
                timeout_secs: DEFAULT_DB_WAIT_TIMEOUT_SECS,
                interval_secs: DEFAULT_DB_WAIT_INTERVAL_SECS,
            },
        }
    }
}

/// Keys written to the configuration artifact, in file order.
pub const KEYS: [&str; 21] = [
    "PROJECT_NAME",
    "WP_PORT",
    "PMA_PORT",
    "MAIL_UI_PORT",
    "MAIL_SMTP_PORT",
    "PHP_VERSION",
    "PHP_MEMORY_LIMIT",
    "PHP_UPLOAD_MAX_FILESIZE",
    "PHP_MAX_EXECUTION_TIME",
    "DB_NAME",
    "DB_USER",
    "DB_PASSWORD",
    "DB_ROOT_PASSWORD",
    "WP_DEBUG",
    "WP_CRON_DISABLED",
    "DISALLOW_FILE_EDIT",
    "WP_TITLE",
    "WP_ADMIN_USER",
    "WP_ADMIN_EMAIL",
    "DB_WAIT_TIMEOUT",
    "DB_WAIT_INTERVAL",
];

impl EnvConfig {
    /// Build a configuration from raw key/value pairs, falling back to the
    /// documented default for every key that is absent.
    pub fn from_pairs(pairs: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for (key, value) in pairs {
            cfg.apply(key, value)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "PROJECT_NAME" => self.project_name = value.to_owned(),
            "WP_PORT" => self.ports.web = parse_num(key, value)?,
            "PMA_PORT" => self.ports.admin_ui = parse_num(key, value)?,
            "MAIL_UI_PORT" => self.ports.mail_ui = parse_num(key, value)?,
            "MAIL_SMTP_PORT" => self.ports.mail_smtp = parse_num(key, value)?,
            "PHP_VERSION" => self.php.version = value.to_owned(),
            "PHP_MEMORY_LIMIT" => self.php.memory_limit = value.to_owned(),
            "PHP_UPLOAD_MAX_FILESIZE" => self.php.upload_max_filesize = value.to_owned(),
            "PHP_MAX_EXECUTION_TIME" => self.php.max_execution_time = parse_num(key, value)?,
            "DB_NAME" => self.database.name = value.to_owned(),
            "DB_USER" => self.database.user = value.to_owned(),
            "DB_PASSWORD" => self.database.password = value.to_owned(),
            "DB_ROOT_PASSWORD" => self.database.root_password = value.to_owned(),
            "WP_DEBUG" => self.wordpress.debug = parse_bool(key, value)?,
            "WP_CRON_DISABLED" => self.wordpress.cron_disabled = parse_bool(key, value)?,
            "DISALLOW_FILE_EDIT" => self.wordpress.disallow_file_edit = parse_bool(key, value)?,
            "WP_TITLE" => self.wordpress.title = value.to_owned(),
            "WP_ADMIN_USER" => self.wordpress.admin_user = value.to_owned(),
            "WP_ADMIN_EMAIL" => self.wordpress.admin_email = value.to_owned(),
            "DB_WAIT_TIMEOUT" => self.readiness.timeout_secs = parse_num(key, value)?,
            "DB_WAIT_INTERVAL" => self.readiness.interval_secs = parse_num(key, value)?,
            other => debug!("ignoring unknown configuration key {other}"),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.project_name.is_empty()
            || !self
                .project_name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
        {
            return Err(ConfigError::InvalidValue {
                key: "PROJECT_NAME".to_owned(),
                value: self.project_name.clone(),
                reason: "must match [a-z0-9_-]+".to_owned(),
            });
        }
        if self.readiness.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DB_WAIT_INTERVAL".to_owned(),
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Key/value pairs in [`KEYS`] order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PROJECT_NAME", self.project_name.clone()),
            ("WP_PORT", self.ports.web.to_string()),
            ("PMA_PORT", self.ports.admin_ui.to_string()),
            ("MAIL_UI_PORT", self.ports.mail_ui.to_string()),
            ("MAIL_SMTP_PORT", self.ports.mail_smtp.to_string()),
            ("PHP_VERSION", self.php.version.clone()),
            ("PHP_MEMORY_LIMIT", self.php.memory_limit.clone()),
            ("PHP_UPLOAD_MAX_FILESIZE", self.php.upload_max_filesize.clone()),
            (
                "PHP_MAX_EXECUTION_TIME",
                self.php.max_execution_time.to_string(),
            ),
            ("DB_NAME", self.database.name.clone()),
            ("DB_USER", self.database.user.clone()),
            ("DB_PASSWORD", self.database.password.clone()),
            ("DB_ROOT_PASSWORD", self.database.root_password.clone()),
            ("WP_DEBUG", self.wordpress.debug.to_string()),
            ("WP_CRON_DISABLED", self.wordpress.cron_disabled.to_string()),
            (
                "DISALLOW_FILE_EDIT",
                self.wordpress.disallow_file_edit.to_string(),
            ),
            ("WP_TITLE", self.wordpress.title.clone()),
            ("WP_ADMIN_USER", self.wordpress.admin_user.clone()),
            ("WP_ADMIN_EMAIL", self.wordpress.admin_email.clone()),
            ("DB_WAIT_TIMEOUT", self.readiness.timeout_secs.to_string()),
            ("DB_WAIT_INTERVAL", self.readiness.interval_secs.to_string()),
        ]
    }

    /// Render the configuration artifact. Output depends only on `self`.
    pub fn to_env_string(&self) -> String {
        let mut out = String::from(
            "# wpstack environment configuration\n# Generated once; edit values and run `wpstack render` to apply.\n",
        );
        for (key, value) in self.pairs() {
            let _ = writeln!(out, "{key}={}", quote_value(&value));
        }
        out
    }

    pub fn has_secrets(&self) -> bool {
        !self.database.password.is_empty() && !self.database.root_password.is_empty()
    }

    pub fn site_url(&self) -> String {
        if self.ports.web == 80 {
            "http://localhost".to_owned()
        } else {
            format!("http://localhost:{}", self.ports.web)
        }
    }
}

fn quote_value(value: &str) -> String {
    if value.is_empty()
        || value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"._-@/:".contains(&b))
    {
        value.to_owned()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn unquote_value(raw: &str) -> String {
    let v = raw.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        v[1..v.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else if v.len() >= 2 && v.starts_with('\'') && v.ends_with('\'') {
        v[1..v.len() - 1].to_owned()
    } else {
        v.to_owned()
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
        reason: "expected a non-negative integer".to_owned(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: "expected true or false".to_owned(),
        }),
    }
}

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped, an
/// optional leading `export ` is accepted, and later keys override earlier ones.
pub fn parse_pairs(input: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut pairs = BTreeMap::new();
    for (idx, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(ConfigError::MalformedLine {
                line: idx + 1,
                content: line.to_owned(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::MalformedLine {
                line: idx + 1,
                content: line.to_owned(),
            });
        }
        pairs.insert(key.to_owned(), unquote_value(value));
    }
    Ok(pairs)
}

pub fn parse_env_str(input: &str) -> Result<EnvConfig, ConfigError> {
    EnvConfig::from_pairs(&parse_pairs(input)?)
}

pub fn load_env_file(path: impl AsRef<Path>) -> Result<EnvConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_env_str(&content)
}
