//! Typed container-orchestration descriptor (`docker-compose.yml`).
//!
//! [`build`] is a pure function of [`EnvConfig`]; [`render`] is the single
//! serialization step. Maps are `BTreeMap` so the output is byte-stable.
//! Secrets are emitted as `${VAR}` references resolved by the runtime from the
//! live configuration file, so the rendered descriptor never embeds credentials.

use crate::config::EnvConfig;
use crate::types::{services, Fingerprint};
use crate::ConfigError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// Host directory names of the directory layout contract.
pub mod dirs {
    pub const CORE: &str = "wordpress";
    pub const PLUGINS: &str = "plugins";
    pub const THEMES: &str = "themes";
    pub const UPLOADS: &str = "uploads";
    pub const BACKUPS: &str = "backups";
    pub const CONFIG: &str = "config";
}

/// Container-side paths.
pub mod mounts {
    pub const HTML_ROOT: &str = "/var/www/html";
    pub const PLUGINS: &str = "/var/www/html/wp-content/plugins";
    pub const THEMES: &str = "/var/www/html/wp-content/themes";
    pub const UPLOADS: &str = "/var/www/html/wp-content/uploads";
    pub const PHP_INI: &str = "/usr/local/etc/php/conf.d/zz-wpstack.ini";
    pub const MAIL_PLUGIN: &str = "/var/www/html/wp-content/mu-plugins/wpstack-mail.php";
    pub const BACKUPS: &str = "/backups";
    pub const DB_DATA: &str = "/var/lib/mysql";
}

pub const DB_IMAGE: &str = "mariadb:11.4";
pub const PHPMYADMIN_IMAGE: &str = "phpmyadmin:5";
pub const MAILPIT_IMAGE: &str = "axllent/mailpit:latest";
pub const NETWORK: &str = "wpnet";
pub const DB_VOLUME: &str = "db_data";
pub const PHP_INI_FILE: &str = "php.ini";
pub const MAIL_PLUGIN_FILE: &str = "wpstack-mail.php";
/// SMTP port the mail-capture service listens on inside the network.
pub const MAILPIT_SMTP_PORT: u16 = 1025;

const HEADER: &str = "# Generated by wpstack from .env; do not edit by hand.\n# Run `wpstack render` after changing the configuration.\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeFile {
    pub name: String,
    pub services: BTreeMap<String, Service>,
    pub volumes: BTreeMap<String, VolumeDecl>,
    pub networks: BTreeMap<String, NetworkDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub image: String,
    pub restart: RestartPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMount>,
    pub networks: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, Dependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthProbe>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestartPolicy {
    #[serde(rename = "no")]
    No,
    #[serde(rename = "always")]
    Always,
    #[serde(rename = "unless-stopped")]
    UnlessStopped,
    #[serde(rename = "on-failure")]
    OnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    ServiceStarted,
    ServiceHealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub condition: DependencyCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthProbe {
    pub test: Vec<String>,
    #[serde(serialize_with = "as_seconds")]
    pub interval: Duration,
    #[serde(serialize_with = "as_seconds")]
    pub timeout: Duration,
    pub retries: u32,
    #[serde(serialize_with = "as_seconds")]
    pub start_period: Duration,
}

fn as_seconds<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&format_args!("{}s", d.as_secs()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountSource {
    /// Host path relative to the project directory.
    Bind(String),
    Named(String),
}

/// A `(source -> container path, read-only?)` mount, rendered in short syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub source: MountSource,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn bind(host_dir: &str, target: &str) -> Self {
        Self {
            source: MountSource::Bind(format!("./{host_dir}")),
            target: target.to_owned(),
            read_only: false,
        }
    }

    pub fn named(volume: &str, target: &str) -> Self {
        Self {
            source: MountSource::Named(volume.to_owned()),
            target: target.to_owned(),
            read_only: false,
        }
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn short_syntax(&self) -> String {
        let src = match &self.source {
            MountSource::Bind(p) | MountSource::Named(p) => p.as_str(),
        };
        if self.read_only {
            format!("{src}:{}:ro", self.target)
        } else {
            format!("{src}:{}", self.target)
        }
    }
}

impl Serialize for VolumeMount {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.short_syntax())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeDecl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDecl {
    pub driver: String,
}

impl ComposeFile {
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

fn env(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

fn depends(edges: &[(&str, DependencyCondition)]) -> BTreeMap<String, Dependency> {
    edges
        .iter()
        .map(|(name, condition)| {
            (
                (*name).to_owned(),
                Dependency {
                    condition: *condition,
                },
            )
        })
        .collect()
}

/// Mounts shared by the web application and the CLI runner. Core files and
/// uploads are always bind-mounted so they survive container recreation.
fn application_mounts() -> Vec<VolumeMount> {
    vec![
        VolumeMount::bind(dirs::CORE, mounts::HTML_ROOT),
        VolumeMount::bind(dirs::PLUGINS, mounts::PLUGINS),
        VolumeMount::bind(dirs::THEMES, mounts::THEMES),
        VolumeMount::bind(dirs::UPLOADS, mounts::UPLOADS),
        VolumeMount::bind(&format!("{}/{PHP_INI_FILE}", dirs::CONFIG), mounts::PHP_INI).read_only(),
        VolumeMount::bind(&format!("{}/{MAIL_PLUGIN_FILE}", dirs::CONFIG), mounts::MAIL_PLUGIN)
            .read_only(),
    ]
}

fn application_env(config: &EnvConfig) -> BTreeMap<String, String> {
    env(&[
        ("WORDPRESS_DB_HOST", format!("{}:3306", services::DB)),
        ("WORDPRESS_DB_NAME", config.database.name.clone()),
        ("WORDPRESS_DB_USER", config.database.user.clone()),
        ("WORDPRESS_DB_PASSWORD", "${DB_PASSWORD}".to_owned()),
        (
            "WORDPRESS_DEBUG",
            if config.wordpress.debug { "1" } else { "" }.to_owned(),
        ),
    ])
}

/// Build the descriptor for `config`. Same input, same output.
pub fn build(config: &EnvConfig) -> ComposeFile {
    use DependencyCondition::{ServiceHealthy, ServiceStarted};

    let networks = vec![NETWORK.to_owned()];
    let mut svc = BTreeMap::new();

    svc.insert(
        services::DB.to_owned(),
        Service {
            image: DB_IMAGE.to_owned(),
            restart: RestartPolicy::UnlessStopped,
            user: None,
            command: None,
            ports: Vec::new(),
            environment: env(&[
                ("MARIADB_DATABASE", config.database.name.clone()),
                ("MARIADB_USER", config.database.user.clone()),
                ("MARIADB_PASSWORD", "${DB_PASSWORD}".to_owned()),
                ("MARIADB_ROOT_PASSWORD", "${DB_ROOT_PASSWORD}".to_owned()),
            ]),
            volumes: vec![
                VolumeMount::named(DB_VOLUME, mounts::DB_DATA),
                VolumeMount::bind(dirs::BACKUPS, mounts::BACKUPS),
            ],
            networks: networks.clone(),
            depends_on: BTreeMap::new(),
            healthcheck: Some(HealthProbe {
                test: vec![
                    "CMD".to_owned(),
                    "healthcheck.sh".to_owned(),
                    "--connect".to_owned(),
                    "--innodb_initialized".to_owned(),
                ],
                interval: Duration::from_secs(10),
                timeout: Duration::from_secs(5),
                retries: 10,
                start_period: Duration::from_secs(30),
            }),
        },
    );

    svc.insert(
        services::WORDPRESS.to_owned(),
        Service {
            image: format!("wordpress:php{}-apache", config.php.version),
            restart: RestartPolicy::UnlessStopped,
            user: None,
            command: None,
            ports: vec![format!("{}:80", config.ports.web)],
            environment: application_env(config),
            volumes: application_mounts(),
            networks: networks.clone(),
            depends_on: depends(&[
                (services::DB, ServiceHealthy),
                (services::MAILPIT, ServiceStarted),
            ]),
            healthcheck: None,
        },
    );

    svc.insert(
        services::PHPMYADMIN.to_owned(),
        Service {
            image: PHPMYADMIN_IMAGE.to_owned(),
            restart: RestartPolicy::UnlessStopped,
            user: None,
            command: None,
            ports: vec![format!("{}:80", config.ports.admin_ui)],
            environment: env(&[
                ("PMA_HOST", services::DB.to_owned()),
                ("PMA_USER", "root".to_owned()),
                ("PMA_PASSWORD", "${DB_ROOT_PASSWORD}".to_owned()),
                ("UPLOAD_LIMIT", config.php.upload_max_filesize.clone()),
            ]),
            volumes: Vec::new(),
            networks: networks.clone(),
            depends_on: depends(&[(services::DB, ServiceHealthy)]),
            healthcheck: None,
        },
    );

    svc.insert(
        services::MAILPIT.to_owned(),
        Service {
            image: MAILPIT_IMAGE.to_owned(),
            restart: RestartPolicy::UnlessStopped,
            user: None,
            command: None,
            ports: vec![
                format!("{}:8025", config.ports.mail_ui),
                format!("{}:{MAILPIT_SMTP_PORT}", config.ports.mail_smtp),
            ],
            environment: BTreeMap::new(),
            volumes: Vec::new(),
            networks: networks.clone(),
            depends_on: BTreeMap::new(),
            healthcheck: None,
        },
    );

    svc.insert(
        services::WPCLI.to_owned(),
        Service {
            image: format!("wordpress:cli-php{}", config.php.version),
            restart: RestartPolicy::UnlessStopped,
            user: Some("33:33".to_owned()),
            command: Some(vec![
                "tail".to_owned(),
                "-f".to_owned(),
                "/dev/null".to_owned(),
            ]),
            ports: Vec::new(),
            environment: application_env(config),
            volumes: application_mounts(),
            networks: networks.clone(),
            depends_on: depends(&[
                (services::DB, ServiceHealthy),
                (services::WORDPRESS, ServiceStarted),
            ]),
            healthcheck: None,
        },
    );

    let mut volumes = BTreeMap::new();
    volumes.insert(DB_VOLUME.to_owned(), VolumeDecl::default());
    let mut nets = BTreeMap::new();
    nets.insert(
        NETWORK.to_owned(),
        NetworkDecl {
            driver: "bridge".to_owned(),
        },
    );

    ComposeFile {
        name: config.project_name.clone(),
        services: svc,
        volumes,
        networks: nets,
    }
}

pub fn render(descriptor: &ComposeFile) -> Result<String, ConfigError> {
    let body = serde_yaml::to_string(descriptor)?;
    Ok(format!("{HEADER}{body}"))
}

pub fn fingerprint(rendered: &str) -> Fingerprint {
    Fingerprint::new(blake3::hash(rendered.as_bytes()).to_hex().to_string())
}

/// PHP overrides mounted read-only into the application containers.
pub fn render_php_ini(config: &EnvConfig) -> String {
    format!(
        "; Generated by wpstack from .env\n\
         memory_limit = {mem}\n\
         upload_max_filesize = {upload}\n\
         post_max_size = {upload}\n\
         max_execution_time = {exec}\n\
         display_errors = {display}\n\
         log_errors = On\n\
         error_log = /dev/stderr\n",
        mem = config.php.memory_limit,
        upload = config.php.upload_max_filesize,
        exec = config.php.max_execution_time,
        display = if config.wordpress.debug { "On" } else { "Off" },
    )
}

/// Must-use plugin that routes `wp_mail` over SMTP to the mail-capture
/// service. The application images ship no sendmail binary, so PHP's
/// `mail()` cannot deliver on its own.
pub fn render_mail_plugin() -> String {
    format!(
        "<?php\n\
         /**\n \
         * Plugin Name: wpstack mail capture\n \
         * Description: Generated by wpstack. Sends all mail to {host}:{port}.\n \
         */\n\
         \n\
         add_action('phpmailer_init', static function ($phpmailer) {{\n    \
             $phpmailer->isSMTP();\n    \
             $phpmailer->Host = '{host}';\n    \
             $phpmailer->Port = {port};\n    \
             $phpmailer->SMTPAuth = false;\n    \
             $phpmailer->SMTPSecure = '';\n    \
             $phpmailer->SMTPAutoTLS = false;\n\
         }});\n",
        host = services::MAILPIT,
        port = MAILPIT_SMTP_PORT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets;

    fn live_config() -> EnvConfig {
        EnvConfig::default().with_secrets(&secrets::generate())
    }

    #[test]
    fn build_is_deterministic() {
        let cfg = live_config();
        let a = render(&build(&cfg)).unwrap();
        let b = render(&build(&cfg)).unwrap();
        assert_eq!(a, b);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn rendered_descriptor_contains_no_live_secrets() {
        let cfg = live_config();
        let out = render(&build(&cfg)).unwrap();
        assert!(!out.contains(&cfg.database.password));
        assert!(!out.contains(&cfg.database.root_password));
        assert!(out.contains("${DB_PASSWORD}"));
    }

    #[test]
    fn secrets_do_not_affect_fingerprint() {
        let a = render(&build(&live_config())).unwrap();
        let b = render(&build(&live_config())).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn port_change_changes_output() {
        let mut cfg = EnvConfig::default();
        let a = render(&build(&cfg)).unwrap();
        cfg.ports.web = 9999;
        let b = render(&build(&cfg)).unwrap();
        assert_ne!(a, b);
        assert!(b.contains("9999:80"));
    }

    #[test]
    fn all_managed_services_present() {
        let d = build(&EnvConfig::default());
        for name in services::ALL {
            assert!(d.services.contains_key(name), "missing service {name}");
        }
    }

    #[test]
    fn database_has_health_probe_and_dependents_wait_for_healthy() {
        let d = build(&EnvConfig::default());
        assert!(d.services[services::DB].healthcheck.is_some());
        for dependent in [services::WORDPRESS, services::PHPMYADMIN, services::WPCLI] {
            let dep = d.services[dependent].depends_on[services::DB];
            assert_eq!(dep.condition, DependencyCondition::ServiceHealthy);
        }
        assert_eq!(
            d.services[services::WPCLI].depends_on[services::WORDPRESS].condition,
            DependencyCondition::ServiceStarted
        );
    }

    #[test]
    fn application_state_is_always_mounted() {
        let d = build(&EnvConfig::default());
        for name in [services::WORDPRESS, services::WPCLI] {
            let targets: Vec<&str> = d.services[name]
                .volumes
                .iter()
                .map(|m| m.target.as_str())
                .collect();
            assert!(targets.contains(&mounts::HTML_ROOT));
            assert!(targets.contains(&mounts::UPLOADS));
        }
        let db_mounts = &d.services[services::DB].volumes;
        assert!(db_mounts
            .iter()
            .any(|m| m.source == MountSource::Named(DB_VOLUME.to_owned())));
    }

    #[test]
    fn volume_mount_short_syntax() {
        assert_eq!(
            VolumeMount::bind("config/php.ini", "/etc/php.ini")
                .read_only()
                .short_syntax(),
            "./config/php.ini:/etc/php.ini:ro"
        );
        assert_eq!(
            VolumeMount::named("db_data", "/var/lib/mysql").short_syntax(),
            "db_data:/var/lib/mysql"
        );
    }

    #[test]
    fn rendered_yaml_uses_compose_spellings() {
        let out = render(&build(&EnvConfig::default())).unwrap();
        assert!(out.starts_with("# Generated by wpstack"));
        assert!(out.contains("unless-stopped"));
        assert!(out.contains("service_healthy"));
        assert!(out.contains("service_started"));
        assert!(out.contains("start_period: 30s"));
    }

    #[test]
    fn php_ini_reflects_limits() {
        let mut cfg = EnvConfig::default();
        cfg.php.memory_limit = "512M".to_owned();
        cfg.wordpress.debug = false;
        let ini = render_php_ini(&cfg);
        assert!(ini.contains("memory_limit = 512M"));
        assert!(ini.contains("display_errors = Off"));
        assert!(!ini.contains("SMTP"));
    }

    #[test]
    fn mail_plugin_points_phpmailer_at_mail_capture() {
        let php = render_mail_plugin();
        assert!(php.starts_with("<?php\n"));
        assert!(php.contains("add_action('phpmailer_init'"));
        assert!(php.contains("$phpmailer->isSMTP();"));
        assert!(php.contains("$phpmailer->Host = 'mailpit';"));
        assert!(php.contains("$phpmailer->Port = 1025;"));
    }

    #[test]
    fn mail_plugin_is_mounted_into_application_containers() {
        let d = build(&EnvConfig::default());
        for name in [services::WORDPRESS, services::WPCLI] {
            let mount = d.services[name]
                .volumes
                .iter()
                .find(|m| m.target == mounts::MAIL_PLUGIN)
                .unwrap_or_else(|| panic!("{name} lacks the mail plugin mount"));
            assert!(mount.read_only);
            assert_eq!(
                mount.source,
                MountSource::Bind("./config/wpstack-mail.php".to_owned())
            );
        }
    }
}
