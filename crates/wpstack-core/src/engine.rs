use crate::artifacts::SideEffect;
use crate::concurrency::ProjectLock;
use crate::health::HealthReport;
use crate::lifecycle::validate_transition;
use crate::wait::{wait_until, WaitOutcome, WaitPolicy};
use crate::CoreError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use wpstack_runtime::{
    ContainerRuntime, ExecOutput, ExecRequest, GitCli, ProjectSpec, ServiceStatus, Vcs,
};
use wpstack_schema::descriptor::mounts;
use wpstack_schema::secrets::random_token;
use wpstack_schema::{
    create_config, load_env_file, render_mail_plugin, render_php_ini, services, write_atomic,
    CreateStatus, EnvConfig, Fingerprint,
};
use wpstack_store::{EnvRecord, EnvState, ProjectLayout, StateStore};

/// Literal the operator must type to confirm `clean`.
pub const CLEAN_CONFIRMATION: &str = "yes";

const DB_LOG_TAIL: usize = 30;
const ADMIN_PASSWORD_LENGTH: usize = 20;

/// Lifecycle orchestrator for one project directory.
///
/// Every mutating operation holds the project lock for its whole duration and
/// records lifecycle transitions in the project's state file. Containers are
/// only ever touched through the injected [`ContainerRuntime`].
pub struct Engine {
    layout: ProjectLayout,
    state: StateStore,
    runtime: Arc<dyn ContainerRuntime>,
    vcs: Arc<dyn Vcs>,
    wait_policy: Option<WaitPolicy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub fingerprint: Fingerprint,
    pub descriptor_changed: bool,
    pub php_ini_changed: bool,
    pub mail_plugin_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub config: CreateStatus,
    pub project_name: String,
    pub site_url: String,
    pub render: RenderReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: EnvState,
    pub updated_at: String,
    pub db_ready_at: Option<String>,
    pub descriptor: Option<Fingerprint>,
    pub runtime: String,
    pub services: Vec<ServiceStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpReport {
    pub fingerprint: Fingerprint,
    pub descriptor_changed: bool,
    pub site_url: String,
    pub readiness_attempts: u32,
    pub waited_ms: u64,
    pub health: HealthReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub core_downloaded: bool,
    /// Whether first-run installation happened in this call.
    pub installed: bool,
    pub site_url: String,
    pub admin_user: String,
    /// Only present when `installed` is true. Never persisted.
    pub admin_password: Option<String>,
    pub permissions: SideEffect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CleanOutcome {
    /// The confirmation token did not match; nothing was touched.
    Cancelled,
    Cleaned { removed: Vec<PathBuf> },
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let layout = ProjectLayout::new(root);
        let state = StateStore::new(layout.clone());
        Self {
            layout,
            state,
            runtime,
            vcs: Arc::new(GitCli::new()),
            wait_policy: None,
        }
    }

    #[must_use]
    pub fn with_vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = vcs;
        self
    }

    /// Override the readiness timeout and interval from the configuration.
    #[must_use]
    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = Some(policy);
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    pub(crate) fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    pub(crate) fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    pub(crate) fn state_store(&self) -> &StateStore {
        &self.state
    }

    pub(crate) fn lock(&self) -> Result<ProjectLock, CoreError> {
        ProjectLock::try_acquire(&self.layout.lock_file())?.ok_or_else(|| {
            CoreError::Precondition(
                "another wpstack operation is running in this project".to_owned(),
            )
        })
    }

    /// Load the live configuration. Fails if the project was never initialized.
    pub fn config(&self) -> Result<EnvConfig, CoreError> {
        let path = self.layout.env_file();
        if !path.exists() {
            return Err(CoreError::Precondition(format!(
                "no configuration at {}; run `wpstack init` first",
                path.display()
            )));
        }
        Ok(load_env_file(&path)?)
    }

    pub(crate) fn project_spec(&self, config: &EnvConfig) -> ProjectSpec {
        ProjectSpec {
            name: config.project_name.clone(),
            root: self.layout.root().to_path_buf(),
            compose_file: self.layout.compose_file(),
            env_file: self.layout.env_file(),
            services: wpstack_schema::build(config).service_names(),
        }
    }

    pub(crate) fn require_running(
        &self,
        project: &ProjectSpec,
        service: &str,
    ) -> Result<(), CoreError> {
        if self.runtime.is_running(project, service)? {
            Ok(())
        } else {
            Err(CoreError::Precondition(format!(
                "service '{service}' is not running; run `wpstack up` first"
            )))
        }
    }

    pub(crate) fn running_project(
        &self,
        service: &str,
    ) -> Result<(EnvConfig, ProjectSpec), CoreError> {
        let config = self.config()?;
        let project = self.project_spec(&config);
        self.require_running(&project, service)?;
        Ok((config, project))
    }

    fn transition(&self, to: EnvState) -> Result<EnvRecord, CoreError> {
        let current = self.state.get()?;
        validate_transition(current.state, to)?;
        debug!("state {} -> {to}", current.state);
        Ok(self.state.update_state(to)?)
    }

    /// Create the directory layout, the live and redacted configuration, and
    /// the rendered descriptor. An existing configuration is kept as is.
    pub fn init(&self, regenerate_secrets: bool) -> Result<InitReport, CoreError> {
        let _lock = self.lock()?;
        self.init_locked(regenerate_secrets)
    }

    fn init_locked(&self, regenerate_secrets: bool) -> Result<InitReport, CoreError> {
        info!("initializing project at {}", self.layout.root().display());
        self.layout.initialize()?;
        let before = self.state.get()?.state;

        let outcome = create_config(
            &self.layout.env_file(),
            &self.layout.env_template(),
            &EnvConfig::default(),
            regenerate_secrets,
        )?;

        if before == EnvState::Absent {
            validate_transition(before, EnvState::Created)?;
            self.state.put(&EnvRecord::new(EnvState::Created))?;
        }
        let render = self.render_with(&outcome.config)?;

        Ok(InitReport {
            config: outcome.status,
            project_name: outcome.config.project_name.clone(),
            site_url: outcome.config.site_url(),
            render,
        })
    }

    /// Re-render the descriptor and PHP settings from the current configuration.
    pub fn render(&self) -> Result<RenderReport, CoreError> {
        let _lock = self.lock()?;
        let config = self.config()?;
        self.render_with(&config)
    }

    fn render_with(&self, config: &EnvConfig) -> Result<RenderReport, CoreError> {
        let rendered = wpstack_schema::render(&wpstack_schema::build(config))?;
        let fingerprint = wpstack_schema::fingerprint(&rendered);

        let descriptor_changed = write_if_changed(&self.layout.compose_file(), &rendered)?;
        if descriptor_changed {
            info!("wrote {}", self.layout.compose_file().display());
        }
        let php_ini_changed = write_if_changed(&self.layout.php_ini(), &render_php_ini(config))?;
        let mail_plugin_changed =
            write_if_changed(&self.layout.mail_plugin(), &render_mail_plugin())?;
        self.state.set_descriptor(fingerprint.clone())?;

        Ok(RenderReport {
            fingerprint,
            descriptor_changed,
            php_ini_changed,
            mail_plugin_changed,
        })
    }

    pub fn status(&self) -> Result<StatusReport, CoreError> {
        let record = self.state.get()?;
        let services = if record.state == EnvState::Absent {
            Vec::new()
        } else {
            match self.config() {
                Ok(config) => self
                    .runtime
                    .status(&self.project_spec(&config))
                    .unwrap_or_else(|e| {
                        warn!("cannot query service status: {e}");
                        Vec::new()
                    }),
                Err(e) => {
                    warn!("{e}");
                    Vec::new()
                }
            }
        };
        Ok(StatusReport {
            state: record.state,
            updated_at: record.updated_at,
            db_ready_at: record.db_ready_at,
            descriptor: record.descriptor,
            runtime: self.runtime.name().to_owned(),
            services,
        })
    }

    /// Start every service and block until the database answers a query.
    ///
    /// On timeout the environment is left in `degraded-wait` and the error
    /// carries the database's most recent log lines.
    pub fn up(&self) -> Result<UpReport, CoreError> {
        let _lock = self.lock()?;
        if !self.layout.is_created() {
            info!("project not initialized; running init first");
            self.init_locked(false)?;
        }
        let config = self.config()?;
        if !config.has_secrets() {
            return Err(CoreError::Precondition(format!(
                "{} has no database credentials; run `wpstack init --regenerate-secrets`",
                self.layout.env_file().display()
            )));
        }

        let render = self.render_with(&config)?;
        if render.descriptor_changed {
            info!("descriptor changed since the last render; services will be recreated");
        }
        let project = self.project_spec(&config);

        self.transition(EnvState::Starting)?;
        info!("starting services for {}", project.name);
        self.runtime.up(&project)?;
        self.transition(EnvState::DegradedWait)?;

        let (attempts, waited) = self.wait_for_database(&config, &project)?;
        self.state.mark_db_ready()?;
        let record = self.transition(EnvState::Ready)?;

        let health = self.health_sweep(&config, &project, &record);
        if !health.healthy {
            warn!("environment is up but some health checks failed; run `wpstack health`");
        }

        Ok(UpReport {
            fingerprint: render.fingerprint,
            descriptor_changed: render.descriptor_changed,
            site_url: config.site_url(),
            readiness_attempts: attempts,
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            health,
        })
    }

    fn wait_for_database(
        &self,
        config: &EnvConfig,
        project: &ProjectSpec,
    ) -> Result<(u32, Duration), CoreError> {
        let policy = self
            .wait_policy
            .unwrap_or_else(|| WaitPolicy::from(&config.readiness));
        info!("waiting up to {:?} for the database", policy.timeout);
        let give_up_at = Instant::now() + policy.timeout;

        let outcome = wait_until(&policy, || {
            let left = give_up_at.saturating_duration_since(Instant::now());
            let ping = db_ping(left.clamp(Duration::from_secs(1), PING_LIMIT));
            self.runtime
                .exec(project, &ping)
                .is_ok_and(|out| out.success())
        });
        match outcome {
            WaitOutcome::Ready { attempts, elapsed } => Ok((attempts, elapsed)),
            WaitOutcome::TimedOut { elapsed, attempts } => {
                warn!("database did not answer after {attempts} attempt(s)");
                let recent_logs = self
                    .runtime
                    .logs(project, Some(services::DB), DB_LOG_TAIL)
                    .map(|text| text.lines().map(str::to_owned).collect())
                    .unwrap_or_else(|e| {
                        warn!("cannot read database logs: {e}");
                        Vec::new()
                    });
                Err(CoreError::Timeout {
                    service: services::DB.to_owned(),
                    waited_secs: elapsed.as_secs(),
                    recent_logs,
                })
            }
            WaitOutcome::Interrupted { .. } => {
                Err(CoreError::Interrupted(services::DB.to_owned()))
            }
        }
    }

    /// Confirm the database answered since the most recent `up`, waiting again
    /// if it has not.
    fn ensure_database_ready(
        &self,
        config: &EnvConfig,
        project: &ProjectSpec,
    ) -> Result<(), CoreError> {
        self.require_running(project, services::DB)?;
        let record = self.state.get()?;
        if record.state == EnvState::Ready && record.db_ready_at.is_some() {
            return Ok(());
        }
        info!(
            "database readiness not confirmed (state: {}); waiting",
            record.state
        );
        if !matches!(record.state, EnvState::Starting | EnvState::DegradedWait) {
            self.transition(EnvState::Starting)?;
        }
        if self.state.get()?.state == EnvState::Starting {
            self.transition(EnvState::DegradedWait)?;
        }
        self.wait_for_database(config, project)?;
        self.state.mark_db_ready()?;
        self.transition(EnvState::Ready)?;
        Ok(())
    }

    /// Stop and remove containers. Named volumes and bind-mounted directories
    /// are kept.
    pub fn down(&self) -> Result<EnvState, CoreError> {
        let _lock = self.lock()?;
        if self.state.get()?.state == EnvState::Absent {
            warn!("project is not initialized; nothing to stop");
            return Ok(EnvState::Absent);
        }
        let config = self.config()?;
        if !self.layout.compose_file().exists() {
            self.render_with(&config)?;
        }
        let project = self.project_spec(&config);

        self.transition(EnvState::Stopping)?;
        info!("stopping services for {}", project.name);
        self.runtime.down(&project, false)?;
        self.transition(EnvState::Stopped)?;
        Ok(EnvState::Stopped)
    }

    /// `down` followed by `up`, with the failure semantics of each.
    pub fn restart(&self) -> Result<UpReport, CoreError> {
        self.down()?;
        self.up()
    }

    /// Materialize core files, write the application configuration, run
    /// first-time installation, and open up file permissions. Safe to re-run.
    pub fn install(&self) -> Result<InstallReport, CoreError> {
        let _lock = self.lock()?;
        let config = self.config()?;
        let project = self.project_spec(&config);
        self.ensure_database_ready(&config, &project)?;
        self.require_running(&project, services::WPCLI)?;

        let core_downloaded = if self.layout.core_marker().exists() {
            debug!("core files present");
            false
        } else {
            info!("downloading application core files");
            self.wp_checked(&project, &["core", "download", "--force"], "core download")?;
            true
        };

        info!("writing application configuration");
        let db = &config.database;
        let dbname = format!("--dbname={}", db.name);
        let dbuser = format!("--dbuser={}", db.user);
        let dbhost = format!("--dbhost={}", services::DB);
        self.wp_with_input(
            &project,
            &[
                "config",
                "create",
                dbname.as_str(),
                dbuser.as_str(),
                dbhost.as_str(),
                "--prompt=dbpass",
                "--force",
                "--skip-check",
            ],
            &db.password,
            "config create",
        )?;
        let wp = &config.wordpress;
        for (constant, enabled) in [
            ("WP_DEBUG", wp.debug),
            ("DISABLE_WP_CRON", wp.cron_disabled),
            ("DISALLOW_FILE_EDIT", wp.disallow_file_edit),
        ] {
            let value = if enabled { "true" } else { "false" };
            self.wp_checked(
                &project,
                &["config", "set", constant, value, "--raw", "--type=constant"],
                "config set",
            )?;
        }

        let already_installed = self
            .runtime
            .exec(&project, &wp_request(&["core", "is-installed"]))?
            .success();
        let admin_password = if already_installed {
            info!("application already installed; skipping first-run install");
            None
        } else {
            info!("running first-run installation");
            let password = random_token(ADMIN_PASSWORD_LENGTH);
            let url = format!("--url={}", config.site_url());
            let title = format!("--title={}", wp.title);
            let user = format!("--admin_user={}", wp.admin_user);
            let email = format!("--admin_email={}", wp.admin_email);
            self.wp_with_input(
                &project,
                &[
                    "core",
                    "install",
                    url.as_str(),
                    title.as_str(),
                    user.as_str(),
                    email.as_str(),
                    "--prompt=admin_password",
                    "--skip-email",
                ],
                &password,
                "core install",
            )?;
            Some(password)
        };

        let permissions = self.normalize_permissions(&project);

        Ok(InstallReport {
            core_downloaded,
            installed: admin_password.is_some(),
            site_url: config.site_url(),
            admin_user: wp.admin_user.clone(),
            admin_password,
            permissions,
        })
    }

    fn normalize_permissions(&self, project: &ProjectSpec) -> SideEffect {
        let request = ExecRequest::new(
            services::WORDPRESS,
            ["chmod", "-R", "a+rwX", mounts::HTML_ROOT],
        )
        .as_user("root");
        match self.runtime.exec(project, &request) {
            Ok(out) if out.success() => SideEffect::Ok,
            Ok(out) => {
                let reason = format!("chmod exited with {}: {}", out.code, out.stderr.trim());
                warn!("permission normalization failed: {reason}");
                SideEffect::Failed(reason)
            }
            Err(e) => {
                warn!("permission normalization failed: {e}");
                SideEffect::Failed(e.to_string())
            }
        }
    }

    pub(crate) fn wp_checked(
        &self,
        project: &ProjectSpec,
        args: &[&str],
        what: &str,
    ) -> Result<ExecOutput, CoreError> {
        Ok(self.runtime.exec(project, &wp_request(args))?.check(what)?)
    }

    /// Run a `wp` command that reads a `--prompt` value from stdin, so the
    /// secret never appears in a process argument list.
    fn wp_with_input(
        &self,
        project: &ProjectSpec,
        args: &[&str],
        secret: &str,
        what: &str,
    ) -> Result<ExecOutput, CoreError> {
        let mut input = format!("{secret}\n").into_bytes();
        let mut reader: &[u8] = input.as_slice();
        let out = self
            .runtime
            .exec_with_input(project, &wp_request(args), &mut reader)?;
        input.fill(0);
        Ok(out.check(what)?)
    }

    /// Remove containers, volumes, and generated content. Proceeds only when
    /// `confirmation` is exactly [`CLEAN_CONFIRMATION`]; anything else is a
    /// reported cancellation. Plugins, themes, backups and the redacted
    /// template always survive; the live configuration survives with `keep_config`.
    pub fn clean(&self, confirmation: &str, keep_config: bool) -> Result<CleanOutcome, CoreError> {
        if confirmation.trim() != CLEAN_CONFIRMATION {
            info!("clean cancelled");
            return Ok(CleanOutcome::Cancelled);
        }
        let lock = self.lock()?;

        if self.layout.is_created() {
            let config = self.config()?;
            if !self.layout.compose_file().exists() {
                self.render_with(&config)?;
            }
            let project = self.project_spec(&config);
            info!("removing containers and volumes for {}", project.name);
            self.runtime.down(&project, true)?;
        }

        let mut targets = self.layout.generated_content();
        if !keep_config {
            targets.push(self.layout.env_file());
        }
        let mut removed = Vec::new();
        for path in targets {
            if remove_path(&path)? {
                debug!("removed {}", path.display());
                removed.push(path);
            }
        }
        drop(lock);
        Ok(CleanOutcome::Cleaned { removed })
    }

    pub fn shell(&self) -> Result<i32, CoreError> {
        let (_config, project) = self.running_project(services::WORDPRESS)?;
        Ok(self
            .runtime
            .exec_interactive(&project, &ExecRequest::new(services::WORDPRESS, ["bash"]))?)
    }

    pub fn db_shell(&self) -> Result<i32, CoreError> {
        let (_config, project) = self.running_project(services::DB)?;
        let request = ExecRequest::new(
            services::DB,
            [
                "sh",
                "-c",
                "MYSQL_PWD=\"$MARIADB_ROOT_PASSWORD\" exec mariadb -uroot \"$MARIADB_DATABASE\"",
            ],
        );
        Ok(self.runtime.exec_interactive(&project, &request)?)
    }

    fn logs_project(&self, service: Option<&str>) -> Result<ProjectSpec, CoreError> {
        let config = self.config()?;
        let project = self.project_spec(&config);
        if let Some(s) = service {
            if !project.services.iter().any(|known| known == s) {
                return Err(CoreError::Precondition(format!(
                    "unknown service '{s}' (expected one of: {})",
                    project.services.join(", ")
                )));
            }
        }
        Ok(project)
    }

    pub fn logs(&self, service: Option<&str>, tail: usize) -> Result<String, CoreError> {
        let project = self.logs_project(service)?;
        Ok(self.runtime.logs(&project, service, tail)?)
    }

    pub fn follow_logs(&self, service: Option<&str>, tail: usize) -> Result<i32, CoreError> {
        let project = self.logs_project(service)?;
        Ok(self.runtime.follow_logs(&project, service, tail)?)
    }

    /// Run `wp <args>` in the CLI container attached to the terminal.
    pub fn wp(&self, args: &[String]) -> Result<i32, CoreError> {
        let (_config, project) = self.running_project(services::WPCLI)?;
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok(self
            .runtime
            .exec_interactive(&project, &wp_request(&argv))?)
    }

    /// Rewrite `old` to `new` across every table, including serialized data.
    pub fn search_replace(&self, old: &str, new: &str) -> Result<ExecOutput, CoreError> {
        if old.is_empty() {
            return Err(CoreError::Precondition(
                "search string must not be empty".to_owned(),
            ));
        }
        if old == new {
            return Err(CoreError::Precondition(
                "search and replacement strings are identical".to_owned(),
            ));
        }
        let (_config, project) = self.running_project(services::WPCLI)?;
        info!("replacing '{old}' with '{new}' in all tables");
        self.wp_checked(
            &project,
            &["search-replace", old, new, "--all-tables", "--report-changed-only"],
            "search-replace",
        )
    }

    /// Run every cron event that is due now.
    pub fn cron_run(&self) -> Result<ExecOutput, CoreError> {
        let (_config, project) = self.running_project(services::WPCLI)?;
        self.wp_checked(&project, &["cron", "event", "run", "--due-now"], "cron run")
    }
}

pub(crate) fn wp_request(args: &[&str]) -> ExecRequest {
    ExecRequest::new(
        services::WPCLI,
        std::iter::once("wp").chain(args.iter().copied()),
    )
}

/// Longest a single readiness query may take before it counts as a failure.
pub(crate) const PING_LIMIT: Duration = Duration::from_secs(5);

/// `SELECT 1` as the database root user, bounded by `limit` both inside the
/// container (client connect timeout) and around the exec call itself. The
/// password is read from the container's own environment and every value is a
/// positional argument, so nothing is interpolated into the script.
pub(crate) fn db_ping(limit: Duration) -> ExecRequest {
    let secs = limit.as_secs().max(1).to_string();
    ExecRequest::new(
        services::DB,
        [
            "sh",
            "-c",
            "MYSQL_PWD=\"$MARIADB_ROOT_PASSWORD\" exec mariadb -uroot --connect-timeout=\"$1\" -e \"$2\"",
            "sh",
            secs.as_str(),
            "SELECT 1",
        ],
    )
    .with_deadline(limit)
}

fn write_if_changed(path: &Path, content: &str) -> Result<bool, CoreError> {
    if std::fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    write_atomic(path, content)?;
    Ok(true)
}

fn remove_path(path: &Path) -> Result<bool, CoreError> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path)?,
        Ok(_) => std::fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wp_request_prefixes_binary() {
        let req = wp_request(&["core", "version"]);
        assert_eq!(req.service, services::WPCLI);
        assert_eq!(req.argv, vec!["wp", "core", "version"]);
    }

    #[test]
    fn db_ping_passes_sql_as_argument() {
        let req = db_ping(PING_LIMIT);
        assert_eq!(req.service, services::DB);
        assert_eq!(req.argv.last().map(String::as_str), Some("SELECT 1"));
        assert!(!req.argv[2].contains("SELECT"));
    }

    #[test]
    fn db_ping_is_bounded_inside_and_outside_the_container() {
        let req = db_ping(Duration::from_secs(3));
        assert_eq!(req.deadline, Some(Duration::from_secs(3)));
        assert!(req.argv[2].contains("--connect-timeout=\"$1\""));
        assert_eq!(req.argv[4], "3");

        let short = db_ping(Duration::from_millis(200));
        assert_eq!(short.argv[4], "1");
    }

    #[test]
    fn remove_path_handles_files_dirs_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        let sub = dir.path().join("d");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir_all(sub.join("nested")).unwrap();
        assert!(remove_path(&file).unwrap());
        assert!(remove_path(&sub).unwrap());
        assert!(!remove_path(&dir.path().join("missing")).unwrap());
    }

    #[test]
    fn write_if_changed_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yml");
        assert!(write_if_changed(&path, "a").unwrap());
        assert!(!write_if_changed(&path, "a").unwrap());
        assert!(write_if_changed(&path, "b").unwrap());
    }
}
