use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wpstack_core::{
    CheckStatus, CleanOutcome, CoreError, Engine, ErrorKind, ProjectLock, WaitPolicy,
};
use wpstack_runtime::{ExecOutput, ExecRequest, MockRuntime};
use wpstack_store::EnvState;

fn fast_policy() -> WaitPolicy {
    WaitPolicy::new(Duration::from_millis(300), Duration::from_millis(20))
}

fn engine_with(root: &Path, mock: &Arc<MockRuntime>) -> Engine {
    Engine::new(root, mock.clone()).with_wait_policy(fast_policy())
}

fn is_db_ping(req: &ExecRequest) -> bool {
    req.service == "db" && req.argv.last().is_some_and(|a| a == "SELECT 1")
}

fn is_dump(req: &ExecRequest) -> bool {
    req.service == "db" && req.argv.iter().any(|a| a.contains("mariadb-dump"))
}

/// Mock whose database dump writes a compressed file into the host backups
/// directory, the way the bind mount would.
fn mock_with_dump(backups: PathBuf) -> MockRuntime {
    MockRuntime::new().with_responder(move |req, _input| {
        if !is_dump(req) {
            return None;
        }
        let container_path = req.argv.get(4)?;
        let name = Path::new(container_path).file_name()?;
        let host = backups.join(format!("{}.gz", name.to_string_lossy()));
        std::fs::write(host, b"\x1f\x8b fake dump").ok()?;
        Some(ExecOutput::ok(""))
    })
}

fn state_of(engine: &Engine) -> EnvState {
    engine.status().unwrap().state
}

#[test]
fn init_is_idempotent_and_keeps_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);

    let first = engine.init(false).unwrap();
    let password = engine.config().unwrap().database.password;
    assert!(!password.is_empty());
    assert!(first.render.descriptor_changed);

    let second = engine.init(false).unwrap();
    assert_eq!(engine.config().unwrap().database.password, password);
    assert!(!second.render.descriptor_changed);
    assert_eq!(first.render.fingerprint, second.render.fingerprint);
    assert_eq!(state_of(&engine), EnvState::Created);

    let template = std::fs::read_to_string(engine.layout().env_template()).unwrap();
    assert!(!template.contains(&password));
}

#[test]
fn init_writes_mail_capture_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));

    let first = engine.init(false).unwrap();
    assert!(first.render.mail_plugin_changed);
    let plugin = std::fs::read_to_string(engine.layout().mail_plugin()).unwrap();
    assert!(plugin.contains("phpmailer_init"));
    assert!(plugin.contains("'mailpit'"));

    let compose = std::fs::read_to_string(engine.layout().compose_file()).unwrap();
    assert!(compose.contains(
        "./config/wpstack-mail.php:/var/www/html/wp-content/mu-plugins/wpstack-mail.php:ro"
    ));

    assert!(!engine.render().unwrap().mail_plugin_changed);
}

#[test]
fn regenerate_changes_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));
    engine.init(false).unwrap();
    let before = engine.config().unwrap().database.password;
    engine.init(true).unwrap();
    assert_ne!(engine.config().unwrap().database.password, before);
}

#[test]
fn up_on_fresh_directory_reaches_ready() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);

    let report = engine.up().unwrap();
    assert!(engine.layout().compose_file().exists());
    assert!(report.readiness_attempts >= 1);
    assert!(report.health.healthy);

    let status = engine.status().unwrap();
    assert_eq!(status.state, EnvState::Ready);
    assert!(status.db_ready_at.is_some());
    assert_eq!(status.descriptor, Some(report.fingerprint));
    assert!(status.services.iter().all(|s| s.running));
    assert_eq!(mock.calls().first().map(String::as_str), Some("up"));
}

#[test]
fn every_readiness_query_carries_a_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let mock = Arc::new(MockRuntime::new().with_responder(move |req, _| {
        if !is_db_ping(req) {
            return None;
        }
        recorder.lock().unwrap().push(req.deadline);
        // Stand in for a client that never answered and was killed.
        Some(ExecOutput::failed(124, "killed"))
    }));
    let engine = engine_with(dir.path(), &mock);

    let started = Instant::now();
    let err = engine.up().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));

    let deadlines = seen.lock().unwrap().clone();
    assert!(!deadlines.is_empty());
    for deadline in deadlines {
        let limit = deadline.expect("readiness query without a deadline");
        assert!(limit >= Duration::from_secs(1) && limit <= Duration::from_secs(5));
    }
}

#[test]
fn readiness_timeout_leaves_degraded_wait_with_logs() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRuntime::new()
            .with_logs("db", "[ERROR] InnoDB: Cannot allocate memory\n")
            .with_responder(|req, _| {
                is_db_ping(req).then(|| ExecOutput::failed(1, "Can't connect to server"))
            }),
    );
    let engine = engine_with(dir.path(), &mock);

    let err = engine.up().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    match &err {
        CoreError::Timeout {
            service,
            recent_logs,
            ..
        } => {
            assert_eq!(service, "db");
            assert!(recent_logs.iter().any(|l| l.contains("InnoDB")));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.user_message().starts_with("timed out:"));

    let status = engine.status().unwrap();
    assert_eq!(status.state, EnvState::DegradedWait);
    assert!(status.db_ready_at.is_none());

    // A later `up` with a healthy database resolves the environment.
    let healthy = Arc::new(MockRuntime::new());
    let retry = engine_with(dir.path(), &healthy);
    retry.up().unwrap();
    assert_eq!(state_of(&retry), EnvState::Ready);
}

#[test]
fn down_then_up_matches_restart() {
    let a = tempfile::tempdir().unwrap();
    let mock_a = Arc::new(MockRuntime::new());
    let engine_a = engine_with(a.path(), &mock_a);
    engine_a.up().unwrap();
    engine_a.down().unwrap();
    engine_a.up().unwrap();

    let b = tempfile::tempdir().unwrap();
    let mock_b = Arc::new(MockRuntime::new());
    let engine_b = engine_with(b.path(), &mock_b);
    engine_b.up().unwrap();
    engine_b.restart().unwrap();

    assert_eq!(state_of(&engine_a), state_of(&engine_b));
    assert_eq!(state_of(&engine_b), EnvState::Ready);
    assert_eq!(mock_a.calls(), mock_b.calls());
}

#[test]
fn down_keeps_volumes_and_reports_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);
    engine.up().unwrap();

    assert_eq!(engine.down().unwrap(), EnvState::Stopped);
    assert!(mock.calls().contains(&"down".to_owned()));
    assert!(!mock.calls().contains(&"down -v".to_owned()));
    assert!(engine.status().unwrap().services.is_empty());
}

#[test]
fn down_on_uninitialized_project_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);

    assert_eq!(engine.down().unwrap(), EnvState::Absent);
    assert!(mock.calls().is_empty());
}

#[test]
fn concurrent_operation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));
    engine.init(false).unwrap();

    let _held = ProjectLock::try_acquire(&engine.layout().lock_file()).unwrap().unwrap();
    let err = engine.up().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn install_requires_running_environment() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));
    engine.init(false).unwrap();

    let err = engine.install().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn fresh_install_generates_password_and_keeps_secrets_off_argv() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new().with_responder(|req, _| {
        req.argv
            .iter()
            .any(|a| a == "is-installed")
            .then(|| ExecOutput::failed(1, ""))
    }));
    let engine = engine_with(dir.path(), &mock);
    engine.up().unwrap();
    let db_password = engine.config().unwrap().database.password;

    let report = engine.install().unwrap();
    assert!(report.installed);
    assert!(report.core_downloaded);
    assert!(report.permissions.is_ok());
    let admin_password = report.admin_password.unwrap();
    assert_eq!(admin_password.len(), 20);

    let calls = mock.calls();
    assert!(calls.iter().any(|c| c.contains("core download")));
    assert!(calls.iter().any(|c| c.contains("core install")));
    assert!(calls.iter().any(|c| c.contains("chmod -R a+rwX")));
    assert!(calls
        .iter()
        .all(|c| !c.contains(&db_password) && !c.contains(&admin_password)));

    let inputs: Vec<String> = mock
        .inputs()
        .into_iter()
        .map(|b| String::from_utf8(b).unwrap())
        .collect();
    assert!(inputs.contains(&format!("{db_password}\n")));
    assert!(inputs.contains(&format!("{admin_password}\n")));
}

#[test]
fn install_on_installed_site_skips_first_run() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);
    engine.up().unwrap();

    let report = engine.install().unwrap();
    assert!(!report.installed);
    assert!(report.admin_password.is_none());
    assert!(!mock.calls().iter().any(|c| c.contains("core install")));
}

#[test]
fn health_fails_when_database_stops() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);
    engine.up().unwrap();
    assert!(engine.health().unwrap().healthy);

    mock.stop_service("db");
    let report = engine.health().unwrap();
    assert!(!report.healthy);
    assert!(report
        .failed()
        .any(|c| c.name == "database" || c.name == "service:db"));
    assert_eq!(state_of(&engine), EnvState::Ready);
}

#[test]
fn health_without_readiness_confirmation_fails_database_check() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);
    engine.init(false).unwrap();

    let report = engine.health().unwrap();
    let db = report.checks.iter().find(|c| c.name == "database").unwrap();
    assert_eq!(db.status, CheckStatus::Fail);
    assert!(!report.healthy);
}

#[test]
fn backup_then_clean_keeps_backup() {
    let dir = tempfile::tempdir().unwrap();
    let backups = dir.path().join("backups");
    let mock = Arc::new(mock_with_dump(backups.clone()));
    let engine = engine_with(dir.path(), &mock);

    engine.up().unwrap();
    engine.install().unwrap();
    std::fs::write(engine.layout().core_marker(), "<?php").unwrap();
    std::fs::write(engine.layout().uploads_dir().join("a.png"), "x").unwrap();

    let record = engine.backup().unwrap();
    assert!(record.size_bytes > 0);
    assert!(record.file_name.starts_with("backup-"));
    assert!(record.file_name.ends_with(".sql.gz"));
    assert!(record.path.starts_with(&backups));

    let outcome = engine.clean("yes", false).unwrap();
    assert!(matches!(outcome, CleanOutcome::Cleaned { .. }));
    assert!(mock.calls().contains(&"down -v".to_owned()));

    assert!(record.path.exists());
    assert!(!engine.layout().core_dir().exists());
    assert!(!engine.layout().uploads_dir().exists());
    assert!(!engine.layout().env_file().exists());
    assert!(engine.layout().env_template().exists());
    assert!(engine.layout().plugins_dir().exists());
    assert_eq!(state_of(&engine), EnvState::Absent);
}

#[test]
fn clean_keep_config_preserves_live_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));
    engine.init(false).unwrap();

    engine.clean("yes", true).unwrap();
    assert!(engine.layout().env_file().exists());
    assert!(!engine.layout().compose_file().exists());
}

#[test]
fn declined_clean_is_a_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockRuntime::new());
    let engine = engine_with(dir.path(), &mock);
    engine.init(false).unwrap();

    for answer in ["", "no", "YES", "y"] {
        assert_eq!(engine.clean(answer, false).unwrap(), CleanOutcome::Cancelled);
    }
    assert!(mock.calls().is_empty());
    assert!(engine.layout().env_file().exists());
    assert!(engine.layout().compose_file().exists());
}

#[test]
fn empty_dump_is_a_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(
        MockRuntime::new().with_responder(|req, _| is_dump(req).then(|| ExecOutput::failed(3, ""))),
    );
    let engine = engine_with(dir.path(), &mock);
    engine.up().unwrap();

    let err = engine.backup().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.list_backups().unwrap().is_empty());
}

#[test]
fn dump_reporting_success_without_a_file_is_a_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));
    engine.up().unwrap();

    let err = engine.backup().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn backup_requires_running_database() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(dir.path(), &Arc::new(MockRuntime::new()));
    engine.init(false).unwrap();
    assert_eq!(engine.backup().unwrap_err().kind(), ErrorKind::Precondition);
}
