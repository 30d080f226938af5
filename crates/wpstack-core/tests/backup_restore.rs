use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wpstack_core::{Engine, ErrorKind, WaitPolicy};
use wpstack_runtime::MockRuntime;

const DUMP: &str = "CREATE TABLE wp_options (option_id int);\nINSERT INTO wp_options VALUES (1);\n";

fn running_engine(root: &Path) -> (Engine, Arc<MockRuntime>) {
    let mock = Arc::new(MockRuntime::new());
    let engine = Engine::new(root, mock.clone()).with_wait_policy(WaitPolicy::new(
        Duration::from_millis(200),
        Duration::from_millis(20),
    ));
    engine.up().unwrap();
    (engine, mock)
}

fn write_gz(path: &Path, content: &str) {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(content.as_bytes()).unwrap();
    std::fs::write(path, enc.finish().unwrap()).unwrap();
}

fn last_input(mock: &MockRuntime) -> String {
    String::from_utf8(mock.inputs().last().cloned().unwrap()).unwrap()
}

#[test]
fn restore_resolves_bare_relative_and_absolute_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, mock) = running_engine(dir.path());
    let file = engine.layout().backups_dir().join("x.sql.gz");
    write_gz(&file, DUMP);

    let absolute = file.display().to_string();
    for input in ["x.sql.gz", "backups/x.sql.gz", absolute.as_str()] {
        let report = engine.restore(input).unwrap();
        assert_eq!(
            report.path.canonicalize().unwrap(),
            file.canonicalize().unwrap()
        );
        assert!(report.compressed);
        assert_eq!(last_input(&mock), DUMP);
    }
}

#[test]
fn restore_streams_plain_dumps_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, mock) = running_engine(dir.path());
    std::fs::write(engine.layout().backups_dir().join("plain.sql"), DUMP).unwrap();

    let report = engine.restore("plain.sql").unwrap();
    assert!(!report.compressed);
    assert_eq!(report.size_bytes, DUMP.len() as u64);
    assert_eq!(last_input(&mock), DUMP);
    assert!(mock
        .calls()
        .last()
        .is_some_and(|c| c.starts_with("exec db sh -c")));
}

#[test]
fn restore_of_missing_file_lists_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _mock) = running_engine(dir.path());

    let err = engine.restore("nope.sql.gz").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let msg = err.user_message();
    assert!(msg.contains("nope.sql.gz"));
    assert!(msg.contains("backups"));
}

#[test]
fn restore_of_empty_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, mock) = running_engine(dir.path());
    std::fs::write(engine.layout().backups_dir().join("empty.sql"), "").unwrap();

    let err = engine.restore("empty.sql").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(mock.inputs().is_empty());
}

#[test]
fn import_copies_into_backups_and_restores() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let (engine, mock) = running_engine(dir.path());
    let source = outside.path().join("prod-export.sql.gz");
    write_gz(&source, DUMP);

    let report = engine.import(&source).unwrap();
    let copied = engine.layout().backups_dir().join("prod-export.sql.gz");
    assert!(copied.exists());
    assert_eq!(report.path, copied);
    assert!(source.exists());
    assert_eq!(last_input(&mock), DUMP);
}

#[test]
fn import_from_backups_directory_does_not_copy_over_itself() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, mock) = running_engine(dir.path());
    let file = engine.layout().backups_dir().join("local.sql");
    std::fs::write(&file, DUMP).unwrap();

    engine.import(&file).unwrap();
    assert_eq!(std::fs::read_to_string(&file).unwrap(), DUMP);
    assert_eq!(last_input(&mock), DUMP);
}

#[test]
fn import_requires_existing_source() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _mock) = running_engine(dir.path());

    let err = engine
        .import(&dir.path().join("does-not-exist.sql"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
}

#[test]
fn import_requires_running_database() {
    let dir = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let (engine, _mock) = running_engine(dir.path());
    engine.down().unwrap();
    let source = outside.path().join("dump.sql");
    std::fs::write(&source, DUMP).unwrap();

    let err = engine.import(&source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(!engine.layout().backups_dir().join("dump.sql").exists());
}

#[test]
fn list_backups_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _mock) = running_engine(dir.path());
    let backups = engine.layout().backups_dir();
    std::fs::write(backups.join("backup-20240101-120000.sql.gz"), "a").unwrap();
    std::fs::write(backups.join("backup-20240301-080000.sql.gz"), "b").unwrap();
    std::fs::write(backups.join("notes.txt"), "c").unwrap();

    let listed = engine.list_backups().unwrap();
    let names: Vec<&str> = listed.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(
        names,
        ["backup-20240301-080000.sql.gz", "backup-20240101-120000.sql.gz"]
    );
}
