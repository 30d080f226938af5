use super::{core_err, format_bytes, json_pretty, with_spinner, EXIT_SUCCESS};
use std::path::Path;
use wpstack_core::{Engine, RestoreReport};

pub fn backup(engine: &Engine, json: bool) -> Result<u8, String> {
    let record = with_spinner(
        json,
        "dumping database...",
        "backup written",
        "backup failed",
        || engine.backup(),
    )?;
    if json {
        println!("{}", json_pretty(&record)?);
    } else {
        println!(
            "{} ({})",
            record.path.display(),
            format_bytes(record.size_bytes)
        );
    }
    Ok(EXIT_SUCCESS)
}

pub fn restore(engine: &Engine, file: &str, json: bool) -> Result<u8, String> {
    let report = with_spinner(
        json,
        "restoring database...",
        "database restored",
        "restore failed",
        || engine.restore(file),
    )?;
    print_restore(&report, json)
}

pub fn import(engine: &Engine, path: &Path, json: bool) -> Result<u8, String> {
    let report = with_spinner(
        json,
        "importing database dump...",
        "database imported",
        "import failed",
        || engine.import(path),
    )?;
    print_restore(&report, json)
}

fn print_restore(report: &RestoreReport, json: bool) -> Result<u8, String> {
    if json {
        println!("{}", json_pretty(report)?);
    } else {
        println!(
            "restored from {} ({}{})",
            report.path.display(),
            format_bytes(report.size_bytes),
            if report.compressed { ", gzip" } else { "" }
        );
    }
    Ok(EXIT_SUCCESS)
}

pub fn list(engine: &Engine, json: bool) -> Result<u8, String> {
    let backups = engine.list_backups().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&backups)?);
    } else if backups.is_empty() {
        println!("no backups in {}", engine.layout().backups_dir().display());
    } else {
        println!("{:<36} {:>10}  CREATED", "FILE", "SIZE");
        for b in &backups {
            println!(
                "{:<36} {:>10}  {}",
                b.file_name,
                format_bytes(b.size_bytes),
                b.created_at.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
