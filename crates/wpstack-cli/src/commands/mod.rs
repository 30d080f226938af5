pub mod artifact;
pub mod backup;
pub mod clean;
pub mod docs;
pub mod down;
pub mod exec;
pub mod health;
pub mod init;
pub mod install;
pub mod logs;
pub mod render;
pub mod status;
pub mod up;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use wpstack_core::{CheckStatus, CoreError, HealthReport};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PRECONDITION: u8 = 2;
pub const EXIT_TIMEOUT: u8 = 3;
pub const EXIT_VALIDATION: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Error message carrying the failure-class prefix `main` maps to an exit code.
#[allow(clippy::needless_pass_by_value)]
pub fn core_err(e: CoreError) -> String {
    e.user_message()
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Run `op` behind a spinner unless JSON output was requested.
pub fn with_spinner<T>(
    json: bool,
    working: &str,
    done: &str,
    failed: &str,
    op: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, String> {
    let pb = if json { None } else { Some(spinner(working)) };
    match op() {
        Ok(v) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, done);
            }
            Ok(v)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, failed);
            }
            Err(core_err(e))
        }
    }
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "ready" | "running" => Style::new().green().apply_to(state).to_string(),
        "starting" | "stopping" => Style::new().cyan().apply_to(state).to_string(),
        "degraded-wait" => Style::new().yellow().bold().apply_to(state).to_string(),
        "created" | "stopped" | "exited" => Style::new().yellow().apply_to(state).to_string(),
        "absent" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

pub fn print_health(report: &HealthReport) {
    for check in &report.checks {
        let icon = match check.status {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Warn => "⚠",
            CheckStatus::Info => "ℹ",
        };
        println!("  {icon} {:<20} {}", check.name, check.message);
    }
}

pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
