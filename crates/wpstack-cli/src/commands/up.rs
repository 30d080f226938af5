use super::{json_pretty, with_spinner, EXIT_SUCCESS};
use wpstack_core::{Engine, UpReport};

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = with_spinner(
        json,
        "starting services and waiting for the database...",
        "environment ready",
        "environment did not become ready",
        || engine.up(),
    )?;
    print_report(&report, json)
}

pub fn restart(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = with_spinner(
        json,
        "restarting environment...",
        "environment restarted",
        "restart failed",
        || engine.restart(),
    )?;
    print_report(&report, json)
}

fn print_report(report: &UpReport, json: bool) -> Result<u8, String> {
    if json {
        println!("{}", json_pretty(report)?);
        return Ok(EXIT_SUCCESS);
    }
    if report.descriptor_changed {
        println!("descriptor re-rendered ({})", report.fingerprint);
    }
    println!(
        "database answered after {} attempt(s) in {:.1}s",
        report.readiness_attempts,
        report.waited_ms as f64 / 1000.0
    );
    println!("site: {}", report.site_url);
    if !report.health.healthy {
        println!();
        println!("some health checks failed:");
        for check in report.health.failed() {
            println!("  ✗ {:<20} {}", check.name, check.message);
        }
        println!("run `wpstack health` for the full report");
    }
    Ok(EXIT_SUCCESS)
}
