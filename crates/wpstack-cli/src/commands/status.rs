use super::{colorize_state, core_err, json_pretty, EXIT_SUCCESS};
use wpstack_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = engine.status().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("state:      {}", colorize_state(&report.state.to_string()));
    println!("since:      {}", report.updated_at);
    println!(
        "db ready:   {}",
        report.db_ready_at.as_deref().unwrap_or("not confirmed")
    );
    if let Some(fp) = &report.descriptor {
        println!("descriptor: {}", fp.get(..12).unwrap_or(fp.as_str()));
    }
    println!("runtime:    {}", report.runtime);
    if report.services.is_empty() {
        println!("no containers");
    } else {
        println!();
        println!("{:<14} {:<12} HEALTH", "SERVICE", "STATE");
        for svc in &report.services {
            println!(
                "{:<14} {:<12} {}",
                svc.service,
                colorize_state(&svc.state),
                svc.health.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
