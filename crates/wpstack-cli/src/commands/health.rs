use super::{core_err, json_pretty, print_health, EXIT_FAILURE, EXIT_SUCCESS};
use wpstack_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = engine.health().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("wpstack health\n");
        print_health(&report);
        println!();
        if report.healthy {
            println!("All checks passed.");
        } else {
            let failed: Vec<&str> = report.failed().map(|c| c.name.as_str()).collect();
            println!("{} check(s) failed: {}", failed.len(), failed.join(", "));
        }
    }
    Ok(if report.healthy {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
