use super::{core_err, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use wpstack_core::Engine;

/// Exit status of an attached child, as our own.
pub fn passthrough_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(EXIT_FAILURE)
}

pub fn shell(engine: &Engine) -> Result<u8, String> {
    engine.shell().map(passthrough_code).map_err(core_err)
}

pub fn db_shell(engine: &Engine) -> Result<u8, String> {
    engine.db_shell().map(passthrough_code).map_err(core_err)
}

pub fn wp(engine: &Engine, args: &[String]) -> Result<u8, String> {
    engine.wp(args).map(passthrough_code).map_err(core_err)
}

pub fn search_replace(engine: &Engine, old: &str, new: &str, json: bool) -> Result<u8, String> {
    let out = engine.search_replace(old, new).map_err(core_err)?;
    if json {
        let payload = serde_json::json!({
            "old": old,
            "new": new,
            "report": out.stdout.trim(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        print!("{}", out.stdout);
    }
    Ok(EXIT_SUCCESS)
}

pub fn cron_run(engine: &Engine, json: bool) -> Result<u8, String> {
    let out = engine.cron_run().map_err(core_err)?;
    if json {
        let events: Vec<&str> = out.stdout.lines().filter(|l| !l.trim().is_empty()).collect();
        println!("{}", json_pretty(&serde_json::json!({ "output": events }))?);
    } else if out.stdout.trim().is_empty() {
        println!("no cron events were due");
    } else {
        print!("{}", out.stdout);
    }
    Ok(EXIT_SUCCESS)
}
