use super::{colorize_state, json_pretty, with_spinner, EXIT_SUCCESS};
use wpstack_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let state = with_spinner(
        json,
        "stopping services...",
        "services stopped",
        "stop failed",
        || engine.down(),
    )?;
    if json {
        println!("{}", json_pretty(&serde_json::json!({ "state": state }))?);
    } else {
        println!("state: {}", colorize_state(&state.to_string()));
    }
    Ok(EXIT_SUCCESS)
}
