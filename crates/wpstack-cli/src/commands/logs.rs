use super::{core_err, exec::passthrough_code, EXIT_SUCCESS};
use wpstack_core::Engine;

pub fn run(engine: &Engine, service: Option<&str>, tail: usize, follow: bool) -> Result<u8, String> {
    if follow {
        return engine
            .follow_logs(service, tail)
            .map(passthrough_code)
            .map_err(core_err);
    }
    let text = engine.logs(service, tail).map_err(core_err)?;
    print!("{text}");
    Ok(EXIT_SUCCESS)
}
