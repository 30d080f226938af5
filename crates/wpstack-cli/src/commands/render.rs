use super::{core_err, json_pretty, EXIT_SUCCESS};
use wpstack_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = engine.render().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        let path = engine.layout().compose_file();
        if report.descriptor_changed {
            println!("wrote {}", path.display());
        } else {
            println!("{} is up to date", path.display());
        }
        println!("fingerprint: {}", report.fingerprint);
    }
    Ok(EXIT_SUCCESS)
}
