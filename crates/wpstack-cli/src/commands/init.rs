use super::{core_err, json_pretty, EXIT_SUCCESS};
use wpstack_core::Engine;
use wpstack_schema::CreateStatus;

pub fn run(engine: &Engine, regenerate_secrets: bool, json: bool) -> Result<u8, String> {
    let report = engine.init(regenerate_secrets).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    let layout = engine.layout();
    match report.config {
        CreateStatus::Created => println!("wrote {}", layout.env_file().display()),
        CreateStatus::Regenerated => {
            println!("regenerated secrets in {}", layout.env_file().display());
            println!("note: existing database volumes still use the old passwords; run `wpstack clean` to reset");
        }
        CreateStatus::Existing => println!("kept existing {}", layout.env_file().display()),
    }
    println!("wrote {}", layout.env_template().display());
    if report.render.descriptor_changed {
        println!("wrote {}", layout.compose_file().display());
    }
    println!("project: {}", report.project_name);
    println!("site:    {}", report.site_url);
    println!("next:    wpstack up && wpstack install");
    Ok(EXIT_SUCCESS)
}
