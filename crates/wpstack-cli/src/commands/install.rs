use super::{json_pretty, with_spinner, EXIT_SUCCESS};
use wpstack_core::{Engine, SideEffect};

pub fn run(engine: &Engine, json: bool) -> Result<u8, String> {
    let report = with_spinner(
        json,
        "installing WordPress...",
        "WordPress installed",
        "installation failed",
        || engine.install(),
    )?;
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    if report.core_downloaded {
        println!("downloaded core files");
    }
    println!("site:  {}", report.site_url);
    println!("admin: {}/wp-admin (user: {})", report.site_url, report.admin_user);
    match &report.admin_password {
        Some(password) => {
            println!("admin password: {password}");
            println!("this password is shown once and is not stored");
        }
        None => println!("site was already installed; admin credentials unchanged"),
    }
    if !matches!(report.permissions, SideEffect::Ok) {
        println!("permission normalization {}", report.permissions);
    }
    Ok(EXIT_SUCCESS)
}
