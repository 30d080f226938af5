use super::{core_err, json_pretty, EXIT_SUCCESS};
use dialoguer::Input;
use std::io::{stderr, stdin, BufRead, IsTerminal, Write};
use wpstack_core::{CleanOutcome, Engine, CLEAN_CONFIRMATION};

pub fn run(
    engine: &Engine,
    keep_config: bool,
    confirm: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let answer = match confirm {
        Some(token) => token.to_owned(),
        None => prompt(engine, keep_config)?,
    };

    let outcome = engine.clean(&answer, keep_config).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&outcome)?);
        return Ok(EXIT_SUCCESS);
    }
    match outcome {
        CleanOutcome::Cancelled => println!("clean cancelled; nothing was removed"),
        CleanOutcome::Cleaned { removed } => {
            for path in &removed {
                println!("removed {}", path.display());
            }
            println!("containers and volumes removed; plugins, themes and backups kept");
        }
    }
    Ok(EXIT_SUCCESS)
}

fn prompt(engine: &Engine, keep_config: bool) -> Result<String, String> {
    let what = if keep_config {
        "containers, database volume, core files and uploads"
    } else {
        "containers, database volume, core files, uploads and .env"
    };
    let question = format!(
        "This permanently deletes the {what} in {}. Type '{CLEAN_CONFIRMATION}' to continue",
        engine.layout().root().display()
    );

    if stdin().is_terminal() {
        return Input::<String>::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| format!("prompt failed: {e}"));
    }

    eprint!("{question}: ");
    let _ = stderr().flush();
    let mut line = String::new();
    stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read confirmation: {e}"))?;
    Ok(line)
}
