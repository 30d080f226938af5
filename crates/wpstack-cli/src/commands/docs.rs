use super::EXIT_SUCCESS;
use clap::{Command, CommandFactory};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

const BIN: &str = "wpstack";

pub fn completions<C: CommandFactory>(shell: Shell, output: Option<&Path>) -> Result<u8, String> {
    let mut cmd = C::command();
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
            clap_complete::generate(shell, &mut cmd, BIN, &mut file);
            println!("{shell} completions written to {}", path.display());
        }
        None => clap_complete::generate(shell, &mut cmd, BIN, &mut std::io::stdout()),
    }
    Ok(EXIT_SUCCESS)
}

/// One page for the binary plus one per subcommand (`wpstack-up.1`, ...).
pub fn man_pages<C: CommandFactory>(dir: &Path) -> Result<u8, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("failed to create dir: {e}"))?;
    let cmd = C::command();
    let mut written = vec![write_page(dir, BIN, cmd.clone())?];
    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let page = format!("{BIN}-{}", sub.get_name());
        written.push(write_page(dir, &page, sub.clone())?);
    }
    println!("{} man pages written to {}", written.len(), dir.display());
    Ok(EXIT_SUCCESS)
}

fn write_page(dir: &Path, name: &str, cmd: Command) -> Result<PathBuf, String> {
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut buf)
        .map_err(|e| format!("man page render failed: {e}"))?;
    let path = dir.join(format!("{name}.1"));
    std::fs::write(&path, &buf).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(clap::Parser)]
    #[command(name = "wpstack")]
    struct Demo {
        #[command(subcommand)]
        cmd: DemoCmd,
    }

    #[derive(clap::Subcommand)]
    enum DemoCmd {
        Up,
        ListBackups,
    }

    #[test]
    fn man_pages_cover_subcommands() {
        let dir = tempfile::tempdir().unwrap();
        man_pages::<Demo>(dir.path()).unwrap();
        assert!(dir.path().join("wpstack.1").exists());
        assert!(dir.path().join("wpstack-up.1").exists());
        assert!(dir.path().join("wpstack-list-backups.1").exists());
    }

    #[test]
    fn completions_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("wpstack.bash");
        completions::<Demo>(Shell::Bash, Some(&out)).unwrap();
        let script = std::fs::read_to_string(out).unwrap();
        assert!(script.contains("list-backups"));
    }
}
