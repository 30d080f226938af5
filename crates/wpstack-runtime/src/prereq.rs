use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn command_succeeds(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check that a container engine and a compose implementation are installed.
/// An empty list means all prerequisites are met.
pub fn check_runtime_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    let has_engine = command_exists("docker") || command_exists("podman");
    if !has_engine {
        missing.push(MissingPrereq {
            name: "container engine",
            purpose: "running the environment's service containers",
            install_hint: "install Docker Engine or Podman",
        });
        return missing;
    }

    let has_compose = command_succeeds("docker", &["compose", "version"])
        || command_exists("docker-compose")
        || command_succeeds("podman", &["compose", "version"]);
    if !has_compose {
        missing.push(MissingPrereq {
            name: "compose",
            purpose: "orchestrating the multi-container environment",
            install_hint: "install the docker compose plugin, docker-compose, or podman-compose",
        });
    }

    missing
}

/// Check prerequisites for plugin and theme repository commands.
pub fn check_vcs_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if !command_exists("git") {
        missing.push(MissingPrereq {
            name: "git",
            purpose: "versioning plugin and theme directories",
            install_hint: "apt install git | dnf install git | pacman -S git | brew install git",
        });
    }
    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nwpstack requires these tools to manage the development environment.");
    msg
}
