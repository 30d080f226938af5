mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_PRECONDITION, EXIT_TIMEOUT, EXIT_VALIDATION};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use wpstack_core::{install_signal_handler, Engine};
use wpstack_runtime::{ComposeRuntime, ContainerRuntime};
use wpstack_store::ArtifactKind;

#[derive(Debug, Parser)]
#[command(
    name = "wpstack",
    version,
    about = "Lifecycle orchestrator for container-based WordPress development environments"
)]
struct Cli {
    /// Project directory holding the configuration and generated files.
    #[arg(long, short = 'C', default_value = ".", global = true)]
    project: PathBuf,

    /// Container runtime backend.
    #[arg(long, env = "WPSTACK_RUNTIME", default_value = "compose", global = true)]
    runtime: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the configuration, directory layout, and service descriptor.
    Init {
        /// Replace the database passwords in an existing configuration.
        #[arg(long, default_value_t = false)]
        regenerate_secrets: bool,
    },
    /// Re-render the service descriptor from the current configuration.
    Render,
    /// Show the lifecycle state and per-service status.
    Status,
    /// Start every service and wait for the database.
    Up,
    /// Stop and remove containers, keeping data volumes.
    Down,
    /// Stop, then start again.
    Restart,
    /// Download core files, write the site configuration, and install the site.
    Install,
    /// Remove containers, volumes, and generated files (asks for confirmation).
    Clean {
        /// Keep the live configuration file.
        #[arg(long, default_value_t = false)]
        keep_config: bool,
        /// Confirmation token; skips the prompt when it is exactly "yes".
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Check services, database, ports, and recent errors.
    Health,
    /// Open a shell in the application container.
    Shell,
    /// Open a database client session.
    DbShell,
    /// Show service logs.
    Logs {
        /// Service name (all services when omitted).
        service: Option<String>,
        /// Number of trailing lines.
        #[arg(long, default_value_t = 100)]
        tail: usize,
        /// Keep streaming new lines.
        #[arg(short, long, default_value_t = false)]
        follow: bool,
    },
    /// Dump the database to a timestamped, compressed backup.
    Backup,
    /// Restore the database from a backup file.
    Restore {
        /// File name in the backups directory, or a path.
        file: String,
    },
    /// Copy an external dump into the backups directory and restore it.
    DbImport {
        /// Path to a .sql or .sql.gz file.
        path: PathBuf,
    },
    /// List backups, newest first.
    ListBackups,
    /// Create a plugin skeleton and try to activate it.
    Plugin {
        name: String,
    },
    /// Turn a plugin directory into its own git repository.
    PluginRepo {
        name: String,
    },
    /// Clone a plugin repository.
    PluginClone {
        url: String,
        /// Directory name (derived from the URL when omitted).
        name: Option<String>,
    },
    /// List plugins with their repository state.
    PluginList {
        /// Fetch remotes before comparing with upstream.
        #[arg(long, default_value_t = false)]
        fetch: bool,
    },
    /// Create a theme skeleton and try to activate it.
    Theme {
        name: String,
    },
    /// Turn a theme directory into its own git repository.
    ThemeRepo {
        name: String,
    },
    /// Clone a theme repository.
    ThemeClone {
        url: String,
        /// Directory name (derived from the URL when omitted).
        name: Option<String>,
    },
    /// List themes with their repository state.
    ThemeList {
        /// Fetch remotes before comparing with upstream.
        #[arg(long, default_value_t = false)]
        fetch: bool,
    },
    /// Run a WordPress CLI command (use -- before flags).
    Wp {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Replace a string across every table, including serialized data.
    Sr {
        old: String,
        new: String,
    },
    /// Run all due cron events.
    CronRun,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

impl Commands {
    fn needs_runtime(&self) -> bool {
        matches!(
            self,
            Commands::Status
                | Commands::Up
                | Commands::Down
                | Commands::Restart
                | Commands::Install
                | Commands::Clean { .. }
                | Commands::Health
                | Commands::Shell
                | Commands::DbShell
                | Commands::Logs { .. }
                | Commands::Backup
                | Commands::Restore { .. }
                | Commands::DbImport { .. }
                | Commands::Wp { .. }
                | Commands::Sr { .. }
                | Commands::CronRun
        )
    }

    fn needs_vcs(&self) -> bool {
        matches!(
            self,
            Commands::PluginRepo { .. }
                | Commands::PluginClone { .. }
                | Commands::ThemeRepo { .. }
                | Commands::ThemeClone { .. }
        )
    }
}

fn open_runtime(name: &str, needed: bool) -> Result<Arc<dyn ContainerRuntime>, String> {
    match wpstack_runtime::select_runtime(name) {
        Ok(rt) => Ok(Arc::from(rt)),
        // Commands that never reach a container still get a backend so that
        // best-effort steps can report themselves as skipped.
        Err(_) if !needed && matches!(name, "compose" | "docker") => {
            Ok(Arc::new(ComposeRuntime::with_program("docker", &["compose"])))
        }
        Err(e) => Err(format!("precondition failed: {e}")),
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WPSTACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let skip_prereqs =
        cli.runtime == "mock" || std::env::var("WPSTACK_SKIP_PREREQS").as_deref() == Ok("1");
    if !skip_prereqs {
        let mut missing = Vec::new();
        if cli.command.needs_runtime() {
            missing.extend(wpstack_runtime::check_runtime_prereqs());
        }
        if cli.command.needs_vcs() {
            missing.extend(wpstack_runtime::check_vcs_prereqs());
        }
        if !missing.is_empty() {
            eprintln!("error: {}", wpstack_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_PRECONDITION);
        }
    }

    debug!(
        "project {} with runtime backend '{}'",
        cli.project.display(),
        cli.runtime
    );
    let result = open_runtime(&cli.runtime, cli.command.needs_runtime())
        .and_then(|runtime| run(cli.command, &Engine::new(&cli.project, runtime), cli.json));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn run(command: Commands, engine: &Engine, json: bool) -> Result<u8, String> {
    use ArtifactKind::{Plugin, Theme};

    match command {
        Commands::Init { regenerate_secrets } => commands::init::run(engine, regenerate_secrets, json),
        Commands::Render => commands::render::run(engine, json),
        Commands::Status => commands::status::run(engine, json),
        Commands::Up => commands::up::run(engine, json),
        Commands::Down => commands::down::run(engine, json),
        Commands::Restart => commands::up::restart(engine, json),
        Commands::Install => commands::install::run(engine, json),
        Commands::Clean {
            keep_config,
            confirm,
        } => commands::clean::run(engine, keep_config, confirm.as_deref(), json),
        Commands::Health => commands::health::run(engine, json),
        Commands::Shell => commands::exec::shell(engine),
        Commands::DbShell => commands::exec::db_shell(engine),
        Commands::Logs {
            service,
            tail,
            follow,
        } => commands::logs::run(engine, service.as_deref(), tail, follow),
        Commands::Backup => commands::backup::backup(engine, json),
        Commands::Restore { file } => commands::backup::restore(engine, &file, json),
        Commands::DbImport { path } => commands::backup::import(engine, &path, json),
        Commands::ListBackups => commands::backup::list(engine, json),
        Commands::Plugin { name } => commands::artifact::create(engine, Plugin, &name, json),
        Commands::PluginRepo { name } => commands::artifact::init_repo(engine, Plugin, &name, json),
        Commands::PluginClone { url, name } => {
            commands::artifact::clone(engine, Plugin, &url, name.as_deref(), json)
        }
        Commands::PluginList { fetch } => commands::artifact::list(engine, Plugin, fetch, json),
        Commands::Theme { name } => commands::artifact::create(engine, Theme, &name, json),
        Commands::ThemeRepo { name } => commands::artifact::init_repo(engine, Theme, &name, json),
        Commands::ThemeClone { url, name } => {
            commands::artifact::clone(engine, Theme, &url, name.as_deref(), json)
        }
        Commands::ThemeList { fetch } => commands::artifact::list(engine, Theme, fetch, json),
        Commands::Wp { args } => commands::exec::wp(engine, &args),
        Commands::Sr { old, new } => commands::exec::search_replace(engine, &old, &new, json),
        Commands::CronRun => commands::exec::cron_run(engine, json),
        Commands::Completions { shell, output } => {
            commands::docs::completions::<Cli>(shell, output.as_deref())
        }
        Commands::ManPages { dir } => commands::docs::man_pages::<Cli>(&dir),
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("precondition failed:") {
        EXIT_PRECONDITION
    } else if msg.starts_with("timed out:") {
        EXIT_TIMEOUT
    } else if msg.starts_with("validation failed:") {
        EXIT_VALIDATION
    } else {
        EXIT_FAILURE
    }
}
