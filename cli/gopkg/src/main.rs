//! gopkg: install Go module dependencies from a module proxy into a project
//! or the user-wide store.

mod commands;
mod session;

use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use gopkg_core::{Overrides, Scope, Settings};
use tracing_subscriber::EnvFilter;

use session::Session;

#[derive(Parser)]
#[command(name = "gopkg", version, about = "Go module dependency installer")]
struct Cli {
    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Registry URL (https://... or file://...)
    #[arg(long, global = true)]
    registry: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create gopkg.toml in the current directory
    Init,
    /// Declare a dependency
    Add {
        /// module@version (version may be "latest")
        target: String,
        /// Use the global manifest
        #[arg(short, long)]
        global: bool,
    },
    /// Remove a dependency
    Remove {
        /// Module path
        module: String,
        #[arg(short, long)]
        global: bool,
    },
    /// Install every declared dependency
    #[command(visible_alias = "i")]
    Install {
        #[arg(short, long)]
        global: bool,
        /// Modules prepared in parallel
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Re-hash cached archives before use
        #[arg(long)]
        verify: bool,
        /// Declare third-party imports found in the project's Go sources first
        #[arg(long)]
        auto: bool,
    },
    /// Move dependencies to newer versions and reinstall
    Update {
        /// module or module@version (all modules if omitted)
        targets: Vec<String>,
        #[arg(short, long)]
        global: bool,
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Show declared dependencies and what is installed
    List {
        #[arg(short, long)]
        global: bool,
    },
    /// Compare installed versions with the registry
    Check {
        #[arg(short, long)]
        global: bool,
    },
    /// List the versions a module has published
    Versions {
        /// Module path
        module: String,
    },
    /// Remove installed modules
    Clean {
        #[arg(short, long)]
        global: bool,
        /// Also empty the download cache
        #[arg(long)]
        cache: bool,
        /// Also delete the lockfile
        #[arg(long)]
        lock: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut overrides = Overrides {
        registry_url: cli.registry,
        ..Overrides::default()
    };
    match &cli.command {
        Commands::Install { jobs, verify, .. } => {
            overrides.jobs = *jobs;
            overrides.verify = verify.then_some(true);
        }
        Commands::Update { jobs, .. } => overrides.jobs = *jobs,
        _ => {}
    }
    let settings = Settings::from_env(&overrides).context("loading settings")?;
    let cwd = std::env::current_dir().context("reading the current directory")?;
    let session = Session::new(settings, &cwd);
    tracing::debug!(project = %session.layout.project_dir().display(), home = %session.layout.home().display(), "session");

    match cli.command {
        Commands::Init => commands::init::run(&session),
        Commands::Add { target, global } => {
            commands::deps::add(&session, Scope::from_global_flag(global), &target)
        }
        Commands::Remove { module, global } => {
            commands::deps::remove(&session, Scope::from_global_flag(global), &module)
        }
        Commands::Install { global, auto, .. } => {
            commands::install::install(&session, Scope::from_global_flag(global), auto)
        }
        Commands::Update { targets, global, .. } => {
            commands::install::update(&session, Scope::from_global_flag(global), &targets)
        }
        Commands::List { global } => commands::status::list(&session, Scope::from_global_flag(global)),
        Commands::Check { global } => commands::status::check(&session, Scope::from_global_flag(global)),
        Commands::Versions { module } => commands::status::versions(&session, &module),
        Commands::Clean { global, cache, lock } => {
            commands::clean::run(&session, Scope::from_global_flag(global), cache, lock)
        }
    }
}
