use std::path::Path;

use anyhow::{Context, Result};
use leaseconfig::LeaseConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigAction, ProbeArgs};
use crate::commands;
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing(cli.verbose);

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved gpuprobe paths");

    let explicit = cli.config.as_deref();
    match cli.command {
        None => commands::probe(&load_config(&paths, explicit)?, &ProbeArgs::default()),
        Some(Command::Probe(args)) => commands::probe(&load_config(&paths, explicit)?, &args),
        Some(Command::Share(args)) => commands::share(&load_config(&paths, explicit)?, &args),
        Some(Command::Config(config)) => match config.action {
            ConfigAction::Check(args) => commands::config_check(&paths, explicit, &args),
            ConfigAction::Init(args) => commands::config_init(&paths, &args),
        },
        Some(Command::Where) => {
            commands::print_where(&paths);
            Ok(())
        }
    }
}

fn initialise_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(paths: &AppPaths, explicit: Option<&Path>) -> Result<LeaseConfig> {
    if let Some(path) = explicit {
        tracing::debug!(path = %path.display(), "loading configuration");
        return LeaseConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let path = paths.config_file();
    let config = LeaseConfig::load_or_default(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    if path.exists() {
        tracing::debug!(path = %path.display(), "loaded configuration");
    } else {
        tracing::debug!(path = %path.display(), "no configuration file; using defaults");
    }
    Ok(config)
}
