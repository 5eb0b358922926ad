use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Upper bound for `share --consumers` and `share --rounds`.
pub const MAX_COUNT: usize = 256;

#[derive(Parser, Debug)]
#[command(
    name = "gpuprobe",
    author,
    version,
    about = "Probe GPU support and exercise the shared device lifecycle",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Log at debug level when `RUST_LOG` is not set.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of the resolved `gpuprobe.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report GPU support and the adapter the shared device lands on (default).
    Probe(ProbeArgs),
    /// Acquire the shared device from several consumers at once and verify sharing.
    Share(ShareArgs),
    /// Validate or create the configuration file.
    Config(ConfigCommand),
    /// Print the resolved configuration directory and file.
    Where,
}

#[derive(Parser, Debug, Default)]
pub struct ProbeArgs {
    /// Emit the report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ShareArgs {
    /// Concurrent consumers per round.
    #[arg(long, value_name = "N", value_parser = parse_count, default_value = "4")]
    pub consumers: usize,

    /// Acquire/release rounds to run.
    #[arg(long, value_name = "N", value_parser = parse_count, default_value = "2")]
    pub rounds: usize,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Parse and validate a configuration file.
    Check(ConfigCheckArgs),
    /// Write the default configuration into the config directory.
    Init(ConfigInitArgs),
}

#[derive(Parser, Debug, Default)]
pub struct ConfigCheckArgs {
    /// File to check; defaults to the resolved configuration file.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,
}

#[derive(Parser, Debug, Default)]
pub struct ConfigInitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_count(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("count must not be empty".to_string());
    }

    let count: usize = trimmed
        .parse()
        .map_err(|_| format!("invalid count '{trimmed}'; expected a positive integer"))?;

    if count == 0 || count > MAX_COUNT {
        return Err(format!("count must be between 1 and {MAX_COUNT}"));
    }

    Ok(count)
}
