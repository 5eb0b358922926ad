mod bindings;
mod cli;
mod commands;
mod paths;
mod report;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::run(args)
}
