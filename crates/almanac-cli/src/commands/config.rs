use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Subcommand};

use super::GlobalArgs;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
}

pub fn execute(args: ConfigArgs, global: &GlobalArgs) -> anyhow::Result<ExitCode> {
    match args.command {
        ConfigCommand::Show => {
            let (path, config) = global.load_config()?;
            let text = config
                .to_toml_string()
                .context("rendering configuration")?;
            println!("# {}", path.display());
            print!("{}", text);
        }
    }
    Ok(ExitCode::SUCCESS)
}
