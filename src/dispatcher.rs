//! Command dispatcher that routes parsed clap commands to their handlers.

mod calc;

use anyhow::Result;

use crate::cli::Commands;
use dripcalc::config::Config;

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, json_output: bool, config: &Config) -> Result<()> {
    match command {
        Commands::Calc(args) => calc::dispatch_calc(args, json_output, config).await,
    }
}
