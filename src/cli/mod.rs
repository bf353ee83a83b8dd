//! CLI module for Parley
//!
//! - `serve`: run the Telegram bot
//! - `config`: inspect the effective configuration

use clap::{Parser, Subcommand};

pub mod config;

/// Parley Telegram relay CLI
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Telegram to chat-completion relay")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot
    Serve,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: Option<config::ConfigCommands>,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Serve) => crate::server::run().await,
        Some(Commands::Config { command }) => config::run(command),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
