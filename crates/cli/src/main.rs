//! Grace Codex CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! codex-cli migrate
//!
//! # Give an account editor rights, or take them away
//! codex-cli admin grant --username tarnished
//! codex-cli admin revoke --username tarnished
//!
//! # Create the default weapon groups and armor sets
//! codex-cli seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "codex-cli")]
#[command(author, version, about = "Grace Codex CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage editor rights
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Create the default weapon groups and armor sets
    Seed,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an account editor rights
    Grant {
        #[arg(short, long)]
        username: String,
    },
    /// Take editor rights away from an account
    Revoke {
        #[arg(short, long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { username } => commands::admin::set_admin(&username, true).await?,
            AdminAction::Revoke { username } => {
                commands::admin::set_admin(&username, false).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_grant() {
        let cli = Cli::try_parse_from(["codex-cli", "admin", "grant", "--username", "melina"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Admin {
                action: AdminAction::Grant { ref username }
            } if username == "melina"
        ));
    }
}
