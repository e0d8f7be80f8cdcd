//! Pull-request build trigger CLI.

use clap::{Parser, Subcommand};

mod commands;

use commands::Client;

#[derive(Parser)]
#[command(name = "prtrigger")]
#[command(about = "Pull-request build trigger CLI", long_about = None)]
struct Cli {
    /// API server URL
    #[arg(long, env = "PRTRIGGER_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// User to act as
    #[arg(long, env = "PRTRIGGER_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "prtrigger.kdl")]
        path: String,
    },
    /// Force a build of a pull request
    Trigger {
        /// Repository ID
        repository_id: i64,
        /// Pull request ID
        pull_request_id: i64,
    },
    /// Show whether automatic builds are enabled for a pull request
    Status {
        repository_id: i64,
        pull_request_id: i64,
    },
    /// Enable automatic builds for a pull request
    Enable {
        repository_id: i64,
        pull_request_id: i64,
    },
    /// Disable automatic builds for a pull request
    Disable {
        repository_id: i64,
        pull_request_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new(&cli.api_url, cli.user);

    match cli.command {
        Commands::Validate { path } => {
            commands::validate(&path)?;
        }
        Commands::Trigger {
            repository_id,
            pull_request_id,
        } => {
            commands::pull_requests::trigger(&client, repository_id, pull_request_id).await?;
        }
        Commands::Status {
            repository_id,
            pull_request_id,
        } => {
            commands::pull_requests::status(&client, repository_id, pull_request_id).await?;
        }
        Commands::Enable {
            repository_id,
            pull_request_id,
        } => {
            commands::pull_requests::set_automatic_build(
                &client,
                repository_id,
                pull_request_id,
                true,
            )
            .await?;
        }
        Commands::Disable {
            repository_id,
            pull_request_id,
        } => {
            commands::pull_requests::set_automatic_build(
                &client,
                repository_id,
                pull_request_id,
                false,
            )
            .await?;
        }
    }

    Ok(())
}
