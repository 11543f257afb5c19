//! Jobboard Server - Main entry point

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use jobboard_common::logging::{init_logging, LogConfig};
use tracing::info;

use jobboard_server::{
    api::{self, AppState},
    audit::retention_cutoff,
    auth::{Authenticator, Principal},
    config::Config,
    db,
};

/// Job board admin audit service
#[derive(Debug, Parser)]
#[command(name = "jobboard-server", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Delete audit records older than the retention window and exit
    Purge {
        /// Age in days; defaults to AUDIT_RETENTION_DAYS
        #[arg(long)]
        days: Option<u32>,
    },

    /// Print a signed bearer token
    Token {
        /// User id placed in the `sub` claim
        #[arg(long)]
        sub: String,

        #[arg(long)]
        role: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .log_file_prefix("jobboard-server")
        .filter_directives("jobboard_server=debug,tower_http=debug,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;
    let _guard = init_logging(&log_config)?;

    let config = Config::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Purge { days } => purge(config, days).await,
        Command::Token {
            sub,
            role,
            email,
            name,
        } => {
            let auth = Authenticator::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
            let token = auth.issue_token(&Principal {
                id: sub,
                email,
                name,
                role,
            })?;
            println!("{}", token);
            Ok(())
        },
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting Jobboard Server");
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = db::connect_store(&config).await?;
    info!(backend = store.backend(), "Audit store ready");

    let state = AppState::new(store, &config);
    api::serve(state, &config).await
}

async fn purge(config: Config, days: Option<u32>) -> Result<()> {
    let days = days.unwrap_or(config.audit.retention_days);
    if days == 0 {
        anyhow::bail!("--days must be at least 1");
    }

    let Some(cutoff) = retention_cutoff(Utc::now(), days) else {
        anyhow::bail!("--days {} is out of range", days);
    };

    let store = db::connect_store(&config).await?;
    let deleted = store.purge_older_than(cutoff).await?;

    info!(days, deleted, "Audit purge finished");
    println!("Deleted {} logs older than {} days", deleted, days);

    Ok(())
}
