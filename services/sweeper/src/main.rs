//! Reddit retention sweeper
//!
//! Single-binary tool that:
//! 1. `auth`: walks one account through the OAuth code flow and stores its
//!    tokens
//! 2. `run`: refreshes stored tokens, then deletes each configured user's
//!    comments and posts older than their retention windows
//!
//! Every outbound request shares one rate gate, so the whole process stays
//! inside the platform's advertised budget.

mod auth;
mod config;
mod error;
mod run;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rate_gate::RateGate;
use reddit_auth::{CredentialStore, TokenExchanger};
use retention::ApiClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::Phase;
use crate::run::Runner;

/// Delete Reddit comments and posts once they outlive a retention window
#[derive(Debug, Parser)]
#[command(name = "reddit-retention", version)]
struct Args {
    /// Config file (falls back to CONFIG_PATH, then ./reddit-retention.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authorize an account and store its tokens
    Auth,
    /// Refresh tokens and sweep every configured user
    Run,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "starting reddit-retention");

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        users = config.users.len(),
        api = %config.endpoints.api,
        headroom = config.rate_limit.headroom,
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .context("failed to build HTTP client")?;
    let gate = RateGate::new(config.rate_limit.gate_config());
    let app = config.oauth_app()?;
    let exchanger = TokenExchanger::new(http.clone(), gate.clone(), app.clone());
    let api = ApiClient::new(http, gate, config.endpoints.api.clone());
    let store = CredentialStore::load(config.credential_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to load credentials from {}",
                config.credential_path.display()
            )
        })?;

    match args.command {
        Command::Auth => {
            auth::authorize_account(
                &app,
                config.app.serve_address,
                &exchanger,
                &api,
                &store,
                auth::launch_browser,
            )
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    severity = ?e.severity(Phase::Authorization),
                    "authorization failed"
                );
                e
            })
            .context("authorization failed")?;
        }
        Command::Run => {
            let runner = Runner {
                exchanger: &exchanger,
                api: &api,
                store: &store,
                clock: &SystemTime::now,
            };
            runner
                .run(&config.policies)
                .await
                .map_err(|e| {
                    error!(error = %e, "run aborted");
                    e
                })
                .context("run aborted")?;
        }
    }

    Ok(())
}
