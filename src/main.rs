#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

mod appeals;
mod cli;
mod community;
mod config;
mod db;
mod discord;
mod rate_limit;
mod utils;
mod web;
mod webhook;

use cli::{Cli, Command};
use config::Config;
use discord::{DiscordClient, GuildDirectory};
use web::metrics::Metrics;
use web::{AppState, WebServer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };

    if cli.action() == Command::CheckConfig {
        println!(
            "config is valid ({} database, {} tier roles)",
            config.database.db_type(),
            config.roles.tiers.len()
        );
        return Ok(());
    }

    utils::logging::init_tracing(&config.logging);
    Metrics::start_clock();
    let config = Arc::new(config);

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;
    info!(backend = %db_manager.db_type(), "database ready");

    if cli.action() == Command::Migrate {
        return Ok(());
    }

    let directory: Arc<dyn GuildDirectory> = Arc::new(DiscordClient::new(&config.discord));
    let state = Arc::new(AppState::new(config.clone(), db_manager, directory));

    let web_server = WebServer::new(state);
    let sweeper = web_server.spawn_limiter_sweeper();
    info!("conclave site starting up");

    tokio::select! {
        result = web_server.start() => {
            if let Err(e) = result {
                error!("web server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    sweeper.abort();
    info!("conclave site shutting down");
    Ok(())
}
