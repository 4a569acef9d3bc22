use anyhow::Error;
use clap::Parser;
use std::sync::Arc;

use args::{Args, SubCommands};
use config::Config;

mod access;
mod args;
mod clients;
mod commands;
mod config;
mod cors;
mod handler;
mod models;
mod proxy;
mod relay;
#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "duckgate=info".to_string()),
        )
        .init();
    let args = Args::parse();
    let config = Arc::new(Config::load());
    match args.subcmd {
        Some(SubCommands::Proxy(_)) => {
            commands::proxy::run(config).await?;
        }
        Some(SubCommands::Start(_)) | None => {
            commands::start::run(config).await?;
        }
    }
    Ok(())
}
