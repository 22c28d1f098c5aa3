mod cli;
mod local_player;
mod logger;
mod webhook;

use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use musicfig_core::{open_portal, run_service, Player, Providers, TagConfigStore};
use crate::cli::Cli;
use crate::local_player::LocalPlayer;
use crate::webhook::WebhookNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.log_level, cli.log_file.clone())?;

    let config = TagConfigStore::load(cli.config.clone())
        .with_context(|| format!("Failed to load tag configuration {}", cli.config.display()))?;
    let initial = config.current().clone();
    info!("Loaded {} tag binding(s) from {}", initial.bindings.len(), cli.config.display());

    let portal = open_portal().await;
    let player = match LocalPlayer::start() {
        Ok(player) => Player::new(Arc::new(player)),
        Err(e) => {
            warn!("Local playback disabled: {}", e);
            Player::noop()
        }
    };
    let providers = Providers {
        notifier: Arc::new(WebhookNotifier::new(initial.slack_hook.clone(), initial.timeouts.provider)),
        ..Providers::default()
    };

    let services = run_service(portal, player, providers, config).await?;

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C signal")?;
    info!("Exiting...");
    services.shutdown().await?;
    Ok(())
}
