mod bot;
mod config;
mod moderation;
mod platform;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::moderation::Moderator;

/// Log to stdout and append a plain-text copy to `log_file`
fn init_logging(log_file: &Path) -> Result<()> {
    if let Some(dir) = log_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,groupwarden=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    init_logging(&config.logging.file)?;

    info!("Configuration loaded from: {}", config_path.display());
    info!("  Log file: {}", config.logging.file.display());

    let moderator = Moderator::new(&config.moderation)?;
    info!("  Allowed users: {}", moderator.allowlist().len());
    info!("  Warning lifetime: {:?}", moderator.warning_ttl());

    info!("Bot is starting...");
    bot::run(&config.telegram.bot_token, Arc::new(moderator)).await?;

    Ok(())
}
