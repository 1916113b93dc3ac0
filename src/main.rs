use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod bot;
mod config;
mod db;
mod notify;
mod odds_api;
mod retry;

use bot::BotEngine;
use config::Config;
use db::Database;
use notify::{LogNotifier, Notifier, TelegramNotifier};
use odds_api::{OddsApiClient, OddsSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.dry_run {
        info!("🟡 DRY RUN mode – digest goes to the log, nothing is posted");
    } else {
        info!("🔴 LIVE mode – digest WILL be posted to Telegram");
    }

    let db = Database::open(&config.database_path)?;
    info!(
        "Database opened: {} ({} cooldown key(s))",
        config.database_path,
        db.count_sent()?
    );

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let source: Arc<dyn OddsSource> = Arc::new(OddsApiClient::new(
        &config.odds_api_url,
        config.odds_api_key.clone(),
        &config.region,
        timeout,
    )?);

    let notifier: Arc<dyn Notifier> = if config.dry_run {
        Arc::new(LogNotifier)
    } else {
        let token = config
            .telegram_bot_token
            .as_deref()
            .context("TELEGRAM_BOT_TOKEN missing")?;
        let chat_id = config
            .telegram_chat_id
            .as_deref()
            .context("TELEGRAM_CHAT_ID missing")?;
        Arc::new(TelegramNotifier::new(
            &config.telegram_api_url,
            token,
            chat_id,
            timeout,
        )?)
    };

    info!(
        "Sports: {} | target books: {} | via {} → {}",
        config.sports().join(","),
        config.target_books().join(","),
        source.name(),
        notifier.name()
    );

    let interval = config.run_interval_minutes;
    let engine = BotEngine::new(config, db, source, notifier);

    match interval {
        Some(minutes) => {
            info!("Running every {} minute(s)", minutes);
            engine
                .run_forever(Duration::from_secs(minutes.max(1) * 60))
                .await
        }
        None => {
            engine.run_cycle().await?;
            Ok(())
        }
    }
}
