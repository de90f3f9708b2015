// src/main.rs
mod analysis;
mod bot;
mod config;
mod domain;
mod exchange;
mod trading;

use crate::bot::SentryBot;
use crate::config::Config;
use crate::domain::errors::AppResult;
use crate::exchange::telegram::TelegramNotifier;
use crate::exchange::upstox::UpstoxClient;
use crate::trading::alerts::AlertSink;

use chrono::Duration;
use tokio::signal::ctrl_c;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    config.init_logging();

    log::info!("Starting market_sentry v{}", env!("CARGO_PKG_VERSION"));
    for index in &config.indices {
        log::info!(
            "Tracking {} ({}), option expiry {}",
            index.name,
            index.instrument_key,
            index.expiry
        );
    }

    let client = UpstoxClient::new(&config.broker.base_url, &config.broker.access_token);
    let notifier = TelegramNotifier::new(&config.telegram.bot_token, &config.telegram.chat_id);
    let sink = AlertSink::new(
        Box::new(notifier),
        Duration::seconds(config.engine.alert_cooldown_sec),
    );

    let mut bot = SentryBot::new(config, client, sink);

    log::info!("Bot is running. Press Ctrl+C to stop.");
    tokio::select! {
        _ = bot.run() => {}
        _ = ctrl_c() => log::info!("Shutting down..."),
    }

    Ok(())
}
