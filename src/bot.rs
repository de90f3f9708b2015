// src/bot.rs
use crate::analysis::profile::build_market_profile;
use crate::config::{Config, IndexConfig};
use crate::domain::models::{MarketProfile, Quote, WatchedOption};
use crate::exchange::client::BrokerClient;
use crate::trading::alerts::{format_profile, AlertSink};
use crate::trading::options::{atm_strike, pick_atm_window};
use crate::trading::signals::SignalEngine;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;

const CANDLE_INTERVAL: &str = "1minute";

/// The polling loop: quotes every cycle, profile rebuilds and watchlist
/// resolution on their own slower cadence, signal evaluation in fixed
/// config order.
///
/// Every upstream failure degrades to missing data for that cycle; nothing
/// here terminates the loop.
pub struct SentryBot<C: BrokerClient> {
    config: Config,
    client: C,
    engine: SignalEngine,
    sink: AlertSink,
    profiles: HashMap<String, MarketProfile>,
    watchlists: HashMap<String, Vec<WatchedOption>>,
    last_refresh: Option<DateTime<Utc>>,
}

impl<C: BrokerClient> SentryBot<C> {
    pub fn new(config: Config, client: C, sink: AlertSink) -> Self {
        let engine = SignalEngine::new(config.engine.clone());
        Self {
            config,
            client,
            engine,
            sink,
            profiles: HashMap::new(),
            watchlists: HashMap::new(),
            last_refresh: None,
        }
    }

    /// Run until the surrounding task is cancelled.
    pub async fn run(&mut self) {
        let interval = Duration::from_secs_f64(self.config.poller.interval_sec);
        loop {
            self.cycle(Utc::now()).await;
            sleep(interval).await;
        }
    }

    /// One polling cycle.
    async fn cycle(&mut self, now: DateTime<Utc>) {
        let quotes = self.poll_quotes().await;

        if self.refresh_due(now) {
            self.refresh_profiles(&quotes).await;
            self.last_refresh = Some(now);
        }

        self.evaluate(&quotes, now).await;
    }

    fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_refresh {
            Some(last) => {
                now - last >= chrono::Duration::minutes(self.config.profile.refresh_minutes)
            }
            None => true,
        }
    }

    /// Index keys plus every currently watched option key.
    fn tracked_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .indices
            .iter()
            .map(|i| i.instrument_key.clone())
            .collect();
        for index in &self.config.indices {
            if let Some(watch) = self.watchlists.get(&index.instrument_key) {
                keys.extend(watch.iter().map(|w| w.instrument_key.clone()));
            }
        }
        keys
    }

    /// Fetch quotes for everything tracked; a failed call yields an empty
    /// map and this cycle simply sees no data.
    async fn poll_quotes(&self) -> HashMap<String, Quote> {
        let keys = self.tracked_keys();
        match self.client.fetch_quotes(&keys).await {
            Ok(quotes) => quotes,
            Err(e) => {
                log::warn!("Quote fetch failed: {}", e);
                HashMap::new()
            }
        }
    }

    /// Rebuild each index profile from fresh candles and re-resolve its
    /// option watchlist from the current quote.
    async fn refresh_profiles(&mut self, quotes: &HashMap<String, Quote>) {
        let indices = self.config.indices.clone();
        for index in &indices {
            match self
                .client
                .fetch_candles(&index.instrument_key, CANDLE_INTERVAL)
                .await
            {
                Ok(candles) => {
                    match build_market_profile(&candles, self.config.profile.bucket_size) {
                        Some(mp) => {
                            log::info!(
                                "{} profile: POC {} VAH {} VAL {}",
                                index.name,
                                mp.poc,
                                mp.vah,
                                mp.val
                            );
                            self.sink.announce(&format_profile(&index.name, &mp)).await;
                            self.profiles.insert(index.instrument_key.clone(), mp);
                        }
                        None => {
                            log::warn!("No profile for {} (degenerate candle batch)", index.name)
                        }
                    }
                }
                Err(e) => log::warn!("Candle fetch failed for {}: {}", index.name, e),
            }

            self.refresh_watchlist(index, quotes).await;
        }
    }

    /// Resolve the ATM +/- N option watchlist for one index from its last
    /// traded price. Without a quote the previous watchlist is kept.
    async fn refresh_watchlist(&mut self, index: &IndexConfig, quotes: &HashMap<String, Quote>) {
        let quote = match quotes.get(&index.instrument_key) {
            Some(quote) => quote,
            None => {
                log::debug!("No quote for {}; keeping previous watchlist", index.name);
                return;
            }
        };

        let atm = atm_strike(quote.last_price, index.strike_step);
        match self
            .client
            .fetch_option_contracts(&index.instrument_key, index.expiry)
            .await
        {
            Ok(contracts) => {
                let watch =
                    pick_atm_window(&contracts, atm, self.config.poller.strikes_each_side);
                if watch.is_empty() {
                    log::warn!("No option contracts selected for {} around {}", index.name, atm);
                } else {
                    log::info!(
                        "Watching {} options for {} around ATM {}",
                        watch.len(),
                        index.name,
                        atm
                    );
                }
                self.watchlists.insert(index.instrument_key.clone(), watch);
            }
            Err(e) => log::warn!("Option contract fetch failed for {}: {}", index.name, e),
        }
    }

    /// Push this cycle's quotes through the signal engine, indices first,
    /// then each index's options in watchlist order.
    async fn evaluate(&mut self, quotes: &HashMap<String, Quote>, now: DateTime<Utc>) {
        let indices = self.config.indices.clone();
        for index in &indices {
            if let Some(quote) = quotes.get(&index.instrument_key) {
                let profile = self.profiles.get(&index.instrument_key).copied();
                let signals = self.engine.on_index_quote(
                    &index.instrument_key,
                    &index.name,
                    quote.last_price,
                    profile.as_ref(),
                    now,
                );
                for signal in &signals {
                    self.sink.dispatch(signal).await;
                }
            }

            let watch = self
                .watchlists
                .get(&index.instrument_key)
                .cloned()
                .unwrap_or_default();
            for option in &watch {
                if let Some(quote) = quotes.get(&option.instrument_key) {
                    let signals = self.engine.on_option_quote(
                        &option.instrument_key,
                        &option.trading_symbol,
                        quote.last_price,
                        quote.volume,
                        now,
                    );
                    for signal in &signals {
                        self.sink.dispatch(signal).await;
                    }
                }
            }
        }
    }
}
