// src/trading/alerts.rs
use crate::domain::models::{MarketProfile, Signal, SignalContext, SignalKind};
use crate::exchange::client::Notifier;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Formats signals and pushes them to the notifier, suppressing repeats of
/// the same kind on the same instrument within the cooldown window.
///
/// Delivery failures are logged and swallowed; a broken transport must not
/// interrupt polling.
pub struct AlertSink {
    notifier: Box<dyn Notifier>,
    cooldown: Duration,
    last_fired: HashMap<(String, SignalKind), DateTime<Utc>>,
}

impl AlertSink {
    pub fn new(notifier: Box<dyn Notifier>, cooldown: Duration) -> Self {
        Self {
            notifier,
            cooldown,
            last_fired: HashMap::new(),
        }
    }

    /// Dispatch one signal, applying the cooldown check first.
    ///
    /// A suppressed firing does not refresh the cooldown timestamp, so a
    /// persisting condition alerts again once the window elapses.
    pub async fn dispatch(&mut self, signal: &Signal) {
        let key = (signal.instrument_key.clone(), signal.kind);
        if let Some(last) = self.last_fired.get(&key) {
            if signal.ts - *last < self.cooldown {
                log::debug!(
                    "Suppressed {} on {} (cooldown)",
                    signal.kind.code(),
                    signal.label
                );
                return;
            }
        }
        self.last_fired.insert(key, signal.ts);

        log::info!(
            "{} on {} @ {}",
            signal.kind.code(),
            signal.label,
            signal.price
        );

        if let Err(e) = self.notifier.notify(&format_signal(signal)).await {
            log::warn!("Failed to deliver alert: {}", e);
        }
    }

    /// Send an informational message with no cooldown (profile snapshots).
    pub async fn announce(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            log::warn!("Failed to deliver message: {}", e);
        }
    }
}

/// Render the alert text for one signal.
fn format_signal(signal: &Signal) -> String {
    let header = format!(
        "{} ({}) on {}",
        signal.kind, signal.kind.code(), signal.label
    );

    match &signal.context {
        SignalContext::ValueArea { prev, vah, val } => format!(
            "{}\nprice {:.2} (prev {:.2})\nVAH {:.2} / VAL {:.2}",
            header, signal.price, prev, vah, val
        ),
        SignalContext::Footprint {
            interval_secs,
            volume_delta,
            baseline,
            move_pct,
        } => format!(
            "{}\nprice {:.2}, move {:.2}%\ntick gap {:.3}s, vol delta {:.0} vs base {:.1}",
            header, signal.price, move_pct, interval_secs, volume_delta, baseline
        ),
        SignalContext::Gamma {
            base_price,
            move_pct,
        } => format!(
            "{}\nprice {:.2}, {:.2}% from base {:.2}",
            header, signal.price, move_pct, base_price
        ),
    }
}

/// Render the market-profile snapshot text for one index.
pub fn format_profile(name: &str, mp: &MarketProfile) -> String {
    let mut text = format!(
        "{} MP\nPOC: {:.1}\nVAH: {:.1}\nVAL: {:.1}",
        name, mp.poc, mp.vah, mp.val
    );
    if let (Some(high), Some(low)) = (mp.high, mp.low) {
        text.push_str(&format!("\nDay High/Low: {:.1} / {:.1}", high, low));
    }
    text
}
