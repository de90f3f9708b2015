// src/config.rs
use crate::domain::errors::{AppError, AppResult};
use chrono::NaiveDate;
use dotenv::dotenv;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;

/// Monitoring bot configuration, assembled once at startup and passed into
/// the poller, profile builder and signal engine by value.
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker API access
    pub broker: BrokerConfig,

    /// Telegram alert delivery
    pub telegram: TelegramConfig,

    /// Tracked index families, in evaluation order
    pub indices: Vec<IndexConfig>,

    /// Market profile construction
    pub profile: ProfileConfig,

    /// Polling cadence and option watchlist sizing
    pub poller: PollerConfig,

    /// Signal engine tunables
    pub engine: EngineConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Broker API configuration
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Daily bearer token (see the convert_token utility)
    pub access_token: String,

    /// API base URL
    pub base_url: String,
}

/// Telegram configuration; empty values degrade delivery to log lines
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// One tracked index family
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Display name used in alerts (e.g. "NIFTY")
    pub name: String,

    /// Broker instrument key for the index itself
    pub instrument_key: String,

    /// Option expiry to resolve the watchlist against
    pub expiry: NaiveDate,

    /// Strike increment for this family (50 for NIFTY, 100 for BANKNIFTY)
    pub strike_step: i64,
}

/// Market profile configuration
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    /// Volume-at-price bucket width
    pub bucket_size: Decimal,

    /// How often the profile is rebuilt from fresh candles
    pub refresh_minutes: i64,
}

/// Polling loop configuration
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep between polling cycles, in seconds
    pub interval_sec: f64,

    /// Strikes selected on each side of ATM, per option type
    pub strikes_each_side: usize,
}

/// Signal engine tunables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Inter-tick gap below which a tick counts as "fast", in seconds
    pub min_tick_interval_sec: f64,

    /// Volume delta must exceed this multiple of the rolling baseline
    pub hft_volume_multiplier: Decimal,

    /// Price move below this percentage still counts as "small"
    pub price_move_small_pct: Decimal,

    /// Move from the footprint base price that qualifies as a gamma blast
    pub price_move_gamma_pct: Decimal,

    /// Tick history capacity per option instrument
    pub lookback_ticks_for_base: usize,

    /// How long a footprint keeps the gamma state armed, in seconds
    pub recent_hft_sec: i64,

    /// Per-instrument, per-kind alert suppression window, in seconds
    pub alert_cooldown_sec: i64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (e.g. "info", "debug", "warn", "error")
    pub level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `ACCESS_TOKEN` and the two expiry dates are required; every numeric
    /// tunable falls back to its documented default.
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let broker = BrokerConfig {
            access_token: env::var("ACCESS_TOKEN").map_err(|_| {
                AppError::Config("Missing ACCESS_TOKEN environment variable".to_string())
            })?,
            base_url: env::var("UPSTOX_BASE_URL")
                .unwrap_or_else(|_| "https://api.upstox.com/v2".to_string()),
        };

        let telegram = TelegramConfig {
            bot_token: env::var("BOT_TOKEN").unwrap_or_default(),
            chat_id: env::var("CHAT_ID").unwrap_or_default(),
        };

        let indices = vec![
            IndexConfig {
                name: "NIFTY".to_string(),
                instrument_key: "NSE_INDEX|Nifty 50".to_string(),
                expiry: expiry_var("NIFTY_EXPIRY")?,
                strike_step: 50,
            },
            IndexConfig {
                name: "BANKNIFTY".to_string(),
                instrument_key: "NSE_INDEX|Nifty Bank".to_string(),
                expiry: expiry_var("BANKNIFTY_EXPIRY")?,
                strike_step: 100,
            },
        ];

        let profile = ProfileConfig {
            bucket_size: decimal_var("PRICE_BUCKET_SIZE", dec!(10.0)),
            refresh_minutes: int_var("MP_REFRESH_MINUTES", 15),
        };

        let poller = PollerConfig {
            interval_sec: float_var("POLL_INTERVAL_SEC", 1.0),
            strikes_each_side: int_var("STRIKES_EACH_SIDE", 3) as usize,
        };

        let engine = EngineConfig {
            min_tick_interval_sec: float_var("MIN_TICK_INTERVAL_SEC", 0.35),
            hft_volume_multiplier: decimal_var("HFT_VOLUME_MULTIPLIER", dec!(3.0)),
            price_move_small_pct: decimal_var("PRICE_MOVE_SMALL_PCT", dec!(0.20)),
            price_move_gamma_pct: decimal_var("PRICE_MOVE_GAMMA_PCT", dec!(1.00)),
            lookback_ticks_for_base: int_var("LOOKBACK_TICKS_FOR_BASE", 25) as usize,
            recent_hft_sec: int_var("RECENT_HFT_SEC", 30),
            alert_cooldown_sec: int_var("ALERT_COOLDOWN_SEC", 90),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Config {
            broker,
            telegram,
            indices,
            profile,
            poller,
            engine,
            logging,
        })
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        env_logger::Builder::new().filter_level(log_level).init();
    }
}

/// Expiry date variable, `YYYY-MM-DD`. Missing or malformed values are a
/// configuration error: a wrong expiry would silently produce an empty
/// option chain.
fn expiry_var(name: &str) -> AppResult<NaiveDate> {
    let raw = env::var(name)
        .map_err(|_| AppError::Config(format!("Missing {} environment variable", name)))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        AppError::Config(format!("Invalid {}: {} ({})", name, raw, e))
    })
}

fn decimal_var(name: &str, default: Decimal) -> Decimal {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn float_var(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn int_var(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
