// src/domain/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;

/// One intraday candle as reported by the broker.
///
/// Price fields are optional because the upstream feed occasionally delivers
/// rows with null entries; candles without a close carry no profile volume.
#[derive(Debug, Clone)]
pub struct Candle {
    pub ts: Option<DateTime<Utc>>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Decimal,
}

/// Latest traded price and cumulative session volume for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub last_price: Decimal,
    pub volume: Decimal,
}

/// A quote observation stamped at arrival time.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub ts: DateTime<Utc>,
    pub price: Decimal,
    pub volume: Decimal,
}

/// Option contract type, encoded as CE/PE on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OptionSide {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl OptionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionSide::Call => "CE",
            OptionSide::Put => "PE",
        }
    }
}

/// One tradable option contract from the chain endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionContract {
    pub instrument_key: String,
    pub trading_symbol: String,
    pub strike_price: Decimal,
    #[serde(rename = "instrument_type")]
    pub side: OptionSide,
    pub expiry: NaiveDate,
}

/// An option selected into the polling watchlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedOption {
    pub instrument_key: String,
    pub trading_symbol: String,
}

/// Immutable snapshot of the intraday volume-at-price distribution.
///
/// `val <= poc <= vah` holds by construction. Session high/low are `None`
/// when every candle in the batch lacked the corresponding extreme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketProfile {
    pub poc: Decimal,
    pub vah: Decimal,
    pub val: Decimal,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
}

impl MarketProfile {
    /// True when a price sits inside the value area (bounds inclusive).
    pub fn in_value_area(&self, price: Decimal) -> bool {
        price >= self.val && price <= self.vah
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    TrappedSellersBuy,
    TrappedBuyersSell,
    InitiativeBuying,
    InitiativeSelling,
    HftFootprint,
    GammaBlast,
}

impl SignalKind {
    /// Short code used in alert headers and logs.
    pub fn code(&self) -> &'static str {
        match self {
            SignalKind::TrappedSellersBuy => "TSB",
            SignalKind::TrappedBuyersSell => "TBS",
            SignalKind::InitiativeBuying => "IB",
            SignalKind::InitiativeSelling => "IS",
            SignalKind::HftFootprint => "HFT",
            SignalKind::GammaBlast => "GAMMA",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SignalKind::TrappedSellersBuy => "Trapped Sellers Buy",
            SignalKind::TrappedBuyersSell => "Trapped Buyers Sell",
            SignalKind::InitiativeBuying => "Initiative Buying",
            SignalKind::InitiativeSelling => "Initiative Selling",
            SignalKind::HftFootprint => "HFT Footprint",
            SignalKind::GammaBlast => "Gamma Blast",
        };
        write!(f, "{}", name)
    }
}

/// Kind-specific measurements carried with a signal for alert formatting.
#[derive(Debug, Clone)]
pub enum SignalContext {
    /// Index signals: previous price against the active value area.
    ValueArea {
        prev: Decimal,
        vah: Decimal,
        val: Decimal,
    },
    /// HFT footprint measurements at detection time.
    Footprint {
        interval_secs: f64,
        volume_delta: Decimal,
        baseline: Decimal,
        move_pct: Decimal,
    },
    /// Gamma blast: move from the base price recorded at footprint time.
    Gamma {
        base_price: Decimal,
        move_pct: Decimal,
    },
}

/// A detected trading signal, ready for alert dispatch.
#[derive(Debug, Clone)]
pub struct Signal {
    pub kind: SignalKind,
    pub instrument_key: String,
    /// Display name: index name or option trading symbol.
    pub label: String,
    pub price: Decimal,
    pub ts: DateTime<Utc>,
    pub context: SignalContext,
}
