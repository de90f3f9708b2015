// src/exchange/client.rs
use crate::domain::errors::{BrokerResult, NotifyResult};
use crate::domain::models::{Candle, OptionContract, Quote};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Read-only market data interface to the brokerage API.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Fetch the current session's intraday candles for one instrument.
    async fn fetch_candles(
        &self,
        instrument_key: &str,
        interval: &str,
    ) -> BrokerResult<Vec<Candle>>;

    /// Fetch last price and cumulative volume for a set of instruments.
    ///
    /// Instruments the upstream cannot resolve are absent from the result;
    /// partial coverage is not an error.
    async fn fetch_quotes(
        &self,
        instrument_keys: &[String],
    ) -> BrokerResult<HashMap<String, Quote>>;

    /// Fetch the option contract list for an underlying and expiry.
    async fn fetch_option_contracts(
        &self,
        underlying_key: &str,
        expiry: NaiveDate,
    ) -> BrokerResult<Vec<OptionContract>>;
}

/// Outbound alert transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one human-readable message.
    async fn notify(&self, text: &str) -> NotifyResult<()>;
}
