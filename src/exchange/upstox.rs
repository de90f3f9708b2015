// src/exchange/upstox.rs
use crate::domain::errors::{BrokerError, BrokerResult};
use crate::domain::models::{Candle, OptionContract, Quote};
use crate::exchange::client::BrokerClient;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);
const CONTRACT_TIMEOUT: Duration = Duration::from_secs(8);
const CANDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstox v2 REST client.
///
/// Each call carries its own short timeout; a slow upstream degrades one
/// polling cycle, never the process.
pub struct UpstoxClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl UpstoxClient {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Reject payloads whose envelope does not report success.
    fn check_status(payload: &Value) -> BrokerResult<()> {
        match payload.get("status").and_then(Value::as_str) {
            Some("success") => Ok(()),
            Some(status) => Err(BrokerError::Api(format!("status {}", status))),
            None => Err(BrokerError::Shape("missing status field".to_string())),
        }
    }

    /// Parse `data.candles` rows of `[ts, open, high, low, close, volume, ..]`.
    ///
    /// Rows with fewer than six fields are skipped individually, not fatal
    /// to the batch.
    fn parse_candles(payload: &Value) -> BrokerResult<Vec<Candle>> {
        let rows = payload
            .pointer("/data/candles")
            .and_then(Value::as_array)
            .ok_or_else(|| BrokerError::Shape("missing data.candles".to_string()))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let row = match row.as_array() {
                Some(row) => row,
                None => continue,
            };
            if row.len() < 6 {
                continue;
            }

            candles.push(Candle {
                ts: row[0]
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                open: decimal_field(&row[1]),
                high: decimal_field(&row[2]),
                low: decimal_field(&row[3]),
                close: decimal_field(&row[4]),
                volume: decimal_field(&row[5]).unwrap_or(Decimal::ZERO),
            });
        }
        Ok(candles)
    }

    /// Parse the quote map, preferring `last_price` and falling back to
    /// `ohlc.close`. Entries with neither are omitted, not defaulted.
    fn parse_quotes(payload: &Value) -> BrokerResult<HashMap<String, Quote>> {
        let data = payload
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| BrokerError::Shape("missing data".to_string()))?;

        let mut quotes = HashMap::with_capacity(data.len());
        for (key, entry) in data {
            let last_price = entry
                .get("last_price")
                .and_then(decimal_field)
                .or_else(|| entry.pointer("/ohlc/close").and_then(decimal_field));

            let last_price = match last_price {
                Some(price) => price,
                None => continue,
            };
            let volume = entry
                .get("volume")
                .and_then(decimal_field)
                .unwrap_or(Decimal::ZERO);

            quotes.insert(
                key.clone(),
                Quote {
                    last_price,
                    volume,
                },
            );
        }
        Ok(quotes)
    }

    /// Parse the contract list, skipping rows that do not deserialize
    /// (e.g. unexpected instrument types).
    fn parse_contracts(payload: &Value) -> BrokerResult<Vec<OptionContract>> {
        let rows = payload
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| BrokerError::Shape("missing data".to_string()))?;

        let mut contracts = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<OptionContract>(row.clone()) {
                Ok(contract) => contracts.push(contract),
                Err(e) => log::debug!("Skipping contract row: {}", e),
            }
        }
        Ok(contracts)
    }

    async fn get_json(&self, request: reqwest::RequestBuilder, what: &str) -> BrokerResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| BrokerError::Request(format!("{}: {}", what, e)))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BrokerError::Shape(format!("{}: {}", what, e)))?;

        Self::check_status(&payload)?;
        Ok(payload)
    }
}

#[async_trait]
impl BrokerClient for UpstoxClient {
    async fn fetch_candles(
        &self,
        instrument_key: &str,
        interval: &str,
    ) -> BrokerResult<Vec<Candle>> {
        let url = format!(
            "{}/historical-candle/intraday/{}/{}",
            self.base_url, instrument_key, interval
        );
        // The intraday candle endpoint takes no authorization header.
        let request = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .timeout(CANDLE_TIMEOUT);

        let payload = self.get_json(request, "intraday candles").await?;
        Self::parse_candles(&payload)
    }

    async fn fetch_quotes(
        &self,
        instrument_keys: &[String],
    ) -> BrokerResult<HashMap<String, Quote>> {
        if instrument_keys.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/market-quote/quotes", self.base_url);
        let request = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .bearer_auth(&self.access_token)
            .query(&[("instrument_key", instrument_keys.join(","))])
            .timeout(QUOTE_TIMEOUT);

        let payload = self.get_json(request, "quotes").await?;
        Self::parse_quotes(&payload)
    }

    async fn fetch_option_contracts(
        &self,
        underlying_key: &str,
        expiry: NaiveDate,
    ) -> BrokerResult<Vec<OptionContract>> {
        let url = format!("{}/option/contract", self.base_url);
        let request = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .bearer_auth(&self.access_token)
            .query(&[
                ("instrument_key", underlying_key.to_string()),
                ("expiry_date", expiry.format("%Y-%m-%d").to_string()),
            ])
            .timeout(CONTRACT_TIMEOUT);

        let payload = self.get_json(request, "option contracts").await?;
        Self::parse_contracts(&payload)
    }
}

/// Numeric JSON field to `Decimal`; absent, null or non-numeric gives `None`.
fn decimal_field(value: &Value) -> Option<Decimal> {
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn status_envelope_is_enforced() {
        assert!(UpstoxClient::check_status(&json!({"status": "success"})).is_ok());

        let err = UpstoxClient::check_status(&json!({"status": "error"})).unwrap_err();
        assert!(matches!(err, BrokerError::Api(_)));

        let err = UpstoxClient::check_status(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, BrokerError::Shape(_)));
    }

    #[test]
    fn candle_rows_parse_and_short_rows_are_skipped() {
        let payload = json!({
            "status": "success",
            "data": {
                "candles": [
                    ["2025-11-20T09:15:00+05:30", 23180.0, 23195.5, 23170.0, 23190.2, 125000, 0],
                    ["2025-11-20T09:16:00+05:30", 23190.2],
                    ["2025-11-20T09:17:00+05:30", 23190.0, 23201.0, 23188.0, null, 80000, 0]
                ]
            }
        });

        let candles = UpstoxClient::parse_candles(&payload).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, Some(dec!(23190.2)));
        assert_eq!(candles[0].volume, dec!(125000));
        // Null close survives parsing; the profile builder skips it.
        assert_eq!(candles[1].close, None);
        assert!(candles[1].ts.is_some());
    }

    #[test]
    fn missing_candle_array_is_a_shape_error() {
        let payload = json!({"status": "success", "data": {}});
        assert!(matches!(
            UpstoxClient::parse_candles(&payload),
            Err(BrokerError::Shape(_))
        ));
    }

    #[test]
    fn quotes_fall_back_to_ohlc_close() {
        let payload = json!({
            "status": "success",
            "data": {
                "NSE_INDEX:Nifty 50": {"last_price": 23190.2, "volume": 0},
                "NSE_INDEX:Nifty Bank": {"ohlc": {"close": 49850.0}},
                "NSE_FO:dead": {"volume": 123}
            }
        });

        let quotes = UpstoxClient::parse_quotes(&payload).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes["NSE_INDEX:Nifty 50"],
            Quote {
                last_price: dec!(23190.2),
                volume: dec!(0)
            }
        );
        assert_eq!(quotes["NSE_INDEX:Nifty Bank"].last_price, dec!(49850));
        // The priceless entry is omitted entirely.
        assert!(!quotes.contains_key("NSE_FO:dead"));
    }

    #[test]
    fn contract_rows_parse_and_bad_rows_are_skipped() {
        let payload = json!({
            "status": "success",
            "data": [
                {
                    "instrument_key": "NSE_FO|52001",
                    "trading_symbol": "NIFTY 23200 CE",
                    "strike_price": 23200.0,
                    "instrument_type": "CE",
                    "expiry": "2025-11-25"
                },
                {
                    "instrument_key": "NSE_FO|52002",
                    "trading_symbol": "NIFTY FUT",
                    "instrument_type": "FUT",
                    "expiry": "2025-11-25"
                }
            ]
        });

        let contracts = UpstoxClient::parse_contracts(&payload).unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].strike_price, dec!(23200));
        assert_eq!(
            contracts[0].expiry,
            NaiveDate::from_ymd_opt(2025, 11, 25).unwrap()
        );
    }
}
