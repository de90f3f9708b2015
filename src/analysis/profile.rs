// src/analysis/profile.rs
use crate::domain::models::{Candle, MarketProfile};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Share of total volume the value area must cover.
const VALUE_AREA_SHARE: Decimal = dec!(0.70);

/// Round a price to the nearest multiple of `bucket_size`.
fn bucket_price(price: Decimal, bucket_size: Decimal) -> Decimal {
    (price / bucket_size).round() * bucket_size
}

/// Build a volume-at-price market profile from one session of intraday
/// candles.
///
/// Each candle's volume is accumulated into the bucket nearest its close;
/// session high/low are tracked from candle extremes, skipping null fields.
/// POC is the highest-volume bucket, and VAH/VAL bound the smallest set of
/// highest-volume buckets covering 70% of total volume. Equal-volume buckets
/// resolve toward the lower price, so the result is independent of candle
/// order.
///
/// Returns `None` for degenerate input: no candles, no usable closes, or
/// non-positive total volume.
pub fn build_market_profile(candles: &[Candle], bucket_size: Decimal) -> Option<MarketProfile> {
    if candles.is_empty() || bucket_size <= Decimal::ZERO {
        return None;
    }

    let mut vol_at_price: HashMap<Decimal, Decimal> = HashMap::new();
    let mut total_vol = Decimal::ZERO;
    let mut high: Option<Decimal> = None;
    let mut low: Option<Decimal> = None;

    for candle in candles {
        let close = match candle.close {
            Some(close) => close,
            None => continue,
        };

        let bucket = bucket_price(close, bucket_size);
        *vol_at_price.entry(bucket).or_insert(Decimal::ZERO) += candle.volume;
        total_vol += candle.volume;

        if let Some(h) = candle.high {
            high = Some(high.map_or(h, |cur| cur.max(h)));
        }
        if let Some(l) = candle.low {
            low = Some(low.map_or(l, |cur| cur.min(l)));
        }
    }

    if vol_at_price.is_empty() || total_vol <= Decimal::ZERO {
        return None;
    }

    // Highest volume first; ties resolve to the lower price.
    let mut by_volume: Vec<(Decimal, Decimal)> = vol_at_price.into_iter().collect();
    by_volume.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let poc = by_volume[0].0;

    // Accept buckets until the cumulative share reaches the target; the
    // bucket that crosses the threshold is included.
    let target = total_vol * VALUE_AREA_SHARE;
    let mut cum = Decimal::ZERO;
    let mut vah = poc;
    let mut val = poc;
    for (price, vol) in &by_volume {
        cum += *vol;
        vah = vah.max(*price);
        val = val.min(*price);
        if cum >= target {
            break;
        }
    }

    Some(MarketProfile {
        poc,
        vah,
        val,
        high,
        low,
    })
}
