// src/trading/options.rs
use crate::domain::models::{OptionContract, OptionSide, WatchedOption};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Round an underlying price to the nearest multiple of the strike step.
pub fn atm_strike(price: Decimal, step: i64) -> i64 {
    let step = Decimal::from(step);
    ((price / step).round() * step).to_i64().unwrap_or(0)
}

/// Select call and put contracts for ATM ± `each_side` strikes.
///
/// For each side the distinct strikes are sorted, the strike nearest the ATM
/// value is located (ties toward the lower strike), and a contiguous window
/// of `each_side` strikes below through `each_side` above is taken, clipped
/// at the edges of the available range. Strikes missing from the chain are
/// omitted, never padded. The first contract found per selected strike is
/// emitted; all calls precede all puts.
pub fn pick_atm_window(
    contracts: &[OptionContract],
    atm: i64,
    each_side: usize,
) -> Vec<WatchedOption> {
    let mut picked = Vec::new();

    for side in [OptionSide::Call, OptionSide::Put] {
        let subset: Vec<&OptionContract> =
            contracts.iter().filter(|c| c.side == side).collect();
        if subset.is_empty() {
            continue;
        }

        let mut strikes: Vec<i64> = subset
            .iter()
            .filter_map(|c| c.strike_price.to_i64())
            .collect();
        strikes.sort_unstable();
        strikes.dedup();
        if strikes.is_empty() {
            continue;
        }

        // First minimum while scanning ascending keeps the lower strike on
        // an exact tie.
        let mut atm_idx = 0;
        for (i, strike) in strikes.iter().enumerate() {
            if (strike - atm).abs() < (strikes[atm_idx] - atm).abs() {
                atm_idx = i;
            }
        }

        let start = atm_idx.saturating_sub(each_side);
        let end = usize::min(atm_idx + each_side, strikes.len() - 1);

        for strike in &strikes[start..=end] {
            if let Some(contract) = subset
                .iter()
                .find(|c| c.strike_price.to_i64() == Some(*strike))
            {
                picked.push(WatchedOption {
                    instrument_key: contract.instrument_key.clone(),
                    trading_symbol: contract.trading_symbol.clone(),
                });
            }
        }
    }

    picked
}
