// src/trading/signals.rs
use crate::config::EngineConfig;
use crate::domain::models::{MarketProfile, Signal, SignalContext, SignalKind, Tick};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// Bounded FIFO history of recent ticks for one instrument.
#[derive(Debug, Clone)]
pub struct TickWindow {
    ticks: VecDeque<Tick>,
    capacity: usize,
}

impl TickWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a tick, evicting the oldest once at capacity.
    pub fn push(&mut self, tick: Tick) {
        if self.ticks.len() >= self.capacity {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Newest retained tick.
    pub fn latest(&self) -> Option<&Tick> {
        self.ticks.back()
    }

    /// Oldest retained tick; its price is the rolling base for gamma moves.
    pub fn base(&self) -> Option<&Tick> {
        self.ticks.front()
    }

    /// Mean per-tick volume delta across the window, excluding the newest
    /// sample so a burst in progress does not inflate its own baseline.
    pub fn baseline_volume_rate(&self) -> Option<Decimal> {
        // One delta over the older pair needs at least three ticks.
        if self.ticks.len() < 3 {
            return None;
        }

        let upto = self.ticks.len() - 1;
        let mut sum = Decimal::ZERO;
        let mut count: i64 = 0;
        for i in 1..upto {
            sum += self.ticks[i].volume - self.ticks[i - 1].volume;
            count += 1;
        }

        if count == 0 {
            None
        } else {
            Some(sum / Decimal::from(count))
        }
    }
}

/// Gamma-blast detection state for one option instrument.
///
/// `Normal -> Armed` on an HFT footprint; `Armed -> Fired` on a qualifying
/// move, or back to `Normal` when the arming window expires; `Fired`
/// collapses to `Normal` on the next observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GammaState {
    Normal,
    Armed {
        since: DateTime<Utc>,
        base_price: Decimal,
    },
    Fired,
}

#[derive(Debug)]
struct OptionTrack {
    ticks: TickWindow,
    gamma: GammaState,
}

/// Evaluates reversal, breakout, footprint and gamma-blast rules against
/// live quotes.
///
/// Index instruments are judged against the latest market profile; option
/// instruments against their own bounded tick history. All state lives here
/// and is touched only from the polling loop.
pub struct SignalEngine {
    cfg: EngineConfig,
    index_last: HashMap<String, Decimal>,
    options: HashMap<String, OptionTrack>,
}

impl SignalEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            index_last: HashMap::new(),
            options: HashMap::new(),
        }
    }

    /// Evaluate an index quote against the active market profile.
    ///
    /// The first observation for an instrument only seeds the previous
    /// price; without a profile no rule can fire.
    pub fn on_index_quote(
        &mut self,
        instrument_key: &str,
        label: &str,
        price: Decimal,
        profile: Option<&MarketProfile>,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        let prev = self.index_last.insert(instrument_key.to_string(), price);

        let (prev, mp) = match (prev, profile) {
            (Some(prev), Some(mp)) => (prev, mp),
            _ => return Vec::new(),
        };

        let kind = if prev < mp.val && price >= mp.val {
            // Breakdown rejected: sellers below value are trapped.
            Some(SignalKind::TrappedSellersBuy)
        } else if prev > mp.vah && price <= mp.vah {
            Some(SignalKind::TrappedBuyersSell)
        } else if mp.in_value_area(prev) && price > mp.vah {
            Some(SignalKind::InitiativeBuying)
        } else if mp.in_value_area(prev) && price < mp.val {
            Some(SignalKind::InitiativeSelling)
        } else {
            None
        };

        kind.map(|kind| Signal {
            kind,
            instrument_key: instrument_key.to_string(),
            label: label.to_string(),
            price,
            ts: now,
            context: SignalContext::ValueArea {
                prev,
                vah: mp.vah,
                val: mp.val,
            },
        })
        .into_iter()
        .collect()
    }

    /// Evaluate an option quote: the armed gamma state is resolved first,
    /// then footprint detection, then the tick is recorded.
    ///
    /// Resolving before detection means a footprint can never trigger its
    /// own blast within the same observation.
    pub fn on_option_quote(
        &mut self,
        instrument_key: &str,
        label: &str,
        price: Decimal,
        volume: Decimal,
        now: DateTime<Utc>,
    ) -> Vec<Signal> {
        let capacity = self.cfg.lookback_ticks_for_base;
        let track = self
            .options
            .entry(instrument_key.to_string())
            .or_insert_with(|| OptionTrack {
                ticks: TickWindow::new(capacity),
                gamma: GammaState::Normal,
            });

        let mut signals = Vec::new();

        match track.gamma {
            GammaState::Fired => track.gamma = GammaState::Normal,
            GammaState::Armed { since, base_price } => {
                if now - since > Duration::seconds(self.cfg.recent_hft_sec) {
                    track.gamma = GammaState::Normal;
                } else if base_price > Decimal::ZERO {
                    let move_pct = percent_move(base_price, price);
                    if move_pct > self.cfg.price_move_gamma_pct {
                        signals.push(Signal {
                            kind: SignalKind::GammaBlast,
                            instrument_key: instrument_key.to_string(),
                            label: label.to_string(),
                            price,
                            ts: now,
                            context: SignalContext::Gamma {
                                base_price,
                                move_pct,
                            },
                        });
                        track.gamma = GammaState::Fired;
                    }
                }
            }
            GammaState::Normal => {}
        }

        if let Some(prev) = track.ticks.latest().copied() {
            let interval_secs = (now - prev.ts).num_milliseconds() as f64 / 1000.0;
            let volume_delta = volume - prev.volume;
            let baseline = track.ticks.baseline_volume_rate().unwrap_or(Decimal::ZERO);
            let move_pct = if prev.price > Decimal::ZERO {
                percent_move(prev.price, price)
            } else {
                Decimal::ZERO
            };

            let fast_tick = interval_secs < self.cfg.min_tick_interval_sec;
            let volume_burst = baseline > Decimal::ZERO
                && volume_delta > baseline * self.cfg.hft_volume_multiplier;
            let small_move =
                prev.price > Decimal::ZERO && move_pct < self.cfg.price_move_small_pct;

            if fast_tick && volume_burst && small_move {
                signals.push(Signal {
                    kind: SignalKind::HftFootprint,
                    instrument_key: instrument_key.to_string(),
                    label: label.to_string(),
                    price,
                    ts: now,
                    context: SignalContext::Footprint {
                        interval_secs,
                        volume_delta,
                        baseline,
                        move_pct,
                    },
                });

                if let Some(base) = track.ticks.base() {
                    track.gamma = GammaState::Armed {
                        since: now,
                        base_price: base.price,
                    };
                }
            }
        }

        track.ticks.push(Tick { ts: now, price, volume });
        signals
    }
}

/// Absolute percentage move from `from` to `to`.
fn percent_move(from: Decimal, to: Decimal) -> Decimal {
    ((to - from) / from * Decimal::ONE_HUNDRED).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn cfg() -> EngineConfig {
        EngineConfig {
            min_tick_interval_sec: 0.35,
            hft_volume_multiplier: dec!(3.0),
            price_move_small_pct: dec!(0.20),
            price_move_gamma_pct: dec!(1.00),
            lookback_ticks_for_base: 25,
            recent_hft_sec: 30,
            alert_cooldown_sec: 90,
        }
    }

    fn profile(val: i64, poc: i64, vah: i64) -> MarketProfile {
        MarketProfile {
            poc: Decimal::from(poc),
            vah: Decimal::from(vah),
            val: Decimal::from(val),
            high: None,
            low: None,
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn kinds(signals: &[Signal]) -> Vec<SignalKind> {
        signals.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn tick_window_evicts_oldest_first() {
        let mut window = TickWindow::new(3);
        for i in 0..5 {
            window.push(Tick {
                ts: at(i * 1000),
                price: Decimal::from(100 + i),
                volume: Decimal::from(i * 10),
            });
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.base().unwrap().price, dec!(102));
        assert_eq!(window.latest().unwrap().price, dec!(104));
    }

    #[test]
    fn baseline_excludes_newest_sample() {
        let mut window = TickWindow::new(10);
        // Steady deltas of 10, then a 100 burst as the newest sample.
        for (i, vol) in [0i64, 10, 20, 120].iter().enumerate() {
            window.push(Tick {
                ts: at(i as i64 * 1000),
                price: dec!(100),
                volume: Decimal::from(*vol),
            });
        }
        assert_eq!(window.baseline_volume_rate(), Some(dec!(10)));
    }

    #[test]
    fn baseline_needs_three_ticks() {
        let mut window = TickWindow::new(10);
        window.push(Tick { ts: at(0), price: dec!(100), volume: dec!(0) });
        window.push(Tick { ts: at(1000), price: dec!(100), volume: dec!(10) });
        assert_eq!(window.baseline_volume_rate(), None);
    }

    #[test]
    fn tsb_fires_on_reentry_from_below_val() {
        let mut engine = SignalEngine::new(cfg());
        let mp = profile(100, 105, 110);

        let first = engine.on_index_quote("idx", "NIFTY", dec!(99), Some(&mp), at(0));
        assert!(first.is_empty());

        let second = engine.on_index_quote("idx", "NIFTY", dec!(101), Some(&mp), at(1000));
        assert_eq!(kinds(&second), vec![SignalKind::TrappedSellersBuy]);
    }

    #[test]
    fn no_tsb_when_already_inside_value() {
        let mut engine = SignalEngine::new(cfg());
        let mp = profile(100, 105, 110);

        engine.on_index_quote("idx", "NIFTY", dec!(101), Some(&mp), at(0));
        let signals = engine.on_index_quote("idx", "NIFTY", dec!(102), Some(&mp), at(1000));
        assert!(signals.is_empty());
    }

    #[test]
    fn tbs_fires_on_reentry_from_above_vah() {
        let mut engine = SignalEngine::new(cfg());
        let mp = profile(100, 105, 110);

        engine.on_index_quote("idx", "NIFTY", dec!(112), Some(&mp), at(0));
        let signals = engine.on_index_quote("idx", "NIFTY", dec!(110), Some(&mp), at(1000));
        assert_eq!(kinds(&signals), vec![SignalKind::TrappedBuyersSell]);
    }

    #[test]
    fn initiative_buying_breaks_out_from_inside() {
        let mut engine = SignalEngine::new(cfg());
        let mp = profile(100, 105, 110);

        engine.on_index_quote("idx", "NIFTY", dec!(108), Some(&mp), at(0));
        let signals = engine.on_index_quote("idx", "NIFTY", dec!(111), Some(&mp), at(1000));
        assert_eq!(kinds(&signals), vec![SignalKind::InitiativeBuying]);
    }

    #[test]
    fn initiative_selling_breaks_down_from_inside() {
        let mut engine = SignalEngine::new(cfg());
        let mp = profile(100, 105, 110);

        engine.on_index_quote("idx", "NIFTY", dec!(102), Some(&mp), at(0));
        let signals = engine.on_index_quote("idx", "NIFTY", dec!(99), Some(&mp), at(1000));
        assert_eq!(kinds(&signals), vec![SignalKind::InitiativeSelling]);
    }

    #[test]
    fn no_index_signal_without_profile() {
        let mut engine = SignalEngine::new(cfg());
        engine.on_index_quote("idx", "NIFTY", dec!(99), None, at(0));
        let signals = engine.on_index_quote("idx", "NIFTY", dec!(101), None, at(1000));
        assert!(signals.is_empty());
    }

    /// Seed an option with ticks one second apart and a steady volume rate
    /// of 10 per tick, returning the timestamp offset of the last tick.
    fn seed_option(engine: &mut SignalEngine, key: &str, count: i64) -> i64 {
        for i in 0..count {
            let signals = engine.on_option_quote(
                key,
                "NIFTY 23200 CE",
                dec!(200),
                Decimal::from(i * 10),
                at(i * 1000),
            );
            assert!(signals.is_empty());
        }
        (count - 1) * 1000
    }

    #[test]
    fn hft_footprint_fires_when_all_three_conditions_hold() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        // 0.3s gap, volume delta 50 vs baseline 10, price move 0.1%.
        let signals =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(200.2), dec!(90), at(last + 300));
        assert_eq!(kinds(&signals), vec![SignalKind::HftFootprint]);
    }

    #[test]
    fn slow_tick_suppresses_footprint() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        let signals =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(200.2), dec!(90), at(last + 1000));
        assert!(signals.is_empty());
    }

    #[test]
    fn modest_volume_suppresses_footprint() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        // Delta 20 does not exceed 3x the baseline of 10.
        let signals =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(200.2), dec!(60), at(last + 300));
        assert!(signals.is_empty());
    }

    #[test]
    fn large_price_move_suppresses_footprint() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        // A 0.5% move breaks the "small shock" condition.
        let signals =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(201), dec!(90), at(last + 300));
        assert!(signals.is_empty());
    }

    #[test]
    fn gamma_blast_follows_footprint_within_window() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        let footprint =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(200.2), dec!(90), at(last + 300));
        assert_eq!(kinds(&footprint), vec![SignalKind::HftFootprint]);

        // Base price is the oldest retained tick (200); +1.5% qualifies.
        let blast =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(203), dec!(95), at(last + 5300));
        assert_eq!(kinds(&blast), vec![SignalKind::GammaBlast]);
    }

    #[test]
    fn gamma_does_not_fire_after_arming_window_expires() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(200.2), dec!(90), at(last + 300));

        // 31s later the armed state has lapsed.
        let signals =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(203), dec!(95), at(last + 31_300));
        assert!(signals.is_empty());
    }

    #[test]
    fn gamma_requires_a_prior_footprint() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        // Large move with no armed state; the slow tick means no footprint
        // either.
        let signals =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(203), dec!(50), at(last + 1000));
        assert!(signals.is_empty());
    }

    #[test]
    fn gamma_fires_once_per_arming() {
        let mut engine = SignalEngine::new(cfg());
        let last = seed_option(&mut engine, "opt", 5);

        engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(200.2), dec!(90), at(last + 300));
        let blast =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(203), dec!(95), at(last + 5300));
        assert_eq!(kinds(&blast), vec![SignalKind::GammaBlast]);

        // Still moving, but the state already fired and collapsed.
        let repeat =
            engine.on_option_quote("opt", "NIFTY 23200 CE", dec!(206), dec!(100), at(last + 6300));
        assert!(repeat.is_empty());
    }
}
