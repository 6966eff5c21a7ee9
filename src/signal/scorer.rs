use std::collections::{HashMap, VecDeque};

use chrono::Duration;
use rust_decimal::Decimal;

const HISTORY_WINDOW: usize = 20;
const HISTORY_MIN_SAMPLES: usize = 3;
const HISTORY_DEFAULT: Decimal = Decimal::new(50, 0);
const LIQUIDITY_PLACEHOLDER: Decimal = Decimal::new(80, 0);
const INVENTORY_RED: Decimal = Decimal::new(20, 0);
const INVENTORY_GREEN: Decimal = Decimal::new(60, 0);

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub spread: Decimal,
    pub liquidity: Decimal,
    pub inventory: Decimal,
    pub history: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            spread: Decimal::new(40, 2),
            liquidity: Decimal::new(20, 2),
            inventory: Decimal::new(20, 2),
            history: Decimal::new(20, 2),
        }
    }
}

/// Weighted composite score in `[0, 100]` with per-pair rolling history and
/// TTL-based decay. The `liquidity` component is a documented constant
/// placeholder (spec.md §9 open question): the hook takes the same shape a
/// depth-aware version would but no such implementation is specified.
pub struct Scorer {
    weights: ScoreWeights,
    min_spread_bps: Decimal,
    excellent_spread_bps: Decimal,
    history: HashMap<String, VecDeque<bool>>,
}

impl Scorer {
    pub fn new(weights: ScoreWeights, min_spread_bps: Decimal, excellent_spread_bps: Decimal) -> Self {
        Scorer {
            weights,
            min_spread_bps,
            excellent_spread_bps,
            history: HashMap::new(),
        }
    }

    /// Records a trade's terminal success/failure for `pair`'s rolling
    /// history; keeps only the most recent `HISTORY_WINDOW` results.
    pub fn record_result(&mut self, pair: &str, success: bool) {
        let entry = self.history.entry(pair.to_string()).or_default();
        entry.push_back(success);
        while entry.len() > HISTORY_WINDOW {
            entry.pop_front();
        }
    }

    fn spread_component(&self, spread_bps: Decimal) -> Decimal {
        if spread_bps <= self.min_spread_bps {
            return Decimal::ZERO;
        }
        if spread_bps >= self.excellent_spread_bps {
            return Decimal::new(100, 0);
        }
        let span = self.excellent_spread_bps - self.min_spread_bps;
        if span <= Decimal::ZERO {
            return Decimal::new(100, 0);
        }
        (spread_bps - self.min_spread_bps) / span * Decimal::new(100, 0)
    }

    /// Placeholder per spec.md §9: always 80, regardless of the signal's
    /// actual depth. Kept as a method (not an inline constant) so a
    /// depth-aware replacement has the same call site.
    fn liquidity_component(&self) -> Decimal {
        LIQUIDITY_PLACEHOLDER
    }

    fn inventory_component(&self, skew_is_red: bool) -> Decimal {
        if skew_is_red {
            INVENTORY_RED
        } else {
            INVENTORY_GREEN
        }
    }

    fn history_component(&self, pair: &str) -> Decimal {
        let Some(results) = self.history.get(pair) else {
            return HISTORY_DEFAULT;
        };
        if results.len() < HISTORY_MIN_SAMPLES {
            return HISTORY_DEFAULT;
        }
        let wins = results.iter().filter(|&&r| r).count();
        Decimal::from(wins) / Decimal::from(results.len()) * Decimal::new(100, 0)
    }

    /// Weighted sum of the four components, clipped to `[0, 100]` and
    /// rounded to one decimal place.
    pub fn score(&self, pair: &str, spread_bps: Decimal, skew_is_red: bool) -> Decimal {
        let raw = self.spread_component(spread_bps) * self.weights.spread
            + self.liquidity_component() * self.weights.liquidity
            + self.inventory_component(skew_is_red) * self.weights.inventory
            + self.history_component(pair) * self.weights.history;
        raw.clamp(Decimal::ZERO, Decimal::new(100, 0)).round_dp(1)
    }

    /// `score * max(0, 1 - age/ttl * 0.5)`.
    pub fn apply_decay(score: Decimal, age: Duration, ttl: Duration) -> Decimal {
        if ttl.num_milliseconds() <= 0 {
            return Decimal::ZERO;
        }
        let age_ms = Decimal::from(age.num_milliseconds().max(0));
        let ttl_ms = Decimal::from(ttl.num_milliseconds());
        let decay_factor = Decimal::ONE - (age_ms / ttl_ms) * Decimal::new(5, 1);
        let factor = decay_factor.max(Decimal::ZERO);
        (score * factor).round_dp(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> Scorer {
        Scorer::new(ScoreWeights::default(), Decimal::from(10), Decimal::from(100))
    }

    #[test]
    fn spread_component_is_linear_between_thresholds() {
        let s = scorer();
        assert_eq!(s.spread_component(Decimal::from(10)), Decimal::ZERO);
        assert_eq!(s.spread_component(Decimal::from(100)), Decimal::new(100, 0));
        assert_eq!(s.spread_component(Decimal::from(55)), Decimal::from(50));
    }

    #[test]
    fn history_defaults_to_fifty_below_min_samples() {
        let mut s = scorer();
        assert_eq!(s.history_component("ETH/USDC"), Decimal::from(50));
        s.record_result("ETH/USDC", true);
        s.record_result("ETH/USDC", true);
        assert_eq!(s.history_component("ETH/USDC"), Decimal::from(50), "still below min samples");
        s.record_result("ETH/USDC", false);
        assert_eq!(s.history_component("ETH/USDC"), Decimal::from(100) * Decimal::from(2) / Decimal::from(3));
    }

    #[test]
    fn history_window_caps_at_twenty_results() {
        let mut s = scorer();
        for _ in 0..25 {
            s.record_result("ETH/USDC", true);
        }
        for _ in 0..5 {
            s.record_result("ETH/USDC", false);
        }
        // most recent 20 results are the 5 failures plus 15 successes
        assert_eq!(s.history_component("ETH/USDC"), Decimal::from(75));
    }

    #[test]
    fn decay_matches_spec_scenario() {
        let decayed = Scorer::apply_decay(Decimal::from(80), Duration::seconds(5), Duration::seconds(10));
        let diff = (decayed - Decimal::from(60)).abs();
        assert!(diff < Decimal::new(1, 1), "expected ~60.0, got {decayed}");
    }

    #[test]
    fn score_is_clamped_and_rounded() {
        let s = scorer();
        let score = s.score("ETH/USDC", Decimal::from(1000), false);
        assert!(score <= Decimal::new(100, 0));
        assert_eq!(score.round_dp(1), score, "already rounded to one decimal");
    }
}
