use std::collections::HashMap;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("insufficient buy-side balance")]
    InsufficientBuyBalance,
    #[error("insufficient sell-side balance")]
    InsufficientSellBalance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub free: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct ExecutionVerdict {
    pub ok: bool,
    pub reason: Option<InventoryError>,
}

impl ExecutionVerdict {
    fn pass() -> Self {
        ExecutionVerdict { ok: true, reason: None }
    }

    fn fail(reason: InventoryError) -> Self {
        ExecutionVerdict { ok: false, reason: Some(reason) }
    }
}

#[derive(Debug, Clone)]
pub struct SkewReport {
    pub per_venue_pct: HashMap<String, Decimal>,
    pub max_deviation_pct: Decimal,
    pub needs_rebalance: bool,
}

const REBALANCE_THRESHOLD_PCT: Decimal = Decimal::new(30, 0);

#[derive(Debug, Clone)]
pub struct RebalancePlan {
    pub asset: String,
    pub from_venue: String,
    pub to_venue: String,
    pub amount: Decimal,
    pub net_amount: Decimal,
}

/// Exclusively owns per-venue balances; mutated only by the orchestrator
/// (on CEX/wallet snapshot refresh) and the Executor (on trade fill), per
/// spec.md §5 "Shared resources".
#[derive(Debug, Default)]
pub struct InventoryTracker {
    balances: HashMap<String, HashMap<String, Balance>>,
}

impl InventoryTracker {
    pub fn new() -> Self {
        InventoryTracker { balances: HashMap::new() }
    }

    pub fn update_from_cex(&mut self, venue: &str, snapshot: HashMap<String, Balance>) {
        self.balances.insert(venue.to_string(), snapshot);
    }

    pub fn update_from_wallet(&mut self, venue: &str, snapshot: HashMap<String, Decimal>) {
        let converted = snapshot
            .into_iter()
            .map(|(asset, amount)| (asset, Balance { free: amount, locked: Decimal::ZERO }))
            .collect();
        self.balances.insert(venue.to_string(), converted);
    }

    pub fn get_available(&self, venue: &str, asset: &str) -> Decimal {
        self.balances
            .get(venue)
            .and_then(|assets| assets.get(asset))
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn can_execute(
        &self,
        buy_venue: &str,
        buy_asset: &str,
        buy_amount: Decimal,
        sell_venue: &str,
        sell_asset: &str,
        sell_amount: Decimal,
    ) -> ExecutionVerdict {
        if self.get_available(buy_venue, buy_asset) < buy_amount {
            return ExecutionVerdict::fail(InventoryError::InsufficientBuyBalance);
        }
        if self.get_available(sell_venue, sell_asset) < sell_amount {
            return ExecutionVerdict::fail(InventoryError::InsufficientSellBalance);
        }
        ExecutionVerdict::pass()
    }

    fn entry(&mut self, venue: &str, asset: &str) -> &mut Balance {
        self.balances.entry(venue.to_string()).or_default().entry(asset.to_string()).or_default()
    }

    /// Applies a fill's deltas in-place. `Buy` spends `quote_amount` of
    /// `quote` and receives `base_amount` of `base`; `Sell` is the mirror.
    /// The fee is deducted from `fee_asset`'s free balance at the same venue.
    #[allow(clippy::too_many_arguments)]
    pub fn record_trade(
        &mut self,
        venue: &str,
        side: TradeSide,
        base: &str,
        quote: &str,
        base_amount: Decimal,
        quote_amount: Decimal,
        fee: Decimal,
        fee_asset: &str,
    ) {
        match side {
            TradeSide::Buy => {
                self.entry(venue, quote).free -= quote_amount;
                self.entry(venue, base).free += base_amount;
            }
            TradeSide::Sell => {
                self.entry(venue, base).free -= base_amount;
                self.entry(venue, quote).free += quote_amount;
            }
        }
        self.entry(venue, fee_asset).free -= fee;
    }

    /// Per-venue share of `asset`'s total and maximum deviation from an even
    /// split across the venues currently holding it.
    pub fn skew(&self, asset: &str) -> SkewReport {
        let mut totals: HashMap<String, Decimal> = HashMap::new();
        let mut total = Decimal::ZERO;
        for (venue, assets) in &self.balances {
            if let Some(bal) = assets.get(asset) {
                let t = bal.total();
                if t != Decimal::ZERO {
                    totals.insert(venue.clone(), t);
                    total += t;
                }
            }
        }
        let n = totals.len();
        if n == 0 || total <= Decimal::ZERO {
            return SkewReport {
                per_venue_pct: HashMap::new(),
                max_deviation_pct: Decimal::ZERO,
                needs_rebalance: false,
            };
        }
        let even_split = Decimal::new(100, 0) / Decimal::from(n);
        let mut per_venue_pct = HashMap::new();
        let mut max_deviation = Decimal::ZERO;
        for (venue, amount) in &totals {
            let pct = amount / total * Decimal::new(100, 0);
            let deviation = (pct - even_split).abs();
            if deviation > max_deviation {
                max_deviation = deviation;
            }
            per_venue_pct.insert(venue.clone(), pct);
        }
        SkewReport {
            per_venue_pct,
            max_deviation_pct: max_deviation,
            needs_rebalance: max_deviation >= REBALANCE_THRESHOLD_PCT,
        }
    }

    /// Moves enough of `asset` from the most over-weight venue to the most
    /// under-weight venue to reach an even split, per spec.md §8's rebalance
    /// planner scenario. `None` if no rebalance is needed.
    pub fn rebalance_plan(&self, asset: &str, withdrawal_fee: Decimal) -> Option<RebalancePlan> {
        let report = self.skew(asset);
        if !report.needs_rebalance {
            return None;
        }
        let mut totals: Vec<(String, Decimal)> = self
            .balances
            .iter()
            .filter_map(|(venue, assets)| assets.get(asset).map(|b| (venue.clone(), b.total())))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        let (from_venue, from_amount) = totals.first()?.clone();
        let (to_venue, _) = totals.last()?.clone();
        let total: Decimal = totals.iter().map(|(_, v)| *v).sum();
        let target = total / Decimal::from(totals.len());
        let amount = from_amount - target;
        Some(RebalancePlan {
            asset: asset.to_string(),
            from_venue,
            to_venue,
            amount,
            net_amount: amount - withdrawal_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_available_is_zero_when_absent() {
        let tracker = InventoryTracker::new();
        assert_eq!(tracker.get_available("binance", "USDC"), Decimal::ZERO);
    }

    #[test]
    fn can_execute_flags_insufficient_buy_balance() {
        let mut tracker = InventoryTracker::new();
        tracker.update_from_cex("binance", HashMap::from([("USDC".to_string(), Balance { free: Decimal::from(10), locked: Decimal::ZERO })]));
        tracker.update_from_wallet("wallet", HashMap::from([("WETH".to_string(), Decimal::from(5))]));
        let verdict = tracker.can_execute("binance", "USDC", Decimal::from(100), "wallet", "WETH", Decimal::from(1));
        assert!(!verdict.ok);
        assert_eq!(verdict.reason, Some(InventoryError::InsufficientBuyBalance));
    }

    #[test]
    fn record_trade_then_inverse_restores_balances_exactly() {
        let mut tracker = InventoryTracker::new();
        tracker.update_from_cex(
            "binance",
            HashMap::from([
                ("USDC".to_string(), Balance { free: Decimal::from(10_000), locked: Decimal::ZERO }),
                ("WETH".to_string(), Balance { free: Decimal::from(5), locked: Decimal::ZERO }),
            ]),
        );
        let before = tracker.get_available("binance", "USDC");
        let before_base = tracker.get_available("binance", "WETH");

        tracker.record_trade("binance", TradeSide::Buy, "WETH", "USDC", Decimal::from(1), Decimal::from(2000), Decimal::ZERO, "USDC");
        tracker.record_trade("binance", TradeSide::Sell, "WETH", "USDC", Decimal::from(1), Decimal::from(2000), Decimal::ZERO, "USDC");

        assert_eq!(tracker.get_available("binance", "USDC"), before);
        assert_eq!(tracker.get_available("binance", "WETH"), before_base);
    }

    #[test]
    fn rebalance_planner_matches_spec_scenario() {
        let mut tracker = InventoryTracker::new();
        tracker.update_from_cex("binance", HashMap::from([("ETH".to_string(), Balance { free: Decimal::from(2), locked: Decimal::ZERO })]));
        tracker.update_from_wallet("wallet", HashMap::from([("ETH".to_string(), Decimal::from(8))]));

        let report = tracker.skew("ETH");
        assert!(report.needs_rebalance);
        assert_eq!(report.max_deviation_pct, Decimal::from(30));

        let plan = tracker.rebalance_plan("ETH", Decimal::new(5, 2)).unwrap();
        assert_eq!(plan.from_venue, "wallet");
        assert_eq!(plan.to_venue, "binance");
        assert_eq!(plan.amount, Decimal::from(3));
        assert_eq!(plan.net_amount, Decimal::from(3) - Decimal::new(5, 2));
    }

    #[test]
    fn skew_reports_no_rebalance_when_even() {
        let mut tracker = InventoryTracker::new();
        tracker.update_from_cex("binance", HashMap::from([("ETH".to_string(), Balance { free: Decimal::from(5), locked: Decimal::ZERO })]));
        tracker.update_from_wallet("wallet", HashMap::from([("ETH".to_string(), Decimal::from(5))]));
        let report = tracker.skew("ETH");
        assert!(!report.needs_rebalance);
    }
}
