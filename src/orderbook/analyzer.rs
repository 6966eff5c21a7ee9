use rust_decimal::Decimal;
use thiserror::Error;

use super::model::{Level, NormalizedOrderBook};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("side must be \"buy\" or \"sell\", got {0:?}")]
    UnknownSide(String),
    #[error("quantity must be positive")]
    NonPositiveQty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkResult {
    pub avg_price: Decimal,
    pub total_cost: Decimal,
    pub slippage_bps: Decimal,
    pub levels_consumed: usize,
    pub fully_filled: bool,
    pub fills: Vec<Fill>,
}

/// Constructed from a normalized order book; analyzer operations assume the
/// book's own construction invariants (non-empty sides, sorted levels).
pub struct OrderBookAnalyzer<'a> {
    book: &'a NormalizedOrderBook,
}

impl<'a> OrderBookAnalyzer<'a> {
    pub fn new(book: &'a NormalizedOrderBook) -> Self {
        OrderBookAnalyzer { book }
    }

    fn side_levels(&self, side: &str) -> Result<&[Level], AnalyzerError> {
        match side {
            "buy" => Ok(&self.book.asks),
            "sell" => Ok(&self.book.bids),
            other => Err(AnalyzerError::UnknownSide(other.to_string())),
        }
    }

    fn best_price(&self, side: &str) -> Result<Decimal, AnalyzerError> {
        Ok(match side {
            "buy" => self.book.best_ask(),
            "sell" => self.book.best_bid(),
            other => return Err(AnalyzerError::UnknownSide(other.to_string())),
        })
    }

    /// "buy" walks asks ascending; "sell" walks bids descending. Takes
    /// `min(remaining, level_qty)` per level until `qty` is filled or the
    /// side is exhausted.
    pub fn walk_the_book(&self, side: &str, qty: Decimal) -> Result<WalkResult, AnalyzerError> {
        if qty <= Decimal::ZERO {
            return Err(AnalyzerError::NonPositiveQty);
        }
        let levels = self.side_levels(side)?;
        let best = self.best_price(side)?;

        let mut remaining = qty;
        let mut total_cost = Decimal::ZERO;
        let mut total_qty = Decimal::ZERO;
        let mut fills = Vec::new();

        for level in levels {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(level.qty);
            total_cost += take * level.price;
            total_qty += take;
            remaining -= take;
            fills.push(Fill {
                price: level.price,
                qty: take,
            });
        }

        let fully_filled = remaining <= Decimal::ZERO;
        let avg_price = if total_qty.is_zero() {
            Decimal::ZERO
        } else {
            total_cost / total_qty
        };
        let slippage_bps = if best.is_zero() {
            Decimal::ZERO
        } else {
            (avg_price - best).abs() / best * Decimal::from(10_000)
        };

        Ok(WalkResult {
            avg_price,
            total_cost,
            slippage_bps,
            levels_consumed: fills.len(),
            fully_filled,
            fills,
        })
    }

    /// Sum of sizes within a multiplicative band of the best price: for
    /// "buy" prices up to `best * (1 + bps/10_000)`; for "sell" prices down
    /// to `best * (1 - bps/10_000)`.
    pub fn depth_at_bps(&self, side: &str, bps: Decimal) -> Result<Decimal, AnalyzerError> {
        let levels = self.side_levels(side)?;
        let best = self.best_price(side)?;
        let band = bps / Decimal::from(10_000);
        let bound = match side {
            "buy" => best * (Decimal::ONE + band),
            "sell" => best * (Decimal::ONE - band),
            other => return Err(AnalyzerError::UnknownSide(other.to_string())),
        };
        let sum = levels
            .iter()
            .filter(|l| match side {
                "buy" => l.price <= bound,
                _ => l.price >= bound,
            })
            .fold(Decimal::ZERO, |acc, l| acc + l.qty);
        Ok(sum)
    }

    /// `(sum_bid_qty - sum_ask_qty) / (sum_bid_qty + sum_ask_qty)` over the
    /// top `n` levels of each side; 0 if the denominator is 0.
    pub fn imbalance(&self, n: usize) -> Decimal {
        let sum_bids: Decimal = self.book.bids.iter().take(n).map(|l| l.qty).sum();
        let sum_asks: Decimal = self.book.asks.iter().take(n).map(|l| l.qty).sum();
        let denom = sum_bids + sum_asks;
        if denom.is_zero() {
            Decimal::ZERO
        } else {
            (sum_bids - sum_asks) / denom
        }
    }

    /// Relative gap between round-trip average execution prices (buy then
    /// sell `qty`), expressed in bps of the mid.
    pub fn effective_spread(&self, qty: Decimal) -> Result<Decimal, AnalyzerError> {
        let buy = self.walk_the_book("buy", qty)?;
        let sell = self.walk_the_book("sell", qty)?;
        let mid = self.book.mid();
        if mid.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok((buy.avg_price - sell.avg_price) / mid * Decimal::from(10_000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book() -> NormalizedOrderBook {
        NormalizedOrderBook::new(
            "ETH-USD",
            Utc::now(),
            vec![
                Level::new(Decimal::new(2000, 0), Decimal::new(3, 0)),
                Level::new(Decimal::new(1995, 0), Decimal::new(5, 0)),
            ],
            vec![
                Level::new(Decimal::new(2001, 0), Decimal::ONE),
                Level::new(Decimal::new(2002, 0), Decimal::new(2, 0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn walk_the_book_exact_two_levels() {
        // Concrete scenario: asks [(2001,1),(2002,2)]; buying 2 consumes two
        // levels, avg = (2001*1 + 2002*1)/2 = 2001.5.
        let b = book();
        let analyzer = OrderBookAnalyzer::new(&b);
        let result = analyzer.walk_the_book("buy", Decimal::new(2, 0)).unwrap();
        assert_eq!(result.avg_price, Decimal::new(20015, 1));
        assert_eq!(result.levels_consumed, 2);
        assert!(result.fully_filled);
    }

    #[test]
    fn walk_the_book_fill_sizes_sum_to_min_of_qty_and_liquidity() {
        let b = book();
        let analyzer = OrderBookAnalyzer::new(&b);
        let total_ask_liquidity = Decimal::new(3, 0);
        let result = analyzer.walk_the_book("buy", Decimal::new(10, 0)).unwrap();
        let filled: Decimal = result.fills.iter().map(|f| f.qty).sum();
        assert_eq!(filled, total_ask_liquidity);
        assert!(!result.fully_filled);
    }

    #[test]
    fn imbalance_zero_when_sides_balanced() {
        let b = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![Level::new(Decimal::new(100, 0), Decimal::new(5, 0))],
            vec![Level::new(Decimal::new(101, 0), Decimal::new(5, 0))],
        )
        .unwrap();
        let analyzer = OrderBookAnalyzer::new(&b);
        assert_eq!(analyzer.imbalance(1), Decimal::ZERO);
    }

    #[test]
    fn depth_at_bps_includes_only_levels_within_band() {
        let b = book();
        let analyzer = OrderBookAnalyzer::new(&b);
        // best ask 2001; 10 bps band -> bound = 2001 * 1.001 = 2003.001, includes both levels.
        let depth = analyzer.depth_at_bps("buy", Decimal::new(10, 0)).unwrap();
        assert_eq!(depth, Decimal::new(3, 0));
    }

    #[test]
    fn rejects_unknown_side() {
        let b = book();
        let analyzer = OrderBookAnalyzer::new(&b);
        assert!(analyzer.walk_the_book("sideways", Decimal::ONE).is_err());
    }
}
