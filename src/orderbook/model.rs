use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderBookError {
    #[error("order book side {0} is empty")]
    EmptySide(&'static str),
    #[error("bids must be sorted descending by price")]
    BidsNotDescending,
    #[error("asks must be sorted ascending by price")]
    AsksNotAscending,
    #[error("best_ask ({best_ask}) must be greater than best_bid ({best_bid})")]
    CrossedBook { best_bid: Decimal, best_ask: Decimal },
}

/// A single price/quantity level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub qty: Decimal,
}

impl Level {
    pub fn new(price: Decimal, qty: Decimal) -> Self {
        Level { price, qty }
    }
}

/// (symbol, timestamp, bids desc, asks asc, best_bid, best_ask, mid, spread_bps).
///
/// Construction enforces: bids sorted descending, asks sorted ascending,
/// `best_ask > best_bid`, both sides non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireOrderBook", into = "WireOrderBook")]
pub struct NormalizedOrderBook {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Unvalidated wire shape; exchange/CEX adapters deserialize into this and
/// then go through `NormalizedOrderBook::new` so construction invariants
/// (sorted sides, non-crossed book) always hold for values in the type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireOrderBook {
    symbol: String,
    timestamp: DateTime<Utc>,
    bids: Vec<Level>,
    asks: Vec<Level>,
}

impl TryFrom<WireOrderBook> for NormalizedOrderBook {
    type Error = OrderBookError;

    fn try_from(raw: WireOrderBook) -> Result<Self, Self::Error> {
        NormalizedOrderBook::new(raw.symbol, raw.timestamp, raw.bids, raw.asks)
    }
}

impl From<NormalizedOrderBook> for WireOrderBook {
    fn from(book: NormalizedOrderBook) -> Self {
        WireOrderBook {
            symbol: book.symbol,
            timestamp: book.timestamp,
            bids: book.bids,
            asks: book.asks,
        }
    }
}

impl NormalizedOrderBook {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        bids: Vec<Level>,
        asks: Vec<Level>,
    ) -> Result<Self, OrderBookError> {
        if bids.is_empty() {
            return Err(OrderBookError::EmptySide("bids"));
        }
        if asks.is_empty() {
            return Err(OrderBookError::EmptySide("asks"));
        }
        if !bids.windows(2).all(|w| w[0].price >= w[1].price) {
            return Err(OrderBookError::BidsNotDescending);
        }
        if !asks.windows(2).all(|w| w[0].price <= w[1].price) {
            return Err(OrderBookError::AsksNotAscending);
        }
        let best_bid = bids[0].price;
        let best_ask = asks[0].price;
        if best_ask <= best_bid {
            return Err(OrderBookError::CrossedBook { best_bid, best_ask });
        }
        Ok(NormalizedOrderBook {
            symbol: symbol.into(),
            timestamp,
            bids,
            asks,
        })
    }

    pub fn best_bid(&self) -> Decimal {
        self.bids[0].price
    }

    pub fn best_ask(&self) -> Decimal {
        self.asks[0].price
    }

    pub fn mid(&self) -> Decimal {
        (self.best_bid() + self.best_ask()) / Decimal::TWO
    }

    /// `(ask - bid) / mid * 10_000`.
    pub fn spread_bps(&self) -> Decimal {
        let mid = self.mid();
        if mid.is_zero() {
            return Decimal::ZERO;
        }
        (self.best_ask() - self.best_bid()) / mid * Decimal::from(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> NormalizedOrderBook {
        NormalizedOrderBook::new(
            "ETH-USD",
            Utc::now(),
            vec![Level::new(Decimal::new(1999, 0), Decimal::ONE)],
            vec![Level::new(Decimal::new(2001, 0), Decimal::ONE)],
        )
        .unwrap()
    }

    #[test]
    fn computes_mid_and_spread() {
        let b = book();
        assert_eq!(b.mid(), Decimal::new(2000, 0));
        assert!(b.spread_bps() > Decimal::ZERO);
    }

    #[test]
    fn rejects_empty_sides() {
        assert_eq!(
            NormalizedOrderBook::new("X", Utc::now(), vec![], vec![]),
            Err(OrderBookError::EmptySide("bids"))
        );
    }

    #[test]
    fn rejects_crossed_book() {
        let err = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![Level::new(Decimal::new(2100, 0), Decimal::ONE)],
            vec![Level::new(Decimal::new(2000, 0), Decimal::ONE)],
        )
        .unwrap_err();
        assert!(matches!(err, OrderBookError::CrossedBook { .. }));
    }

    #[test]
    fn rejects_non_monotonic_bids() {
        let err = NormalizedOrderBook::new(
            "X",
            Utc::now(),
            vec![
                Level::new(Decimal::new(1900, 0), Decimal::ONE),
                Level::new(Decimal::new(1950, 0), Decimal::ONE),
            ],
            vec![Level::new(Decimal::new(2000, 0), Decimal::ONE)],
        )
        .unwrap_err();
        assert_eq!(err, OrderBookError::BidsNotDescending);
    }
}
