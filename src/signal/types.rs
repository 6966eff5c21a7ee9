use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::amm::Route;
use crate::money::{Address, Token};

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("size must be positive, got {0}")]
    NonPositiveSize(Decimal),
    #[error("expiry ({expiry}) must be after timestamp ({timestamp})")]
    ExpiryNotAfterTimestamp {
        timestamp: DateTime<Utc>,
        expiry: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    BuyCexSellDex,
    BuyDexSellCex,
}

/// A tradable (CEX symbol, DEX token pair), plus the venue names the
/// Inventory Tracker keys balances under for each leg.
#[derive(Debug, Clone)]
pub struct Market {
    pub symbol: String,
    pub base: Token,
    pub quote: Token,
    pub cex_venue: String,
    pub wallet_venue: String,
}

/// `expected_net = expected_gross - expected_fees`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Economics {
    pub gross: Decimal,
    pub fees: Decimal,
    pub net: Decimal,
}

impl Economics {
    pub fn new(gross: Decimal, fees: Decimal) -> Self {
        Economics {
            gross,
            fees,
            net: gross - fees,
        }
    }
}

/// Immutable except for `score`. Created by the Signal Generator, referenced
/// by the Executor, discarded after terminal state.
#[derive(Debug, Clone)]
pub struct Signal {
    pub id: String,
    pub pair_symbol: String,
    pub route: Route,
    pub direction: Direction,
    pub cex_price: Decimal,
    pub dex_price: Decimal,
    pub spread_bps: Decimal,
    pub size: Decimal,
    pub expected: Economics,
    pub score: Decimal,
    pub timestamp: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub inventory_ok: bool,
    pub within_limits: bool,
}

impl Signal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        pair_symbol: impl Into<String>,
        route: Route,
        direction: Direction,
        cex_price: Decimal,
        dex_price: Decimal,
        spread_bps: Decimal,
        size: Decimal,
        expected: Economics,
        timestamp: DateTime<Utc>,
        expiry: DateTime<Utc>,
        inventory_ok: bool,
        within_limits: bool,
    ) -> Result<Self, SignalError> {
        if size <= Decimal::ZERO {
            return Err(SignalError::NonPositiveSize(size));
        }
        if expiry <= timestamp {
            return Err(SignalError::ExpiryNotAfterTimestamp { timestamp, expiry });
        }
        Ok(Signal {
            id: id.into(),
            pair_symbol: pair_symbol.into(),
            route,
            direction,
            cex_price,
            dex_price,
            spread_bps,
            size,
            expected,
            score: Decimal::ZERO,
            timestamp,
            expiry,
            inventory_ok,
            within_limits,
        })
    }

    /// Unexpired, inventory-cleared, within limits, positive expected net,
    /// positive score.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
            && self.inventory_ok
            && self.within_limits
            && self.expected.net > Decimal::ZERO
            && self.score > Decimal::ZERO
    }

    pub fn sender_hint(&self) -> Option<Address> {
        self.route.path.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn route() -> Route {
        Route {
            pools: vec!["0x1000000000000000000000000000000000000a".parse().unwrap()],
            path: vec![
                "0x1000000000000000000000000000000000000b".parse().unwrap(),
                "0x1000000000000000000000000000000000000c".parse().unwrap(),
            ],
        }
    }

    #[test]
    fn rejects_non_positive_size() {
        let now = Utc::now();
        let err = Signal::new(
            "id",
            "ETH/USDC",
            route(),
            Direction::BuyCexSellDex,
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ZERO,
            Decimal::ZERO,
            Economics::new(Decimal::ONE, Decimal::ZERO),
            now,
            now + Duration::seconds(10),
            true,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, SignalError::NonPositiveSize(_)));
    }

    #[test]
    fn expected_net_is_gross_minus_fees() {
        let e = Economics::new(Decimal::from(100), Decimal::from(30));
        assert_eq!(e.net, Decimal::from(70));
    }

    #[test]
    fn is_valid_requires_all_conditions() {
        let now = Utc::now();
        let mut signal = Signal::new(
            "id",
            "ETH/USDC",
            route(),
            Direction::BuyCexSellDex,
            Decimal::from(2000),
            Decimal::from(2010),
            Decimal::from(50),
            Decimal::ONE,
            Economics::new(Decimal::from(10), Decimal::from(1)),
            now,
            now + Duration::seconds(10),
            true,
            true,
        )
        .unwrap();
        signal.score = Decimal::from(10);
        assert!(signal.is_valid(now));
        assert!(!signal.is_valid(now + Duration::seconds(20)), "expired");

        signal.inventory_ok = false;
        assert!(!signal.is_valid(now));
    }
}
