use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One realized arbitrage round-trip. Fields mirror the PnL CSV header
/// exactly (spec.md §6 "Persisted artifacts"); the derived properties are
/// computed on read rather than stored, so there is only ever one source of
/// truth for a given record.
#[derive(Debug, Clone)]
pub struct ArbRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub amount: Decimal,
    pub fee_buy: Decimal,
    pub fee_sell: Decimal,
    pub gas_cost: Decimal,
}

impl ArbRecord {
    /// `sell_notional - buy_notional`.
    pub fn gross_pnl(&self) -> Decimal {
        (self.sell_price - self.buy_price) * self.amount
    }

    /// `fee_buy + fee_sell + gas_cost`.
    pub fn total_fees(&self) -> Decimal {
        self.fee_buy + self.fee_sell + self.gas_cost
    }

    /// `gross_pnl - total_fees`.
    pub fn net_pnl(&self) -> Decimal {
        self.gross_pnl() - self.total_fees()
    }

    /// `net_pnl / buy_notional * 10_000`; 0 if the buy notional is 0.
    pub fn net_pnl_bps(&self) -> Decimal {
        let notional = self.buy_price * self.amount;
        if notional.is_zero() {
            Decimal::ZERO
        } else {
            self.net_pnl() / notional * Decimal::new(10_000, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArbRecord {
        ArbRecord {
            id: "sig-1".to_string(),
            timestamp: Utc::now(),
            symbol: "ETH/USDC".to_string(),
            buy_venue: "binance".to_string(),
            sell_venue: "wallet".to_string(),
            buy_price: Decimal::from(2000),
            sell_price: Decimal::from(2010),
            amount: Decimal::ONE,
            fee_buy: Decimal::new(8, 1),
            fee_sell: Decimal::new(8, 1),
            gas_cost: Decimal::new(5, 1),
        }
    }

    #[test]
    fn derived_properties_match_spec_formulas() {
        let r = record();
        assert_eq!(r.gross_pnl(), Decimal::from(10));
        assert_eq!(r.total_fees(), Decimal::new(21, 1));
        assert_eq!(r.net_pnl(), Decimal::from(10) - Decimal::new(21, 1));
        let expected_bps = r.net_pnl() / (r.buy_price * r.amount) * Decimal::new(10_000, 0);
        assert_eq!(r.net_pnl_bps(), expected_bps);
    }

    #[test]
    fn net_pnl_bps_is_zero_for_zero_notional() {
        let mut r = record();
        r.buy_price = Decimal::ZERO;
        assert_eq!(r.net_pnl_bps(), Decimal::ZERO);
    }
}
