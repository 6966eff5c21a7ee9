use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::Signal;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("bad data: {0}")]
    BadData(String),
    #[error("risk veto: {0}")]
    RiskVeto(String),
    #[error("safety veto (fatal): {0}")]
    SafetyVeto(String),
}

impl GateError {
    /// Safety vetoes are fatal to the orchestrator loop (spec.md §4.7/§7);
    /// everything else just rejects the one signal.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GateError::SafetyVeto(_))
    }
}

const MAX_SPREAD_BPS: Decimal = Decimal::new(500, 0);
const MAX_SIGNAL_AGE_SECONDS: i64 = 5;

/// Prices > 0, spread within sane bounds, signal not stale, size positive.
#[derive(Debug, Default)]
pub struct PretradeValidator;

impl PretradeValidator {
    pub fn check(&self, signal: &Signal, now: DateTime<Utc>) -> Result<(), GateError> {
        if signal.cex_price <= Decimal::ZERO || signal.dex_price <= Decimal::ZERO {
            return Err(GateError::BadData("non-positive price".to_string()));
        }
        if signal.spread_bps.abs() > MAX_SPREAD_BPS {
            return Err(GateError::BadData(format!("spread {} bps exceeds sanity bound", signal.spread_bps)));
        }
        let age = now - signal.timestamp;
        if age > Duration::seconds(MAX_SIGNAL_AGE_SECONDS) {
            return Err(GateError::BadData(format!("signal age {}s exceeds {}s", age.num_seconds(), MAX_SIGNAL_AGE_SECONDS)));
        }
        if signal.size <= Decimal::ZERO {
            return Err(GateError::BadData("non-positive size".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub per_trade_usd_cap: Decimal,
    pub per_trade_pct_of_capital_cap: Decimal,
    pub daily_loss_cap: Decimal,
    pub drawdown_cap_pct: Decimal,
    pub consecutive_loss_cap: u32,
    pub trades_per_hour_cap: u32,
}

/// Mutable risk-tracking state; one instance shared across ticks.
#[derive(Debug, Default)]
pub struct RiskState {
    pub daily_loss: Decimal,
    pub peak_capital: Decimal,
    pub current_capital: Decimal,
    pub consecutive_losses: u32,
    recent_trade_times: VecDeque<DateTime<Utc>>,
}

impl RiskState {
    pub fn record_trade_attempt(&mut self, at: DateTime<Utc>) {
        self.recent_trade_times.push_back(at);
        self.prune(at);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(&front) = self.recent_trade_times.front() {
            if now - front > Duration::hours(1) {
                self.recent_trade_times.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn trades_in_last_hour(&mut self, now: DateTime<Utc>) -> u32 {
        self.prune(now);
        self.recent_trade_times.len() as u32
    }

    pub fn drawdown_pct(&self) -> Decimal {
        if self.peak_capital <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.peak_capital - self.current_capital) / self.peak_capital * Decimal::new(100, 0)
    }
}

/// Per-trade USD cap, per-trade pct-of-capital cap, daily loss cap, drawdown
/// cap, consecutive-loss cap, trades-per-hour cap.
pub struct RiskManager {
    limits: RiskLimits,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        RiskManager { limits }
    }

    pub fn check(&self, trade_usd: Decimal, state: &mut RiskState, now: DateTime<Utc>) -> Result<(), GateError> {
        if trade_usd > self.limits.per_trade_usd_cap {
            return Err(GateError::RiskVeto(format!("trade ${trade_usd} exceeds per-trade cap ${}", self.limits.per_trade_usd_cap)));
        }
        if state.current_capital > Decimal::ZERO {
            let pct = trade_usd / state.current_capital * Decimal::new(100, 0);
            if pct > self.limits.per_trade_pct_of_capital_cap {
                return Err(GateError::RiskVeto(format!(
                    "trade is {pct}% of capital, exceeds cap {}%",
                    self.limits.per_trade_pct_of_capital_cap
                )));
            }
        }
        if state.daily_loss < -self.limits.daily_loss_cap {
            return Err(GateError::RiskVeto(format!("daily loss ${} exceeds cap ${}", state.daily_loss, self.limits.daily_loss_cap)));
        }
        if state.drawdown_pct() > self.limits.drawdown_cap_pct {
            return Err(GateError::RiskVeto(format!("drawdown {}% exceeds cap {}%", state.drawdown_pct(), self.limits.drawdown_cap_pct)));
        }
        if state.consecutive_losses >= self.limits.consecutive_loss_cap {
            return Err(GateError::RiskVeto(format!(
                "{} consecutive losses meets cap {}",
                state.consecutive_losses, self.limits.consecutive_loss_cap
            )));
        }
        if state.trades_in_last_hour(now) >= self.limits.trades_per_hour_cap {
            return Err(GateError::RiskVeto(format!("trades/hour cap {} reached", self.limits.trades_per_hour_cap)));
        }
        Ok(())
    }
}

/// Hard floors the operator cannot raise (spec.md §4.7). A failure here is
/// fatal to the orchestrator loop.
#[derive(Debug, Default)]
pub struct SafetyCheck;

impl SafetyCheck {
    const MAX_TRADE_USD: Decimal = Decimal::new(25, 0);
    const MIN_DAILY_LOSS: Decimal = Decimal::new(-20, 0);
    const MIN_CAPITAL: Decimal = Decimal::new(50, 0);
    const MAX_TRADES_PER_HOUR: u32 = 30;

    pub fn check(&self, trade_usd: Decimal, state: &RiskState, trades_last_hour: u32) -> Result<(), GateError> {
        if trade_usd > Self::MAX_TRADE_USD {
            return Err(GateError::SafetyVeto(format!("trade ${trade_usd} exceeds absolute floor ${}", Self::MAX_TRADE_USD)));
        }
        if state.daily_loss < Self::MIN_DAILY_LOSS {
            return Err(GateError::SafetyVeto(format!("daily loss ${} breaches floor ${}", state.daily_loss, Self::MIN_DAILY_LOSS)));
        }
        if state.current_capital < Self::MIN_CAPITAL {
            return Err(GateError::SafetyVeto(format!("capital ${} below floor ${}", state.current_capital, Self::MIN_CAPITAL)));
        }
        if trades_last_hour > Self::MAX_TRADES_PER_HOUR {
            return Err(GateError::SafetyVeto(format!("trades/hour {trades_last_hour} breaches floor {}", Self::MAX_TRADES_PER_HOUR)));
        }
        Ok(())
    }
}

/// Runs Pre-trade, Risk, then Safety in order, short-circuiting on the first
/// rejection (spec.md §4.7 "layered admission control").
pub fn run_gates(
    validator: &PretradeValidator,
    risk: &RiskManager,
    safety: &SafetyCheck,
    signal: &Signal,
    trade_usd: Decimal,
    state: &mut RiskState,
    now: DateTime<Utc>,
) -> Result<(), GateError> {
    validator.check(signal, now)?;
    risk.check(trade_usd, state, now)?;
    let trades_last_hour = state.trades_in_last_hour(now);
    safety.check(trade_usd, state, trades_last_hour)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::Route;
    use crate::signal::types::{Direction, Economics};

    fn signal(cex_price: Decimal, spread_bps: Decimal, age: Duration) -> Signal {
        let now = Utc::now();
        Signal::new(
            "id",
            "ETH/USDC",
            Route {
                pools: vec!["0x1000000000000000000000000000000000000a".parse().unwrap()],
                path: vec![
                    "0x1000000000000000000000000000000000000b".parse().unwrap(),
                    "0x1000000000000000000000000000000000000c".parse().unwrap(),
                ],
            },
            Direction::BuyCexSellDex,
            cex_price,
            cex_price,
            spread_bps,
            Decimal::ONE,
            Economics::new(Decimal::from(10), Decimal::from(1)),
            now - age,
            now - age + Duration::seconds(30),
            true,
            true,
        )
        .unwrap()
    }

    #[test]
    fn pretrade_rejects_stale_signal() {
        let validator = PretradeValidator;
        let s = signal(Decimal::from(2000), Decimal::from(50), Duration::seconds(10));
        let err = validator.check(&s, Utc::now()).unwrap_err();
        assert!(matches!(err, GateError::BadData(_)));
    }

    #[test]
    fn pretrade_rejects_excessive_spread() {
        let validator = PretradeValidator;
        let s = signal(Decimal::from(2000), Decimal::from(600), Duration::seconds(0));
        assert!(validator.check(&s, Utc::now()).is_err());
    }

    #[test]
    fn pretrade_passes_clean_signal() {
        let validator = PretradeValidator;
        let s = signal(Decimal::from(2000), Decimal::from(50), Duration::seconds(1));
        assert!(validator.check(&s, Utc::now()).is_ok());
    }

    #[test]
    fn safety_veto_is_fatal() {
        let safety = SafetyCheck;
        let state = RiskState {
            current_capital: Decimal::from(1000),
            ..Default::default()
        };
        let err = safety.check(Decimal::from(26), &state, 0).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn risk_veto_is_not_fatal() {
        let limits = RiskLimits {
            per_trade_usd_cap: Decimal::from(10),
            per_trade_pct_of_capital_cap: Decimal::from(100),
            daily_loss_cap: Decimal::from(1000),
            drawdown_cap_pct: Decimal::from(100),
            consecutive_loss_cap: 100,
            trades_per_hour_cap: 100,
        };
        let risk = RiskManager::new(limits);
        let mut state = RiskState {
            current_capital: Decimal::from(1000),
            ..Default::default()
        };
        let err = risk.check(Decimal::from(20), &mut state, Utc::now()).unwrap_err();
        assert!(!err.is_fatal());
    }
}
