use chrono::{DateTime, Duration, Utc};
use num_bigint::BigUint;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::chain::exchange::{ExchangeClient, ExchangeClientError, OrderSide, OrderStatus};
use crate::inventory::{InventoryTracker, TradeSide};
use crate::money::{Address, MoneyError};
use crate::pricing::{PricingEngine, PricingError};
use crate::signal::types::{Direction, Market, Signal};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::replay::ReplayGuard;

/// Fees approximated as `size · leg1_price · 0.004` (two-side taker + swap),
/// per spec.md §4.8.
const FEE_RATE: Decimal = Decimal::new(4, 3);

/// CEX limit-IOC orders are placed at `cex_price · 1.001`, per spec.md §4.8.
const CEX_LIMIT_PRICE_BUFFER: Decimal = Decimal::new(1001, 3);

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("CEX order did not fill")]
    CexNotFilled,
    #[error("partial fill {0} below threshold")]
    PartialFill(Decimal),
    #[error("DEX simulation did not produce a valid quote")]
    DexSimulationFailed,
    #[error("leg timed out")]
    Timeout,
    #[error("CEX adapter error: {0}")]
    Exchange(#[from] ExchangeClientError),
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),
    #[error("decimal/raw conversion error: {0}")]
    Money(#[from] MoneyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingPolicy {
    DexFirst,
    CexFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegKind {
    Cex,
    Dex,
}

impl OrderingPolicy {
    fn leg1(self) -> LegKind {
        match self {
            OrderingPolicy::DexFirst => LegKind::Dex,
            OrderingPolicy::CexFirst => LegKind::Cex,
        }
    }

    fn leg2(self) -> LegKind {
        match self.leg1() {
            LegKind::Cex => LegKind::Dex,
            LegKind::Dex => LegKind::Cex,
        }
    }
}

fn cex_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::BuyCexSellDex => OrderSide::Buy,
        Direction::BuyDexSellCex => OrderSide::Sell,
    }
}

/// A single filled leg: which venue, at what price/size, and the
/// order id (CEX) or a quote-derived identifier (DEX).
#[derive(Debug, Clone)]
pub struct LegFill {
    pub venue: String,
    pub price: Decimal,
    pub size: Decimal,
    pub identifier: String,
}

/// A tagged variant per Executor state, each carrying exactly the data that
/// state has in hand, per spec.md §9 "State machine encoding".
#[derive(Debug, Clone)]
pub enum ExecutorState {
    Idle,
    Validating,
    Leg1Pending,
    Leg1Filled(LegFill),
    Leg2Pending(LegFill),
    Unwinding { leg1: LegFill, reason: String },
    Done { leg1: LegFill, leg2: LegFill, pnl: Decimal },
    Failed { error: String },
}

/// Evolving record tied 1:1 to a Signal; only the Executor mutates it.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub signal_id: String,
    pub state: ExecutorState,
    pub leg1_venue: Option<String>,
    pub leg2_venue: Option<String>,
    pub actual_net_pnl: Option<Decimal>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ExecutionContext {
    fn new(signal_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        ExecutionContext {
            signal_id: signal_id.into(),
            state: ExecutorState::Idle,
            leg1_venue: None,
            leg2_venue: None,
            actual_net_pnl: None,
            started_at,
            finished_at: None,
            error: None,
        }
    }

    fn fail(mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        let reason = reason.into();
        self.state = ExecutorState::Failed { error: reason.clone() };
        self.error = Some(reason);
        self.finished_at = Some(now);
        self
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ExecutorState::Done { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub ordering: OrderingPolicy,
    pub leg_timeout: Duration,
    pub min_fill_ratio: Decimal,
    pub gas_price_gwei: u64,
}

/// Sequences a CEX leg and a DEX leg per spec.md §4.8, gated by the circuit
/// breaker and replay protection of §4.9. Grounded on the teacher's
/// `arbitrage/executor.rs::execute`/`simulate_execution` two-phase
/// buy-then-sell shape, generalized from a fixed Uniswap-V2-router DEX-only
/// flow to a configurable CEX/DEX leg ordering with unwind.
pub struct Executor {
    config: ExecutorConfig,
    breaker: CircuitBreaker,
    replay: ReplayGuard,
}

impl Executor {
    pub fn new(config: ExecutorConfig, breaker_config: CircuitBreakerConfig, replay_ttl: Duration) -> Self {
        Executor {
            config,
            breaker: CircuitBreaker::new(breaker_config),
            replay: ReplayGuard::new(replay_ttl),
        }
    }

    fn leg_timeout_std(&self) -> std::time::Duration {
        self.config.leg_timeout.to_std().unwrap_or(std::time::Duration::from_secs(5))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn execute(
        &mut self,
        signal: &Signal,
        market: &Market,
        exchange: &dyn ExchangeClient,
        pricing: &PricingEngine,
        inventory: &mut InventoryTracker,
        sender: Address,
        now: DateTime<Utc>,
    ) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(signal.id.clone(), now);
        ctx.state = ExecutorState::Validating;

        if self.breaker.is_open(now) {
            return ctx.fail("circuit breaker open", now);
        }
        if !self.replay.check_and_record(&signal.id, now) {
            return ctx.fail("duplicate signal", now);
        }
        if !signal.is_valid(now) {
            return ctx.fail("signal failed pre-execution validation", now);
        }

        let leg1_kind = self.config.ordering.leg1();
        let leg2_kind = self.config.ordering.leg2();

        ctx.state = ExecutorState::Leg1Pending;
        let leg1 = match self.run_leg(leg1_kind, signal, market, exchange, pricing, sender).await {
            Ok(fill) => fill,
            Err(e) => {
                // leg1 failure/timeout needs no unwind: nothing has been opened yet.
                self.breaker.record_failure(now);
                return ctx.fail(e.to_string(), now);
            }
        };
        ctx.leg1_venue = Some(leg1.venue.clone());
        ctx.state = ExecutorState::Leg1Filled(leg1.clone());

        ctx.state = ExecutorState::Leg2Pending(leg1.clone());
        match self.run_leg(leg2_kind, signal, market, exchange, pricing, sender).await {
            Ok(leg2) => {
                ctx.leg2_venue = Some(leg2.venue.clone());
                let (cex_fill, dex_fill) = match leg1_kind {
                    LegKind::Cex => (&leg1, &leg2),
                    LegKind::Dex => (&leg2, &leg1),
                };
                let pnl = realize_pnl(signal.direction, signal.size, cex_fill.price, dex_fill.price, leg1.price);
                self.apply_fills(inventory, market, signal.direction, leg1_kind, &leg1, &leg2);
                ctx.actual_net_pnl = Some(pnl);
                ctx.finished_at = Some(now);
                ctx.state = ExecutorState::Done { leg1, leg2, pnl };
                self.breaker.record_success();
                ctx
            }
            Err(e) => {
                ctx.state = ExecutorState::Unwinding { leg1: leg1.clone(), reason: e.to_string() };
                self.unwind(leg1_kind, &leg1, signal, market, exchange, pricing, sender).await;
                self.breaker.record_failure(now);
                ctx.fail(format!("leg2 failed: {e}; position unwound"), now)
            }
        }
    }

    async fn run_leg(
        &self,
        kind: LegKind,
        signal: &Signal,
        market: &Market,
        exchange: &dyn ExchangeClient,
        pricing: &PricingEngine,
        sender: Address,
    ) -> Result<LegFill, ExecutorError> {
        let result = tokio::time::timeout(self.leg_timeout_std(), async {
            match kind {
                LegKind::Cex => self.run_cex_leg(signal, market, exchange).await,
                LegKind::Dex => self.run_dex_leg(signal, market, pricing, sender).await,
            }
        })
        .await;
        match result {
            Ok(inner) => inner,
            Err(_) => Err(ExecutorError::Timeout),
        }
    }

    async fn run_cex_leg(&self, signal: &Signal, market: &Market, exchange: &dyn ExchangeClient) -> Result<LegFill, ExecutorError> {
        let side = cex_side(signal.direction);
        let limit_price = signal.cex_price * CEX_LIMIT_PRICE_BUFFER;
        let order = exchange.create_limit_ioc_order(&market.symbol, side, signal.size, limit_price).await?;
        if order.status == OrderStatus::Expired {
            return Err(ExecutorError::CexNotFilled);
        }
        let ratio = order.fill_ratio();
        if ratio < self.config.min_fill_ratio {
            return Err(ExecutorError::PartialFill(ratio));
        }
        Ok(LegFill {
            venue: market.cex_venue.clone(),
            price: order.avg_fill_price,
            size: order.filled_amount,
            identifier: order.id,
        })
    }

    async fn run_dex_leg(&self, signal: &Signal, market: &Market, pricing: &PricingEngine, sender: Address) -> Result<LegFill, ExecutorError> {
        let (token_in, token_out, amount_in_human) = match signal.direction {
            Direction::BuyCexSellDex => (market.base.clone(), market.quote.clone(), signal.size),
            Direction::BuyDexSellCex => (market.quote.clone(), market.base.clone(), signal.size * signal.dex_price),
        };
        let amount_in_raw = token_in.to_raw(amount_in_human)?;
        let quote = pricing
            .get_quote(token_in.address, token_out.address, &amount_in_raw, self.config.gas_price_gwei, sender)
            .await?;
        if !quote.is_valid() || quote.simulated_output == BigUint::from(0u32) {
            return Err(ExecutorError::DexSimulationFailed);
        }
        let received = token_out.to_human(&quote.simulated_output)?;
        let (price, size) = match signal.direction {
            Direction::BuyCexSellDex => (received / amount_in_human, amount_in_human),
            Direction::BuyDexSellCex => (amount_in_human / received, received),
        };
        Ok(LegFill {
            venue: market.wallet_venue.clone(),
            price,
            size,
            identifier: format!("quote@{}", quote.timestamp.timestamp_nanos_opt().unwrap_or_default()),
        })
    }

    /// Closes the already-filled leg1 to flatten the position after leg2
    /// fails or times out. Any unwind failure is logged and still yields
    /// FAILED; the position may require manual reconciliation (spec.md §4.8/§9).
    async fn unwind(
        &self,
        leg1_kind: LegKind,
        leg1: &LegFill,
        signal: &Signal,
        market: &Market,
        exchange: &dyn ExchangeClient,
        pricing: &PricingEngine,
        sender: Address,
    ) {
        match leg1_kind {
            LegKind::Cex => {
                let reverse_side = match cex_side(signal.direction) {
                    OrderSide::Buy => OrderSide::Sell,
                    OrderSide::Sell => OrderSide::Buy,
                };
                if let Err(e) = exchange.create_market_order(&market.symbol, reverse_side, leg1.size).await {
                    log::error!("unwind: CEX reverse market order failed for signal {}: {e}", signal.id);
                }
            }
            LegKind::Dex => {
                // `leg1.size` is always base-denominated (the DEX leg's
                // amount-sold / amount-received). Unwinding a DEX sell
                // (BuyCexSellDex) spends quote back into base, so the
                // reverse amount is the quote proceeds `leg1.size *
                // leg1.price`, not `leg1.size` itself; unwinding a DEX buy
                // (BuyDexSellCex) sells the base tokens received, whose
                // amount already is `leg1.size`.
                let (token_in, token_out, amount_human) = match signal.direction {
                    Direction::BuyCexSellDex => (market.quote.clone(), market.base.clone(), leg1.size * leg1.price),
                    Direction::BuyDexSellCex => (market.base.clone(), market.quote.clone(), leg1.size),
                };
                let amount_raw = match token_in.to_raw(amount_human) {
                    Ok(v) => v,
                    Err(e) => {
                        log::error!("unwind: failed to convert leg1 size for signal {}: {e}", signal.id);
                        return;
                    }
                };
                if let Err(e) = pricing
                    .get_quote(token_in.address, token_out.address, &amount_raw, self.config.gas_price_gwei, sender)
                    .await
                {
                    log::error!("unwind: reversed DEX quote failed for signal {}: {e}", signal.id);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_fills(&self, inventory: &mut InventoryTracker, market: &Market, direction: Direction, leg1_kind: LegKind, leg1: &LegFill, leg2: &LegFill) {
        let (cex_fill, dex_fill) = match leg1_kind {
            LegKind::Cex => (leg1, leg2),
            LegKind::Dex => (leg2, leg1),
        };
        match direction {
            Direction::BuyCexSellDex => {
                inventory.record_trade(
                    &market.cex_venue,
                    TradeSide::Buy,
                    &market.base.symbol,
                    &market.quote.symbol,
                    cex_fill.size,
                    cex_fill.size * cex_fill.price,
                    Decimal::ZERO,
                    &market.quote.symbol,
                );
                inventory.record_trade(
                    &market.wallet_venue,
                    TradeSide::Sell,
                    &market.base.symbol,
                    &market.quote.symbol,
                    dex_fill.size,
                    dex_fill.size * dex_fill.price,
                    Decimal::ZERO,
                    &market.quote.symbol,
                );
            }
            Direction::BuyDexSellCex => {
                inventory.record_trade(
                    &market.wallet_venue,
                    TradeSide::Buy,
                    &market.base.symbol,
                    &market.quote.symbol,
                    dex_fill.size,
                    dex_fill.size * dex_fill.price,
                    Decimal::ZERO,
                    &market.quote.symbol,
                );
                inventory.record_trade(
                    &market.cex_venue,
                    TradeSide::Sell,
                    &market.base.symbol,
                    &market.quote.symbol,
                    cex_fill.size,
                    cex_fill.size * cex_fill.price,
                    Decimal::ZERO,
                    &market.quote.symbol,
                );
            }
        }
    }
}

/// BUY_CEX_SELL_DEX: `(dex_price - cex_price) * size - fees`.
/// BUY_DEX_SELL_CEX: `(cex_price - dex_price) * size - fees`.
fn realize_pnl(direction: Direction, size: Decimal, cex_price: Decimal, dex_price: Decimal, leg1_price: Decimal) -> Decimal {
    let fees = size * leg1_price * FEE_RATE;
    let gross = match direction {
        Direction::BuyCexSellDex => (dex_price - cex_price) * size,
        Direction::BuyDexSellCex => (cex_price - dex_price) * size,
    };
    gross - fees
}
