use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::alerts::AlertSink;
use crate::chain::exchange::ExchangeClient;
use crate::chain::gas::{estimate_cost_usd, gas_price_from_gwei};
use crate::executor::{ExecutionContext, Executor, ExecutorState};
use crate::inventory::InventoryTracker;
use crate::killswitch::KillSwitch;
use crate::money::Address;
use crate::pnl::{ArbRecord, PnlCsvWriter};
use crate::pricing::PricingEngine;
use crate::signal::{Direction, GateError, Market, PretradeValidator, RiskManager, RiskState, SafetyCheck, Scorer, Signal, SignalGenerator, run_gates};

/// A rough per-swap gas-unit estimate used only for the PnL CSV's `gas_cost`
/// column; the executor's own `actual_net_pnl` does not depend on it.
const DEX_GAS_UNITS: u64 = 150_000;

#[derive(Debug, Clone)]
pub struct TrackedPair {
    pub market: Market,
    pub size: Decimal,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub tick_interval: Duration,
    pub error_backoff: Duration,
    pub gas_price_gwei: u64,
    pub native_price_usd: Decimal,
}

/// Outcome of a single tick, used by `run` to pick the inter-tick sleep and
/// by tests to assert on one iteration without looping forever.
#[derive(Debug)]
pub enum TickOutcome {
    Completed,
    CompletedWithErrors,
    Stopped(String),
}

/// Point-in-time operator status, returned by `Orchestrator::status`.
#[derive(Debug, Clone)]
pub struct OrchestratorStatus {
    pub tracked_pairs: Vec<String>,
    pub tracked_pool_count: usize,
    pub current_capital_usd: Decimal,
    pub peak_capital_usd: Decimal,
    pub daily_loss_usd: Decimal,
    pub consecutive_losses: u32,
    pub kill_switch_path: String,
}

enum PairResult {
    NoSignal,
    Rejected(String),
    Fatal(String),
    Error(String),
    Executed(ExecutionContext),
}

/// Drives the gates → generator → scorer → executor pipeline across tracked
/// pairs on a single cooperative task, per spec.md §5. Grounded on the
/// teacher's `main.rs`/`bootstrap.rs` async wiring style; the poll-generate-
/// gate-execute sequence itself is new (the teacher has no orchestrator,
/// only the one-shot Rocket handlers in `engine/service.rs`).
pub struct Orchestrator {
    config: OrchestratorConfig,
    pairs: Vec<TrackedPair>,
    sender: Address,
    generator: SignalGenerator,
    scorer: Scorer,
    validator: PretradeValidator,
    risk: RiskManager,
    safety: SafetyCheck,
    risk_state: RiskState,
    executor: Executor,
    inventory: InventoryTracker,
    pricing: PricingEngine,
    exchange: Arc<dyn ExchangeClient>,
    alerts: Arc<dyn AlertSink>,
    killswitch: KillSwitch,
    pnl_writer: Option<PnlCsvWriter>,
}

#[allow(clippy::too_many_arguments)]
impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        pairs: Vec<TrackedPair>,
        sender: Address,
        generator: SignalGenerator,
        scorer: Scorer,
        validator: PretradeValidator,
        risk: RiskManager,
        safety: SafetyCheck,
        risk_state: RiskState,
        executor: Executor,
        inventory: InventoryTracker,
        pricing: PricingEngine,
        exchange: Arc<dyn ExchangeClient>,
        alerts: Arc<dyn AlertSink>,
        killswitch: KillSwitch,
        pnl_writer: Option<PnlCsvWriter>,
    ) -> Self {
        Orchestrator {
            config,
            pairs,
            sender,
            generator,
            scorer,
            validator,
            risk,
            safety,
            risk_state,
            executor,
            inventory,
            pricing,
            exchange,
            alerts,
            killswitch,
            pnl_writer,
        }
    }

    /// Runs ticks forever until the kill switch trips or a safety veto fires.
    /// Each tick sleeps `error_backoff` instead of `tick_interval` if any
    /// pair's processing hit a non-fatal error, per spec.md §7's
    /// catch-log-backoff propagation policy.
    pub async fn run(&mut self) {
        loop {
            match self.tick(Utc::now()).await {
                TickOutcome::Stopped(reason) => {
                    log::warn!("orchestrator stopping: {reason}");
                    break;
                }
                TickOutcome::Completed => {
                    tokio::time::sleep(self.config.tick_interval.to_std().unwrap_or(std::time::Duration::from_secs(1))).await;
                }
                TickOutcome::CompletedWithErrors => {
                    tokio::time::sleep(self.config.error_backoff.to_std().unwrap_or(std::time::Duration::from_secs(5))).await;
                }
            }
        }
    }

    /// One pass over every tracked pair. Exposed separately from `run` so
    /// tests can drive and assert on a single tick deterministically.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.killswitch.is_tripped() {
            let _ = self.alerts.send(&format!("kill switch file present at {:?}", self.killswitch.path()), true).await;
            return TickOutcome::Stopped("kill switch triggered".to_string());
        }

        let mut had_error = false;
        let pairs = self.pairs.clone();
        for pair in &pairs {
            match self.run_pair(pair, now).await {
                PairResult::NoSignal | PairResult::Rejected(_) => {}
                PairResult::Executed(ctx) => self.handle_execution(pair, &ctx, now).await,
                PairResult::Error(reason) => {
                    log::error!("tick error for {}: {reason}", pair.market.symbol);
                    had_error = true;
                }
                PairResult::Fatal(reason) => {
                    let _ = self.alerts.send(&format!("safety veto: {reason}"), true).await;
                    return TickOutcome::Stopped(reason);
                }
            }
        }

        if had_error {
            TickOutcome::CompletedWithErrors
        } else {
            TickOutcome::Completed
        }
    }

    async fn run_pair(&mut self, pair: &TrackedPair, now: DateTime<Utc>) -> PairResult {
        let signal = match self
            .generator
            .generate(&pair.market, pair.size, self.exchange.as_ref(), &self.pricing, &self.inventory, self.sender, now)
            .await
        {
            Ok(Some(signal)) => signal,
            Ok(None) => return PairResult::NoSignal,
            Err(e) => return PairResult::Error(format!("signal generation: {e}")),
        };

        let skew_is_red = self.inventory.skew(&pair.market.base.symbol).needs_rebalance;
        let mut signal = signal;
        signal.score = self.scorer.score(&signal.pair_symbol, signal.spread_bps, skew_is_red);

        let trade_usd = signal.size * signal.cex_price;
        if let Err(e) = run_gates(&self.validator, &self.risk, &self.safety, &signal, trade_usd, &mut self.risk_state, now) {
            return match e {
                GateError::SafetyVeto(_) => PairResult::Fatal(e.to_string()),
                _ => PairResult::Rejected(e.to_string()),
            };
        }

        self.risk_state.record_trade_attempt(now);
        let ctx = self
            .executor
            .execute(&signal, &pair.market, self.exchange.as_ref(), &self.pricing, &mut self.inventory, self.sender, now)
            .await;

        let success = ctx.is_done();
        self.scorer.record_result(&signal.pair_symbol, success);
        if let Some(pnl) = ctx.actual_net_pnl {
            self.risk_state.current_capital += pnl;
            if self.risk_state.current_capital > self.risk_state.peak_capital {
                self.risk_state.peak_capital = self.risk_state.current_capital;
            }
            if pnl < Decimal::ZERO {
                self.risk_state.daily_loss += pnl;
                self.risk_state.consecutive_losses += 1;
            } else {
                self.risk_state.consecutive_losses = 0;
            }
        }

        PairResult::Executed(ctx)
    }

    /// Read-only snapshot for the operator reporting surface (`web::routes`).
    /// Deliberately excludes circuit-breaker state since `CircuitBreaker::is_open`
    /// requires `&mut self` to lazily self-reset on an elapsed cooldown.
    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            tracked_pairs: self.pairs.iter().map(|p| p.market.symbol.clone()).collect(),
            tracked_pool_count: self.pricing.pool_count(),
            current_capital_usd: self.risk_state.current_capital,
            peak_capital_usd: self.risk_state.peak_capital,
            daily_loss_usd: self.risk_state.daily_loss,
            consecutive_losses: self.risk_state.consecutive_losses,
            kill_switch_path: self.killswitch.path().display().to_string(),
        }
    }

    async fn handle_execution(&mut self, pair: &TrackedPair, ctx: &ExecutionContext, now: DateTime<Utc>) {
        match &ctx.state {
            ExecutorState::Done { leg1, leg2, pnl } => {
                log::info!("SUCCESS: PnL={pnl} signal={}", ctx.signal_id);
                let _ = self.alerts.send(&format!("SUCCESS: {} PnL={pnl}", pair.market.symbol), false).await;
                if let Some(writer) = self.pnl_writer.as_mut() {
                    let record = build_record(&pair.market, &ctx.signal_id, leg1, leg2, self.config.gas_price_gwei, self.config.native_price_usd, now);
                    if let Err(e) = writer.write(&record) {
                        log::error!("failed to write PnL CSV row for {}: {e}", ctx.signal_id);
                    }
                }
            }
            ExecutorState::Failed { error } => {
                log::warn!("FAILED: {error} signal={}", ctx.signal_id);
                let _ = self.alerts.send(&format!("FAILED: {} {error}", pair.market.symbol), false).await;
            }
            _ => {}
        }
    }
}

/// Builds a PnL CSV row from a completed execution's two leg fills. Which
/// fill is the "buy" leg and which is the "sell" leg follows from
/// `ExecutionContext.leg1_venue` matching the market's CEX venue name,
/// since `LegFill` does not itself carry the trade side.
fn build_record(
    market: &Market,
    signal_id: &str,
    leg1: &crate::executor::LegFill,
    leg2: &crate::executor::LegFill,
    gas_price_gwei: u64,
    native_price_usd: Decimal,
    now: DateTime<Utc>,
) -> ArbRecord {
    let (cex_fill, dex_fill) = if leg1.venue == market.cex_venue { (leg1, leg2) } else { (leg2, leg1) };
    let direction = if cex_fill.price <= dex_fill.price { Direction::BuyCexSellDex } else { Direction::BuyDexSellCex };
    let (buy_fill, sell_fill) = match direction {
        Direction::BuyCexSellDex => (cex_fill, dex_fill),
        Direction::BuyDexSellCex => (dex_fill, cex_fill),
    };

    let gas_price = gas_price_from_gwei(gas_price_gwei);
    let gas_cost = estimate_cost_usd(&gas_price, DEX_GAS_UNITS, native_price_usd);

    ArbRecord {
        id: signal_id.to_string(),
        timestamp: now,
        symbol: market.symbol.clone(),
        buy_venue: buy_fill.venue.clone(),
        sell_venue: sell_fill.venue.clone(),
        buy_price: buy_fill.price,
        sell_price: sell_fill.price,
        amount: buy_fill.size,
        fee_buy: buy_fill.size * buy_fill.price * Decimal::new(2, 3),
        fee_sell: sell_fill.size * sell_fill.price * Decimal::new(2, 3),
        gas_cost,
    }
}
