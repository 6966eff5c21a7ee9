// Black-box orchestrator test: builds the full dependency graph through the
// public API only and drives ticks, the way the teacher's
// tests/blockchain_tests.rs / tests/cex_tests.rs exercise components from
// outside the crate rather than via #[cfg(test)] internals.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use num_bigint::BigUint;
use rust_decimal::Decimal;

use meridian_arb::alerts::NoopAlertSink;
use meridian_arb::amm::Pair;
use meridian_arb::chain::exchange::mock::MockExchangeClient;
use meridian_arb::chain::simulator::mock::MockForkSimulator;
use meridian_arb::executor::{CircuitBreakerConfig, Executor, ExecutorConfig, OrderingPolicy};
use meridian_arb::inventory::InventoryTracker;
use meridian_arb::killswitch::KillSwitch;
use meridian_arb::money::{Address, Token};
use meridian_arb::orchestrator::{Orchestrator, OrchestratorConfig, TickOutcome, TrackedPair};
use meridian_arb::orderbook::{Level, NormalizedOrderBook};
use meridian_arb::pricing::{PoolSource, PricingEngine, PricingError};
use meridian_arb::signal::{GeneratorConfig, Market, PretradeValidator, RiskLimits, RiskManager, RiskState, SafetyCheck, ScoreWeights, Scorer, SignalGenerator};

fn weth() -> Token {
    Token::new("WETH", 18, Address::from_str("0x1000000000000000000000000000000000000a").unwrap())
}

fn usdc() -> Token {
    Token::new("USDC", 6, Address::from_str("0x1000000000000000000000000000000000000b").unwrap())
}

fn market() -> Market {
    Market {
        symbol: "ETH/USDC".to_string(),
        base: weth(),
        quote: usdc(),
        cex_venue: "binance".to_string(),
        wallet_venue: "wallet".to_string(),
    }
}

fn book() -> NormalizedOrderBook {
    NormalizedOrderBook::new(
        "ETH/USDC".to_string(),
        Utc::now(),
        vec![Level { price: Decimal::from(1999), qty: Decimal::from(10) }],
        vec![Level { price: Decimal::from(2001), qty: Decimal::from(10) }],
    )
    .unwrap()
}

fn pool() -> Pair {
    Pair::new(
        Address::from_str("0x2000000000000000000000000000000000000a").unwrap(),
        weth(),
        usdc(),
        BigUint::from(1_000_000u64),
        BigUint::from(3_000_000_000u64),
        30,
    )
    .unwrap()
}

struct UnreachableSource;
#[async_trait::async_trait]
impl PoolSource for UnreachableSource {
    async fn fetch_pool(&self, address: Address) -> Result<Pair, PricingError> {
        Err(PricingError::PoolFetch(address, "pool set is pre-loaded in this test".to_string()))
    }
}

fn orchestrator_with_killswitch(killswitch: KillSwitch) -> Orchestrator {
    let mut pricing = PricingEngine::new(Arc::new(UnreachableSource), Arc::new(MockForkSimulator::succeeding(BigUint::from(2_000_000_000u64))), weth().address, 3);
    pricing.set_pools_for_test(vec![pool()]);

    let generator = SignalGenerator::new(GeneratorConfig {
        cooldown: Duration::seconds(0),
        min_spread_bps: Decimal::from(1),
        min_profit_usd: Decimal::new(1, 4),
        signal_ttl: Duration::seconds(30),
        cex_taker_bps: Decimal::from(10),
        dex_swap_bps: Decimal::from(30),
        native_price_usd: Decimal::from(2000),
        gas_price_gwei: 1,
    });

    let scorer = Scorer::new(ScoreWeights::default(), Decimal::from(1), Decimal::from(100));
    let risk = RiskManager::new(RiskLimits {
        per_trade_usd_cap: Decimal::from(100_000),
        per_trade_pct_of_capital_cap: Decimal::from(100),
        daily_loss_cap: Decimal::from(100_000),
        drawdown_cap_pct: Decimal::from(100),
        consecutive_loss_cap: 1000,
        trades_per_hour_cap: 1000,
    });
    let mut risk_state = RiskState::default();
    risk_state.current_capital = Decimal::from(10_000);
    risk_state.peak_capital = Decimal::from(10_000);

    let executor = Executor::new(
        ExecutorConfig { ordering: OrderingPolicy::CexFirst, leg_timeout: Duration::seconds(5), min_fill_ratio: Decimal::new(8, 1), gas_price_gwei: 1 },
        CircuitBreakerConfig { failure_threshold: 3, window: Duration::seconds(60), cooldown: Duration::seconds(30) },
        Duration::seconds(60),
    );

    let pairs = vec![TrackedPair { market: market(), size: Decimal::ONE }];

    Orchestrator::new(
        OrchestratorConfig { tick_interval: Duration::seconds(1), error_backoff: Duration::seconds(5), gas_price_gwei: 1, native_price_usd: Decimal::from(2000) },
        pairs,
        weth().address,
        generator,
        scorer,
        PretradeValidator,
        risk,
        SafetyCheck,
        risk_state,
        executor,
        InventoryTracker::new(),
        pricing,
        Arc::new(MockExchangeClient::new(book())),
        Arc::new(NoopAlertSink),
        killswitch,
        None,
    )
}

fn orchestrator() -> Orchestrator {
    orchestrator_with_killswitch(KillSwitch::new("/tmp/meridian_arb_integration_test_killswitch_never_exists"))
}

/// A tick with no prior inventory recorded still completes cleanly: gates
/// reject the opportunity rather than the loop erroring out.
#[tokio::test]
async fn tick_completes_without_inventory() {
    let mut orch = orchestrator();
    let outcome = orch.tick(Utc::now()).await;
    assert!(matches!(outcome, TickOutcome::Completed | TickOutcome::CompletedWithErrors));
}

/// `status()` reflects the tracked pairs, pool count, and starting capital
/// configured at construction time, independent of any tick having run.
#[tokio::test]
async fn status_reports_configured_pairs_and_capital() {
    let orch = orchestrator();
    let status = orch.status();
    assert_eq!(status.tracked_pairs, vec!["ETH/USDC".to_string()]);
    assert_eq!(status.tracked_pool_count, 1);
    assert_eq!(status.current_capital_usd, Decimal::from(10_000));
    assert_eq!(status.peak_capital_usd, Decimal::from(10_000));
    assert_eq!(status.consecutive_losses, 0);
}

/// A present kill-switch file halts the tick loop immediately, per spec.md
/// §5's "kill switch file path is polled each tick".
#[tokio::test]
async fn tick_stops_when_kill_switch_file_is_present() {
    let path = std::env::temp_dir().join(format!("meridian_arb_integration_killswitch_{}", std::process::id()));
    std::fs::write(&path, b"stop").unwrap();

    let mut orch = orchestrator_with_killswitch(KillSwitch::new(&path));

    let outcome = orch.tick(Utc::now()).await;
    assert!(matches!(outcome, TickOutcome::Stopped(_)));

    let _ = std::fs::remove_file(&path);
}
