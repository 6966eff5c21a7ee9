//! One-shot arbitrage opportunity check CLI.
//!
//! Runs a single Signal Generator pass against one tracked market and
//! prints the resulting signal (or the reason none was emitted), per
//! spec.md §6's peripheral CLI surface.
//!
//! Usage:
//!   arb-check [symbol]

use std::env;
use std::process::ExitCode;

use chrono::{Duration, Utc};
use meridian_arb::bootstrap::build_live_clients;
use meridian_arb::config::Config;
use meridian_arb::inventory::InventoryTracker;
use meridian_arb::signal::{GeneratorConfig, SignalGenerator};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = env::args().collect();
    let requested_symbol = args.get(1).cloned();

    let clients = match build_live_clients(&config).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to bootstrap clients: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (market, size) = match config
        .tracked_markets
        .iter()
        .zip(clients.markets.iter())
        .find(|(spec, _)| requested_symbol.as_deref().map(|s| s == spec.symbol).unwrap_or(true))
    {
        Some((spec, market)) => (market.clone(), spec.size),
        None => {
            eprintln!("no tracked market found for {:?}", requested_symbol);
            return ExitCode::FAILURE;
        }
    };

    let mut generator = SignalGenerator::new(GeneratorConfig {
        cooldown: Duration::seconds(0),
        min_spread_bps: config.min_spread_bps,
        min_profit_usd: config.min_profit_usd,
        signal_ttl: Duration::seconds(config.signal_ttl_secs),
        cex_taker_bps: config.cex_taker_bps,
        dex_swap_bps: config.dex_swap_bps,
        native_price_usd: config.native_price_usd,
        gas_price_gwei: config.gas_price_gwei,
    });

    let inventory = InventoryTracker::new();
    let result = generator
        .generate(&market, size, clients.exchange.as_ref(), &clients.pricing, &inventory, clients.sender, Utc::now())
        .await;

    match result {
        Ok(Some(signal)) => {
            println!("opportunity found for {}", market.symbol);
            println!("direction: {:?}", signal.direction);
            println!("cex_price: {} dex_price: {} spread_bps: {}", signal.cex_price, signal.dex_price, signal.spread_bps);
            println!(
                "expected gross/fees/net: {} / {} / {}",
                signal.expected.gross, signal.expected.fees, signal.expected.net
            );
            println!("score: {} expiry: {}", signal.score, signal.expiry);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("no opportunity for {} (below threshold, on cooldown, or insufficient inventory)", market.symbol);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("signal generation failed for {}: {e}", market.symbol);
            ExitCode::FAILURE
        }
    }
}
