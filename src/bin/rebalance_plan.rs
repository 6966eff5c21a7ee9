//! Rebalance planner CLI.
//!
//! Pulls CEX and wallet balances for one tracked market's base asset and
//! prints the Inventory Tracker's rebalance plan, per spec.md §6's
//! peripheral CLI surface and §8's rebalance-planner scenario.
//!
//! Usage:
//!   rebalance-plan [asset] [withdrawal_fee]

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use meridian_arb::chain::exchange::{ExchangeClient, LiveExchangeClient};
use meridian_arb::chain::providers;
use meridian_arb::chain::rpc::{ChainClient, LiveChainClient};
use meridian_arb::config::Config;
use meridian_arb::inventory::{Balance, InventoryTracker};
use meridian_arb::money::Token;
use rust_decimal::Decimal;

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
    let asset = args
        .get(1)
        .cloned()
        .or_else(|| config.tracked_markets.first().map(|m| m.symbol.split('/').next().unwrap_or("ETH").to_string()))
        .unwrap_or_else(|| "ETH".to_string());
    let withdrawal_fee: Decimal = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(Decimal::ZERO);

    let Some(spec) = config.tracked_markets.iter().find(|m| m.symbol.starts_with(&asset)) else {
        eprintln!("no tracked market with base asset {asset}");
        return ExitCode::FAILURE;
    };

    let base_address = match spec.base_address.parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("invalid base address {}: {e}", spec.base_address);
            return ExitCode::FAILURE;
        }
    };
    let base_token = Token::new(asset.clone(), spec.base_decimals, base_address);

    let exchange = LiveExchangeClient::new(config.cex_base_url.clone());
    let cex_balances = match exchange.fetch_balance().await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to fetch CEX balance: {e}");
            return ExitCode::FAILURE;
        }
    };

    let provider = match providers::create_http_provider(&config.rpc_url) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("failed to build RPC provider: {e}");
            return ExitCode::FAILURE;
        }
    };
    let chain = LiveChainClient::new(provider);
    let sender = match config.sender_address.parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("invalid sender address: {e}");
            return ExitCode::FAILURE;
        }
    };
    let wallet_raw = match chain.get_balance(sender).await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to fetch wallet balance: {e}");
            return ExitCode::FAILURE;
        }
    };
    let wallet_amount = match base_token.to_human(&wallet_raw) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("failed to convert wallet balance to human units: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut tracker = InventoryTracker::new();
    let mut cex_snapshot: HashMap<String, Balance> = HashMap::new();
    if let Some(bal) = cex_balances.get(&asset) {
        cex_snapshot.insert(asset.clone(), Balance { free: bal.free, locked: bal.locked });
    }
    tracker.update_from_cex("binance", cex_snapshot);
    tracker.update_from_wallet("wallet", HashMap::from([(asset.clone(), wallet_amount)]));

    let skew = tracker.skew(&asset);
    println!("per-venue share of {asset}: {:?}", skew.per_venue_pct);
    println!("max deviation: {}% (rebalance threshold 30%)", skew.max_deviation_pct);

    match tracker.rebalance_plan(&asset, withdrawal_fee) {
        Some(plan) => {
            println!(
                "rebalance: move {} {} from {} to {} (net after fee: {})",
                plan.amount, plan.asset, plan.from_venue, plan.to_venue, plan.net_amount
            );
        }
        None => println!("no rebalance needed"),
    }

    ExitCode::SUCCESS
}
