//! Order-book dump CLI.
//!
//! Fetches a CEX order book and prints its walk-the-book/depth/imbalance
//! analytics, per spec.md §6's peripheral CLI surface.
//!
//! Usage:
//!   orderbook-dump [symbol] [depth]
//!   orderbook-dump ETH/USDC 20

use std::env;
use std::process::ExitCode;

use meridian_arb::chain::exchange::{ExchangeClient, LiveExchangeClient};
use meridian_arb::config::Config;
use meridian_arb::orderbook::OrderBookAnalyzer;
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
    let symbol = args
        .get(1)
        .cloned()
        .or_else(|| config.tracked_markets.first().map(|m| m.symbol.clone()))
        .unwrap_or_else(|| "ETH/USDC".to_string());
    let depth: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);

    let exchange = LiveExchangeClient::new(config.cex_base_url.clone());
    let book = match exchange.fetch_order_book(&symbol, depth).await {
        Ok(b) => b,
        Err(e) => {
            eprintln!("failed to fetch order book for {symbol}: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{symbol} @ {}", book.timestamp);
    println!("best bid {} / best ask {} / mid {} / spread {} bps", book.best_bid(), book.best_ask(), book.mid(), book.spread_bps());

    let analyzer = OrderBookAnalyzer::new(&book);
    println!("imbalance (top 10): {}", analyzer.imbalance(10));

    for bps in [10, 50, 100] {
        match analyzer.depth_at_bps("buy", Decimal::from(bps)) {
            Ok(d) => println!("bid depth within {bps} bps: {d}"),
            Err(e) => println!("bid depth within {bps} bps: error ({e})"),
        }
        match analyzer.depth_at_bps("sell", Decimal::from(bps)) {
            Ok(d) => println!("ask depth within {bps} bps: {d}"),
            Err(e) => println!("ask depth within {bps} bps: error ({e})"),
        }
    }

    ExitCode::SUCCESS
}
