use std::env;

use rust_decimal::Decimal;

use crate::executor::OrderingPolicy;

/// One tracked (CEX symbol, DEX pool address) market, parsed from a single
/// `TRACKED_MARKETS` environment entry:
/// `symbol:base_addr:base_decimals:quote_addr:quote_decimals:pool_addr:size`.
#[derive(Debug, Clone)]
pub struct MarketSpec {
    pub symbol: String,
    pub base_address: String,
    pub base_decimals: u8,
    pub quote_address: String,
    pub quote_decimals: u8,
    pub pool_address: String,
    pub size: Decimal,
}

/// Every tunable spec.md names, loaded from the environment. Layered
/// `dotenv::from_filename` calls mirror the teacher's `secrets.env` /
/// `addresses.env` / `config/addresses.env` precedence; required keys fail
/// fast, tunables fall back to the defaults the spec calls out explicitly
/// (30 bps default AMM fee, 3 max hops, 60s replay window, 0.8 min fill
/// ratio, etc).
#[derive(Debug, Clone)]
pub struct Config {
    pub production: bool,
    pub port: u16,

    // Chain / simulator / CEX endpoints
    pub rpc_url: String,
    pub ws_url: Option<String>,
    pub simulator_url: String,
    pub cex_base_url: String,

    // Addresses
    pub weth_address: String,
    pub sender_address: String,
    pub funder_addresses_json: Option<String>,

    // Tracked markets
    pub tracked_markets: Vec<MarketSpec>,

    // AMM / routing
    pub default_fee_bps: u32,
    pub max_hops: usize,

    // Signal generator
    pub signal_cooldown_secs: i64,
    pub min_spread_bps: Decimal,
    pub min_profit_usd: Decimal,
    pub signal_ttl_secs: i64,
    pub cex_taker_bps: Decimal,
    pub dex_swap_bps: Decimal,
    pub native_price_usd: Decimal,
    pub gas_price_gwei: u64,

    // Scorer
    pub scorer_weight_spread: Decimal,
    pub scorer_weight_liquidity: Decimal,
    pub scorer_weight_inventory: Decimal,
    pub scorer_weight_history: Decimal,
    pub scorer_excellent_spread_bps: Decimal,

    // Risk manager
    pub risk_per_trade_usd_cap: Decimal,
    pub risk_per_trade_pct_of_capital_cap: Decimal,
    pub risk_daily_loss_cap: Decimal,
    pub risk_drawdown_cap_pct: Decimal,
    pub risk_consecutive_loss_cap: u32,
    pub risk_trades_per_hour_cap: u32,
    pub starting_capital_usd: Decimal,

    // Executor
    pub ordering_policy: OrderingPolicy,
    pub leg_timeout_secs: i64,
    pub min_fill_ratio: Decimal,

    // Circuit breaker / replay protection
    pub breaker_failure_threshold: u32,
    pub breaker_window_secs: i64,
    pub breaker_cooldown_secs: i64,
    pub replay_ttl_secs: i64,

    // Orchestrator loop
    pub tick_interval_secs: i64,
    pub error_backoff_secs: i64,
    pub kill_switch_path: String,

    // Persistence / alerting
    pub pnl_csv_path: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

fn env_decimal(key: &str, default: &str) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| default.parse().expect("default decimal literal must parse"))
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_ordering(value: &str) -> OrderingPolicy {
    match value.to_lowercase().as_str() {
        "dex_first" | "dex-first" => OrderingPolicy::DexFirst,
        _ => OrderingPolicy::CexFirst,
    }
}

fn parse_markets(raw: &str) -> Vec<MarketSpec> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let parts: Vec<&str> = entry.trim().split(':').collect();
            if parts.len() != 7 {
                log::warn!("skipping malformed TRACKED_MARKETS entry: {entry}");
                return None;
            }
            let base_decimals = parts[2].parse().unwrap_or(18);
            let quote_decimals = parts[4].parse().unwrap_or(18);
            let size = parts[6].parse().unwrap_or(Decimal::ONE);
            Some(MarketSpec {
                symbol: parts[0].to_string(),
                base_address: parts[1].to_string(),
                base_decimals,
                quote_address: parts[3].to_string(),
                quote_decimals,
                pool_address: parts[5].to_string(),
                size,
            })
        })
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("addresses.env").ok();
        dotenv::from_filename("config/addresses.env").ok();
        dotenv::dotenv().ok();

        let production = env::var("PRODUCTION").map(|v| v == "true" || v == "1").unwrap_or(false);

        Ok(Config {
            production,
            port: env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().unwrap_or(8000),

            rpc_url: env::var("RPC_URL").map_err(|_| "RPC_URL must be set")?,
            ws_url: env::var("WS_URL").ok(),
            simulator_url: env::var("SIMULATOR_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            cex_base_url: env::var("CEX_API_URL").unwrap_or_else(|_| "https://api.exchange.example/v1".to_string()),

            weth_address: env::var("WETH_ADDRESS").map_err(|_| "WETH_ADDRESS must be set")?,
            sender_address: env::var("SENDER_ADDRESS").map_err(|_| "SENDER_ADDRESS must be set")?,
            funder_addresses_json: env::var("FUNDER_ADDRESSES_JSON").ok(),

            tracked_markets: parse_markets(&env::var("TRACKED_MARKETS").unwrap_or_default()),

            default_fee_bps: env_u32("DEFAULT_FEE_BPS", 30),
            max_hops: env_u64("MAX_HOPS", 3) as usize,

            signal_cooldown_secs: env_i64("SIGNAL_COOLDOWN_SECS", 30),
            min_spread_bps: env_decimal("MIN_SPREAD_BPS", "20"),
            min_profit_usd: env_decimal("MIN_PROFIT_USD", "5"),
            signal_ttl_secs: env_i64("SIGNAL_TTL_SECS", 10),
            cex_taker_bps: env_decimal("CEX_TAKER_BPS", "10"),
            dex_swap_bps: env_decimal("DEX_SWAP_BPS", "30"),
            native_price_usd: env_decimal("NATIVE_PRICE_USD", "2000"),
            gas_price_gwei: env_u64("GAS_PRICE_GWEI", 20),

            scorer_weight_spread: env_decimal("SCORER_WEIGHT_SPREAD", "0.40"),
            scorer_weight_liquidity: env_decimal("SCORER_WEIGHT_LIQUIDITY", "0.20"),
            scorer_weight_inventory: env_decimal("SCORER_WEIGHT_INVENTORY", "0.20"),
            scorer_weight_history: env_decimal("SCORER_WEIGHT_HISTORY", "0.20"),
            scorer_excellent_spread_bps: env_decimal("SCORER_EXCELLENT_SPREAD_BPS", "100"),

            risk_per_trade_usd_cap: env_decimal("RISK_PER_TRADE_USD_CAP", "1000"),
            risk_per_trade_pct_of_capital_cap: env_decimal("RISK_PER_TRADE_PCT_CAP", "10"),
            risk_daily_loss_cap: env_decimal("RISK_DAILY_LOSS_CAP", "-200"),
            risk_drawdown_cap_pct: env_decimal("RISK_DRAWDOWN_CAP_PCT", "15"),
            risk_consecutive_loss_cap: env_u32("RISK_CONSECUTIVE_LOSS_CAP", 5),
            risk_trades_per_hour_cap: env_u32("RISK_TRADES_PER_HOUR_CAP", 20),
            starting_capital_usd: env_decimal("STARTING_CAPITAL_USD", "10000"),

            ordering_policy: parse_ordering(&env::var("ORDERING_POLICY").unwrap_or_else(|_| "cex_first".to_string())),
            leg_timeout_secs: env_i64("LEG_TIMEOUT_SECS", 10),
            min_fill_ratio: env_decimal("MIN_FILL_RATIO", "0.8"),

            breaker_failure_threshold: env_u32("BREAKER_FAILURE_THRESHOLD", 3),
            breaker_window_secs: env_i64("BREAKER_WINDOW_SECS", 300),
            breaker_cooldown_secs: env_i64("BREAKER_COOLDOWN_SECS", 120),
            replay_ttl_secs: env_i64("REPLAY_TTL_SECS", 60),

            tick_interval_secs: env_i64("TICK_INTERVAL_SECS", 5),
            error_backoff_secs: env_i64("ERROR_BACKOFF_SECS", 15),
            kill_switch_path: env::var("KILL_SWITCH_PATH").unwrap_or_else(|_| "killswitch".to_string()),

            pnl_csv_path: env::var("PNL_CSV_PATH").ok(),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_market_entries() {
        let markets = parse_markets(
            "ETH/USDC:0xaaa:18:0xbbb:6:0xccc:1.5,BTC/USDT:0xddd:8:0xeee:6:0xfff:0.1",
        );
        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].symbol, "ETH/USDC");
        assert_eq!(markets[0].base_decimals, 18);
        assert_eq!(markets[0].quote_decimals, 6);
        assert_eq!(markets[0].size, Decimal::new(15, 1));
        assert_eq!(markets[1].symbol, "BTC/USDT");
        assert_eq!(markets[1].base_decimals, 8);
    }

    #[test]
    fn skips_malformed_entries() {
        let markets = parse_markets("bad-entry,ETH/USDC:0xaaa:18:0xbbb:6:0xccc:1");
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].symbol, "ETH/USDC");
    }

    #[test]
    fn ordering_policy_defaults_to_cex_first() {
        assert_eq!(parse_ordering("nonsense"), OrderingPolicy::CexFirst);
        assert_eq!(parse_ordering("dex_first"), OrderingPolicy::DexFirst);
    }
}
