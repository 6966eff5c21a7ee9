use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use num_bigint::BigUint;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::chain::exchange::{ExchangeClient, ExchangeClientError};
use crate::inventory::tracker::InventoryTracker;
use crate::money::MoneyError;
use crate::pricing::{PricingEngine, PricingError};

use super::types::{Direction, Economics, Market, Signal, SignalError as SignalConstructError};

#[derive(Debug, Error)]
pub enum SignalError {
    #[error(transparent)]
    Construct(#[from] SignalConstructError),
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeClientError),
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),
    #[error("decimal/raw conversion error: {0}")]
    Money(#[from] MoneyError),
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub cooldown: Duration,
    pub min_spread_bps: Decimal,
    pub min_profit_usd: Decimal,
    pub signal_ttl: Duration,
    pub cex_taker_bps: Decimal,
    pub dex_swap_bps: Decimal,
    pub native_price_usd: Decimal,
    pub gas_price_gwei: u64,
}

/// Fuses a CEX order book and DEX quotes into a directional Signal, per
/// spec.md §4.5's eight-step algorithm. Grounded on the teacher's
/// `engine/service.rs::analyze_arbitrage` two-source-fusion shape (fetch CEX
/// price, fetch DEX quote, compare, project economics), generalized from a
/// single fixed direction to the spec's two-candidate-spread comparison.
pub struct SignalGenerator {
    config: GeneratorConfig,
    cooldowns: HashMap<String, DateTime<Utc>>,
}

impl SignalGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        SignalGenerator {
            config,
            cooldowns: HashMap::new(),
        }
    }

    fn on_cooldown(&self, pair: &str, now: DateTime<Utc>) -> bool {
        match self.cooldowns.get(pair) {
            Some(last) => now - *last < self.config.cooldown,
            None => false,
        }
    }

    fn total_fee_bps(&self, gas_usd: Decimal, trade_value: Decimal) -> Decimal {
        if trade_value <= Decimal::ZERO {
            return self.config.cex_taker_bps + self.config.dex_swap_bps;
        }
        self.config.cex_taker_bps + self.config.dex_swap_bps + (gas_usd / trade_value * Decimal::new(10_000, 0))
    }

    fn gas_usd(&self, gas_used: u64) -> Decimal {
        let gas_price = crate::chain::gas::gas_price_from_gwei(self.config.gas_price_gwei);
        crate::chain::gas::estimate_cost_usd(&gas_price, gas_used, self.config.native_price_usd)
    }

    /// Steps 1-8 of spec.md §4.5. Returns `Ok(None)` for any non-error
    /// reason no signal is emitted (cooldown active, spread below threshold,
    /// profit below floor).
    pub async fn generate(
        &mut self,
        market: &Market,
        size: Decimal,
        exchange: &dyn ExchangeClient,
        pricing: &PricingEngine,
        inventory: &InventoryTracker,
        sender: crate::money::Address,
        now: DateTime<Utc>,
    ) -> Result<Option<Signal>, SignalError> {
        if self.on_cooldown(&market.symbol, now) {
            return Ok(None);
        }

        let book = exchange.fetch_order_book(&market.symbol, 10).await?;
        let cex_bid = book.best_bid();
        let cex_ask = book.best_ask();

        let size_base_raw = market.base.to_raw(size)?;
        let sell_quote = pricing
            .get_quote(market.base.address, market.quote.address, &size_base_raw, self.config.gas_price_gwei, sender)
            .await?;
        if sell_quote.simulated_output == BigUint::from(0u32) {
            return Ok(None);
        }
        let dex_sell_proceeds = market.quote.to_human(&sell_quote.simulated_output)?;
        let dex_sell_price = dex_sell_proceeds / size;

        let quote_spend = size * cex_ask;
        let quote_spend_raw = market.quote.to_raw(quote_spend)?;
        let buy_quote = pricing
            .get_quote(market.quote.address, market.base.address, &quote_spend_raw, self.config.gas_price_gwei, sender)
            .await?;
        if buy_quote.simulated_output == BigUint::from(0u32) {
            return Ok(None);
        }
        let dex_base_received = market.base.to_human(&buy_quote.simulated_output)?;
        if dex_base_received <= Decimal::ZERO {
            return Ok(None);
        }
        let dex_buy_price = quote_spend / dex_base_received;

        let ten_thousand = Decimal::new(10_000, 0);
        let spread_a = (dex_sell_price - cex_ask) / cex_ask * ten_thousand;
        let spread_b = (cex_bid - dex_buy_price) / dex_buy_price * ten_thousand;

        let (direction, spread_bps, route, dex_price, gas_used) = if spread_a >= spread_b {
            (Direction::BuyCexSellDex, spread_a, sell_quote.route.clone(), dex_sell_price, sell_quote.gas_used)
        } else {
            (Direction::BuyDexSellCex, spread_b, buy_quote.route.clone(), dex_buy_price, buy_quote.gas_used)
        };

        if spread_bps < self.config.min_spread_bps {
            return Ok(None);
        }

        let (cex_price, trade_value) = match direction {
            Direction::BuyCexSellDex => (cex_ask, size * cex_ask),
            Direction::BuyDexSellCex => (cex_bid, size * dex_buy_price),
        };

        let gas_usd = self.gas_usd(gas_used);
        let fee_bps = self.total_fee_bps(gas_usd, trade_value);
        let gross_pnl = spread_bps / ten_thousand * trade_value;
        let fees = fee_bps / ten_thousand * trade_value;
        let economics = Economics::new(gross_pnl, fees);
        if economics.net < self.config.min_profit_usd {
            return Ok(None);
        }

        let inventory_ok = match direction {
            Direction::BuyCexSellDex => {
                let cex_quote_balance = inventory.get_available(&market.cex_venue, &market.quote.symbol);
                let wallet_base = inventory.get_available(&market.wallet_venue, &market.base.symbol);
                cex_quote_balance >= size * cex_ask * Decimal::new(101, 2) && wallet_base >= size
            }
            Direction::BuyDexSellCex => {
                let wallet_quote = inventory.get_available(&market.wallet_venue, &market.quote.symbol);
                let cex_base = inventory.get_available(&market.cex_venue, &market.base.symbol);
                wallet_quote >= quote_spend * Decimal::new(101, 2) && cex_base >= size
            }
        };

        let expiry = now + self.config.signal_ttl;
        let signal = Signal::new(
            uuid_like(&market.symbol, now),
            market.symbol.clone(),
            route,
            direction,
            cex_price,
            dex_price,
            spread_bps,
            size,
            economics,
            now,
            expiry,
            inventory_ok,
            true,
        )?;

        self.cooldowns.insert(market.symbol.clone(), now);
        Ok(Some(signal))
    }
}

/// Deterministic id derived from pair + timestamp; the generator has no
/// dependency on a random-number source.
fn uuid_like(symbol: &str, now: DateTime<Utc>) -> String {
    format!("{symbol}-{}", now.timestamp_nanos_opt().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::amm::Pair;
    use crate::chain::exchange::mock::MockExchangeClient;
    use crate::chain::simulator::mock::MockForkSimulator;
    use crate::inventory::tracker::InventoryTracker;
    use crate::money::Token;
    use crate::orderbook::{Level, NormalizedOrderBook};

    fn token(sym: &str, decimals: u8, addr: &str) -> Token {
        Token::new(sym, decimals, addr.parse().unwrap())
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

    fn market() -> Market {
        Market {
            symbol: "ETH/USDC".to_string(),
            base: token("WETH", 18, "0x1000000000000000000000000000000000000a"),
            quote: token("USDC", 6, "0x1000000000000000000000000000000000000b"),
            cex_venue: "binance".to_string(),
            wallet_venue: "wallet".to_string(),
        }
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            cooldown: Duration::seconds(30),
            min_spread_bps: Decimal::from(5),
            min_profit_usd: Decimal::new(1, 2),
            signal_ttl: Duration::seconds(10),
            cex_taker_bps: Decimal::from(10),
            dex_swap_bps: Decimal::from(30),
            native_price_usd: Decimal::from(2000),
            gas_price_gwei: 1,
        }
    }

    #[tokio::test]
    async fn propagates_no_route_as_an_error() {
        // With no pools loaded, the Pricing Engine has no route at all, so
        // `get_quote` fails before cooldown/spread logic ever runs.
        let mut generator = SignalGenerator::new(config());
        let exchange = MockExchangeClient::new(book());
        let pricing = PricingEngine::new(
            Arc::new(NoopPoolSource),
            Arc::new(MockForkSimulator::succeeding(BigUint::from(0u32))),
            token("WETH", 18, "0x1000000000000000000000000000000000000a").address,
            3,
        );
        let inventory = InventoryTracker::new();
        let sender = token("WETH", 18, "0x1000000000000000000000000000000000000a").address;
        let result = generator
            .generate(&market(), Decimal::from(1), &exchange, &pricing, &inventory, sender, Utc::now())
            .await;
        assert!(matches!(result, Err(SignalError::Pricing(PricingError::NoRoute(_, _)))));
    }

    #[tokio::test]
    async fn cooldown_blocks_immediate_repeat() {
        let mut generator = SignalGenerator::new(config());
        generator.cooldowns.insert("ETH/USDC".to_string(), Utc::now());
        let exchange = MockExchangeClient::new(book());
        let pricing = PricingEngine::new(
            Arc::new(NoopPoolSource),
            Arc::new(MockForkSimulator::succeeding(BigUint::from(0u32))),
            token("WETH", 18, "0x1000000000000000000000000000000000000a").address,
            3,
        );
        let inventory = InventoryTracker::new();
        let sender = token("WETH", 18, "0x1000000000000000000000000000000000000a").address;
        let result = generator
            .generate(&market(), Decimal::from(1), &exchange, &pricing, &inventory, sender, Utc::now())
            .await
            .unwrap();
        assert!(result.is_none(), "cooldown should suppress generation");
    }

    struct NoopPoolSource;
    #[async_trait::async_trait]
    impl crate::pricing::PoolSource for NoopPoolSource {
        async fn fetch_pool(&self, address: crate::money::Address) -> Result<Pair, PricingError> {
            Err(PricingError::PoolFetch(address, "not used in this test".to_string()))
        }
    }
}
