use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ethers::prelude::*;
use num_bigint::BigUint;
use thiserror::Error;

use crate::amm::{AmmError, Pair, Route, RouteFinder};
use crate::chain::mempool::ParsedSwap;
use crate::chain::simulator::{ForkSimulator, SimulatorError};
use crate::money::{Address, Token};

use super::quote::Quote;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no route found from {0} to {1}")]
    NoRoute(Address, Address),
    #[error("simulation failed: {0}")]
    SimulationFailed(String),
    #[error("failed to fetch pool {0}: {1}")]
    PoolFetch(Address, String),
}

/// Fetches a pool's on-chain reserves/token metadata. Generalized from the
/// teacher's protocol-specific `aerodrome_client`/`uniswap_v4_client`
/// readers into one constant-product-pool source, since spec.md's AMM Pair
/// (§4.1) is protocol-agnostic.
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pool(&self, address: Address) -> Result<Pair, PricingError>;
}

abigen!(
    IConstantProductPool,
    r#"[
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)
        function token0() external view returns (address)
        function token1() external view returns (address)
    ]"#
);

/// Reads reserves/token0/token1 from a generic constant-product pool
/// contract; decimals/symbol for each token come from a static registry
/// (populated from config at bootstrap, as the teacher's token addresses
/// are), since ERC20 metadata is not part of the pair interface itself.
pub struct LivePoolSource {
    provider: Arc<Provider<Http>>,
    token_registry: HashMap<Address, Token>,
    default_fee_bps: u32,
}

impl LivePoolSource {
    pub fn new(provider: Arc<Provider<Http>>, token_registry: HashMap<Address, Token>, default_fee_bps: u32) -> Self {
        LivePoolSource {
            provider,
            token_registry,
            default_fee_bps,
        }
    }

    fn lookup(&self, address: ethers::types::Address) -> Result<Token, PricingError> {
        let key = Address::from_raw(address);
        self.token_registry
            .get(&key)
            .cloned()
            .ok_or_else(|| PricingError::PoolFetch(key, "token not present in registry".to_string()))
    }
}

#[async_trait]
impl PoolSource for LivePoolSource {
    async fn fetch_pool(&self, address: Address) -> Result<Pair, PricingError> {
        let contract = IConstantProductPool::new(address.as_ethers(), self.provider.clone());
        let (reserve0, reserve1, _) = contract
            .get_reserves()
            .call()
            .await
            .map_err(|e| PricingError::PoolFetch(address, e.to_string()))?;
        let token0_addr = contract
            .token_0()
            .call()
            .await
            .map_err(|e| PricingError::PoolFetch(address, e.to_string()))?;
        let token1_addr = contract
            .token_1()
            .call()
            .await
            .map_err(|e| PricingError::PoolFetch(address, e.to_string()))?;

        let token0 = self.lookup(token0_addr)?;
        let token1 = self.lookup(token1_addr)?;

        Pair::new(
            address,
            token0,
            token1,
            BigUint::from(reserve0),
            BigUint::from(reserve1),
            self.default_fee_bps,
        )
        .map_err(|e: AmmError| PricingError::PoolFetch(address, e.to_string()))
    }
}

/// Owns the authoritative Pair set and, derived from it, a RouteFinder.
/// Per spec.md §9 "Cyclic relations", the RouteFinder takes a snapshot
/// slice of the Pairs rather than a reference back into this struct, so a
/// refresh simply rebuilds a fresh RouteFinder from the new slice.
pub struct PricingEngine {
    pool_source: Arc<dyn PoolSource>,
    simulator: Arc<dyn ForkSimulator>,
    weth: Address,
    max_hops: usize,
    pools: HashMap<Address, Pair>,
    finder: RouteFinder,
}

impl PricingEngine {
    pub fn new(pool_source: Arc<dyn PoolSource>, simulator: Arc<dyn ForkSimulator>, weth: Address, max_hops: usize) -> Self {
        PricingEngine {
            pool_source,
            simulator,
            weth,
            max_hops,
            pools: HashMap::new(),
            finder: RouteFinder::new(vec![]),
        }
    }

    fn rebuild_finder(&mut self) {
        self.finder = RouteFinder::new(self.pools.values().cloned().collect());
    }

    /// Fetches each pool's metadata concurrently; replaces the owned set
    /// atomically only if every fetch succeeds.
    pub async fn load_pools(&mut self, addresses: &[Address]) -> Result<(), PricingError> {
        let fetches = addresses.iter().map(|addr| self.pool_source.fetch_pool(*addr));
        let results = futures::future::join_all(fetches).await;

        let mut next = HashMap::with_capacity(results.len());
        for (addr, result) in addresses.iter().zip(results) {
            let pair = result?;
            next.insert(*addr, pair);
        }
        self.pools = next;
        self.rebuild_finder();
        Ok(())
    }

    /// Refetches one pool and replaces its entry. Errors are logged and
    /// swallowed to keep the pipeline live, per spec.md §4.4.
    pub async fn refresh_pool(&mut self, address: Address) {
        match self.pool_source.fetch_pool(address).await {
            Ok(pair) => {
                self.pools.insert(address, pair);
                self.rebuild_finder();
            }
            Err(e) => {
                log::error!("refresh_pool({address}) failed, keeping stale entry: {e}");
            }
        }
    }

    /// On an observed pending swap involving both tokens of any tracked
    /// pool, schedules a `refresh_pool` for that address (the mempool hook,
    /// spec.md §4.4).
    pub async fn handle_mempool_swap(&mut self, swap: &ParsedSwap) {
        let matching: Vec<Address> = self
            .pools
            .values()
            .filter(|pair| {
                let touches = (pair.token0.address == swap.token_in && pair.token1.address == swap.token_out)
                    || (pair.token1.address == swap.token_in && pair.token0.address == swap.token_out);
                touches
            })
            .map(|pair| pair.address)
            .collect();
        for address in matching {
            self.refresh_pool(address).await;
        }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// (1) router picks the best route by gas-aware net output; (2) the
    /// fork simulator executes the route; (3) a Quote packages the two
    /// figures together for the drift check in `Quote::is_valid`.
    pub async fn get_quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: &BigUint,
        gas_price_gwei: u64,
        sender: Address,
    ) -> Result<Quote, PricingError> {
        let best = self
            .finder
            .find_best_route(token_in, token_out, amount_in, gas_price_gwei, self.max_hops, self.weth)
            .ok_or(PricingError::NoRoute(token_in, token_out))?;

        self.simulator
            .ensure_sender_ready(&best.route, amount_in, sender)
            .await
            .map_err(|e: SimulatorError| PricingError::SimulationFailed(e.to_string()))?;

        let simulation = self
            .simulator
            .simulate_route(&best.route, amount_in, sender)
            .await
            .map_err(|e| PricingError::SimulationFailed(e.to_string()))?;

        if !simulation.success {
            return Err(PricingError::SimulationFailed(
                simulation.error.unwrap_or_else(|| "simulation did not succeed".to_string()),
            ));
        }

        Ok(Quote {
            route: best.route,
            amount_in: amount_in.clone(),
            expected_output: best.gross_output,
            simulated_output: simulation.amount_out,
            gas_used: simulation.gas_used,
            timestamp: Utc::now(),
        })
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn set_pools_for_test(&mut self, pools: Vec<Pair>) {
        self.pools = pools.into_iter().map(|p| (p.address, p)).collect();
        self.rebuild_finder();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::simulator::mock::MockForkSimulator;
    use crate::money::Token;

    fn token(sym: &str, decimals: u8, addr: &str) -> Token {
        Token::new(sym, decimals, addr.parse().unwrap())
    }

    fn make_engine(pools: Vec<Pair>) -> PricingEngine {
        struct NoopSource;
        #[async_trait]
        impl PoolSource for NoopSource {
            async fn fetch_pool(&self, address: Address) -> Result<Pair, PricingError> {
                Err(PricingError::PoolFetch(address, "not used in this test".to_string()))
            }
        }
        let weth = token("WETH", 18, "0x1000000000000000000000000000000000000a").address;
        let mut engine = PricingEngine::new(Arc::new(NoopSource), Arc::new(MockForkSimulator::succeeding(BigUint::from(900u32))), weth, 3);
        engine.set_pools_for_test(pools);
        engine
    }

    #[tokio::test]
    async fn get_quote_fails_with_no_route() {
        let usdc = token("USDC", 6, "0x1000000000000000000000000000000000000b");
        let weth = token("WETH", 18, "0x1000000000000000000000000000000000000a");
        let engine = make_engine(vec![]);
        let sender = usdc.address;
        let result = engine
            .get_quote(usdc.address, weth.address, &BigUint::from(1_000u32), 1, sender)
            .await;
        assert!(matches!(result, Err(PricingError::NoRoute(_, _))));
    }

    #[tokio::test]
    async fn get_quote_succeeds_and_flags_drift_against_a_mismatched_simulation() {
        let weth = token("WETH", 18, "0x1000000000000000000000000000000000000a");
        let usdc = token("USDC", 6, "0x1000000000000000000000000000000000000b");
        let pair = Pair::new(
            "0x2000000000000000000000000000000000000a".parse().unwrap(),
            weth.clone(),
            usdc.clone(),
            BigUint::from(1_000u32),
            BigUint::from(3_000_000u32),
            30,
        )
        .unwrap();
        let expected = pair.amount_out(&BigUint::from(10u32), &weth.address).unwrap();
        let engine = make_engine(vec![pair]);
        let quote = engine
            .get_quote(weth.address, usdc.address, &BigUint::from(10u32), 1, weth.address)
            .await
            .unwrap();
        assert_eq!(quote.expected_output, expected);
        assert_eq!(quote.simulated_output, BigUint::from(900u32));
        // the mock simulator's fixed 900 output is far from the pool's real
        // expected output, so the drift check must reject it.
        assert!(!quote.is_valid());
    }
}
