use std::collections::HashMap;

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use thiserror::Error;

use crate::money::Address;

use super::pair::{AmmError, Pair};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no route found from {0} to {1}")]
    NoRoute(Address, Address),
}

/// Ordered (pools, path) with `|path| = |pools| + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub pools: Vec<Address>,
    pub path: Vec<Address>,
}

impl Route {
    pub fn hops(&self) -> usize {
        self.pools.len()
    }
}

#[derive(Debug, Clone)]
pub struct RankedRoute {
    pub route: Route,
    pub gross_output: BigUint,
    pub gas_cost_in_out: BigUint,
    pub net_output: BigUint,
}

/// Builds an undirected multigraph keyed by token address over a snapshot of
/// Pairs: nodes are tokens, edges are (pair, counterparty-token). Takes a
/// snapshot slice to avoid cyclic ownership with the Pricing Engine, which
/// rebuilds a RouteFinder from scratch on every pool refresh.
pub struct RouteFinder {
    pairs: Vec<Pair>,
    adjacency: HashMap<Address, Vec<usize>>,
}

impl RouteFinder {
    pub fn new(pairs: Vec<Pair>) -> Self {
        let mut adjacency: HashMap<Address, Vec<usize>> = HashMap::new();
        for (idx, pair) in pairs.iter().enumerate() {
            adjacency.entry(pair.token0.address).or_default().push(idx);
            adjacency.entry(pair.token1.address).or_default().push(idx);
        }
        RouteFinder { pairs, adjacency }
    }

    /// Enumerates simple paths via DFS from `token_in` to `token_out`. A path
    /// visits each token at most once; the traversal bound is `max_hops + 1`
    /// tokens. Output order is DFS order, stable for a given graph.
    pub fn find_all_routes(&self, token_in: Address, token_out: Address, max_hops: usize) -> Vec<Route> {
        let mut routes = Vec::new();
        let mut visited = vec![token_in];
        let mut pools = Vec::new();
        self.dfs(token_in, token_out, max_hops, &mut visited, &mut pools, &mut routes);
        routes
    }

    #[allow(clippy::only_used_in_recursion)]
    fn dfs(
        &self,
        current: Address,
        target: Address,
        max_hops: usize,
        visited: &mut Vec<Address>,
        pools: &mut Vec<usize>,
        out: &mut Vec<Route>,
    ) {
        if current == target && !pools.is_empty() {
            out.push(Route {
                pools: pools.iter().map(|&idx| self.pairs[idx].address).collect(),
                path: visited.clone(),
            });
            return;
        }
        if visited.len() - 1 >= max_hops {
            return;
        }
        let Some(neighbors) = self.adjacency.get(&current) else {
            return;
        };
        for &pool_idx in neighbors {
            if pools.contains(&pool_idx) {
                continue;
            }
            let pair = &self.pairs[pool_idx];
            let next_token = if pair.token0.address == current {
                pair.token1.address
            } else if pair.token1.address == current {
                pair.token0.address
            } else {
                continue;
            };
            if visited.contains(&next_token) {
                continue;
            }
            visited.push(next_token);
            pools.push(pool_idx);
            self.dfs(next_token, target, max_hops, visited, pools, out);
            pools.pop();
            visited.pop();
        }
    }

    /// For each route: simulates the hop chain to get `gross_output`,
    /// estimates gas, converts the gas cost into output-token units, and
    /// ranks by `net_output = max(0, gross - gas_cost_in_out)` descending.
    /// Ties are broken by first DFS discovery (`sort_by` is a stable sort).
    pub fn compare_routes(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: &BigUint,
        gas_price_gwei: u64,
        max_hops: usize,
        weth: Address,
    ) -> Vec<RankedRoute> {
        let routes = self.find_all_routes(token_in, token_out, max_hops);
        let mut ranked: Vec<RankedRoute> = routes
            .into_iter()
            .filter_map(|route| self.rank_route(route, amount_in, gas_price_gwei, weth))
            .collect();
        ranked.sort_by(|a, b| b.net_output.cmp(&a.net_output));
        ranked
    }

    pub fn find_best_route(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: &BigUint,
        gas_price_gwei: u64,
        max_hops: usize,
        weth: Address,
    ) -> Option<RankedRoute> {
        self.compare_routes(token_in, token_out, amount_in, gas_price_gwei, max_hops, weth)
            .into_iter()
            .next()
    }

    fn pair_by_address(&self, address: Address) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.address == address)
    }

    fn rank_route(
        &self,
        route: Route,
        amount_in: &BigUint,
        gas_price_gwei: u64,
        weth: Address,
    ) -> Option<RankedRoute> {
        let mut current = amount_in.clone();
        for (i, pool_addr) in route.pools.iter().enumerate() {
            let pair = self.pair_by_address(*pool_addr)?;
            let token_in_hop = route.path[i];
            current = match pair.amount_out(&current, &token_in_hop) {
                Ok(out) => out,
                Err(AmmError::InsufficientLiquidity) | Err(AmmError::InvalidInput) => return None,
                Err(_) => return None,
            };
        }
        let gross_output = current;

        let hops = route.hops() as u64;
        let gas_estimate = 150_000u64 + 100_000u64 * hops;
        let gas_cost_wei = BigUint::from(gas_estimate) * BigUint::from(gas_price_gwei) * BigUint::from(1_000_000_000u64);

        let token_out = *route.path.last().expect("route path is non-empty");
        let gas_cost_in_out = self.gas_cost_in_token_out(&gas_cost_wei, token_out, weth);

        let net_output = if gross_output > gas_cost_in_out {
            &gross_output - &gas_cost_in_out
        } else {
            BigUint::zero()
        };

        Some(RankedRoute {
            route,
            gross_output,
            gas_cost_in_out,
            net_output,
        })
    }

    /// Converts a wei-denominated gas cost into `token_out` raw units.
    ///
    /// If `token_out` is WETH the cost is the wei amount unchanged. Otherwise
    /// the neighbor pool of `token_out` with the largest WETH reserve is used
    /// as the pivot; the raw-reserve ratio of that pool *is* its WETH-per-
    /// tokenOut spot price, so `gas_cost_wei * reserve(tokenOut) /
    /// reserve(WETH)`, rounded up, gives the ceil-converted cost directly
    /// without a separate decimals-adjustment step. If no such neighbor
    /// exists, gas is treated as zero — a documented approximation (see
    /// DESIGN.md) that can under/over-charge when WETH liquidity is
    /// fragmented.
    fn gas_cost_in_token_out(&self, gas_cost_wei: &BigUint, token_out: Address, weth: Address) -> BigUint {
        if token_out == weth {
            return gas_cost_wei.clone();
        }
        let Some(pool_idxs) = self.adjacency.get(&token_out) else {
            return BigUint::zero();
        };
        let mut best: Option<(&BigUint, &BigUint)> = None; // (weth_reserve, tokenout_reserve)
        for &idx in pool_idxs {
            let pair = &self.pairs[idx];
            let sides = if pair.token0.address == weth && pair.token1.address == token_out {
                Some((&pair.reserve0, &pair.reserve1))
            } else if pair.token1.address == weth && pair.token0.address == token_out {
                Some((&pair.reserve1, &pair.reserve0))
            } else {
                None
            };
            if let Some((weth_reserve, tokenout_reserve)) = sides {
                let better = match best {
                    None => true,
                    Some((best_weth, _)) => weth_reserve > best_weth,
                };
                if better {
                    best = Some((weth_reserve, tokenout_reserve));
                }
            }
        }
        match best {
            None => BigUint::zero(),
            Some((weth_reserve, tokenout_reserve)) if weth_reserve.is_zero() => {
                let _ = tokenout_reserve;
                BigUint::zero()
            }
            Some((weth_reserve, tokenout_reserve)) => {
                let num = gas_cost_wei * tokenout_reserve;
                let (q, r) = num.div_rem(weth_reserve);
                if r.is_zero() {
                    q
                } else {
                    q + BigUint::from(1u32)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Token;

    fn token(sym: &str, decimals: u8, addr: &str) -> Token {
        Token::new(sym, decimals, addr.parse().unwrap())
    }

    fn pair(addr: &str, t0: Token, t1: Token, r0: u64, r1: u64) -> Pair {
        Pair::new(addr.parse().unwrap(), t0, t1, BigUint::from(r0), BigUint::from(r1), 30).unwrap()
    }

    #[test]
    fn route_output_matches_sequential_hop_simulation() {
        let weth = token("WETH", 18, "0x1000000000000000000000000000000000000a");
        let usdc = token("USDC", 6, "0x1000000000000000000000000000000000000b");
        let shib = token("SHIB", 18, "0x1000000000000000000000000000000000000c");

        let shib_weth = pair("0x2000000000000000000000000000000000000a", shib.clone(), weth.clone(), 1_000_000, 10);
        let weth_usdc = pair("0x2000000000000000000000000000000000000b", weth.clone(), usdc.clone(), 10, 30_000);

        let finder = RouteFinder::new(vec![shib_weth.clone(), weth_usdc.clone()]);
        let routes = finder.find_all_routes(shib.address, usdc.address, 3);
        assert_eq!(routes.len(), 1);
        let route = &routes[0];
        assert_eq!(route.hops(), 2);
        assert_eq!(route.path, vec![shib.address, weth.address, usdc.address]);

        let amount_in = BigUint::from(1_000u64);
        let expected_mid = shib_weth.amount_out(&amount_in, &shib.address).unwrap();
        let expected_out = weth_usdc.amount_out(&expected_mid, &weth.address).unwrap();

        let ranked = finder
            .rank_route(route.clone(), &amount_in, 1, weth.address)
            .unwrap();
        assert_eq!(ranked.gross_output, expected_out);
    }

    #[test]
    fn gas_tips_routing_direct_vs_multihop() {
        // Direct pool (thin reserves) vs multi-hop via WETH (deep reserves).
        let shib = token("SHIB", 18, "0x1000000000000000000000000000000000000c");
        let usdc = token("USDC", 6, "0x1000000000000000000000000000000000000b");
        let weth = token("WETH", 18, "0x1000000000000000000000000000000000000a");

        let direct = pair("0x2000000000000000000000000000000000000d", shib.clone(), usdc.clone(), 100_000, 100);
        let shib_weth = pair("0x2000000000000000000000000000000000000a", shib.clone(), weth.clone(), 1_000_000_000, 100_000);
        let weth_usdc = pair("0x2000000000000000000000000000000000000b", weth.clone(), usdc.clone(), 100_000, 300_000_000);

        let finder = RouteFinder::new(vec![direct, shib_weth, weth_usdc]);
        let amount_in = BigUint::from(10_000u64);

        let low_gas = finder.find_best_route(shib.address, usdc.address, &amount_in, 1, 3, weth.address).unwrap();
        assert_eq!(low_gas.route.hops(), 2, "multi-hop should win at low gas price");

        let high_gas = finder
            .find_best_route(shib.address, usdc.address, &amount_in, 500_000, 3, weth.address)
            .unwrap();
        assert_eq!(high_gas.route.hops(), 1, "direct hop should win at extreme gas price");
    }

    #[test]
    fn find_best_route_none_when_no_routes_exist() {
        let a = token("A", 18, "0x1000000000000000000000000000000000000a");
        let b = token("B", 18, "0x1000000000000000000000000000000000000b");
        let finder = RouteFinder::new(vec![]);
        assert!(finder
            .find_best_route(a.address, b.address, &BigUint::from(1u32), 1, 3, a.address)
            .is_none());
    }

    #[test]
    fn gas_treated_as_zero_without_weth_neighbor() {
        let a = token("A", 18, "0x1000000000000000000000000000000000000a");
        let b = token("B", 18, "0x1000000000000000000000000000000000000b");
        let weth = token("WETH", 18, "0x1000000000000000000000000000000000000e");
        let p = pair("0x2000000000000000000000000000000000000a", a.clone(), b.clone(), 1_000, 1_000);
        let finder = RouteFinder::new(vec![p]);
        let cost = finder.gas_cost_in_token_out(&BigUint::from(1_000_000u64), b.address, weth.address);
        assert!(cost.is_zero());
    }
}
