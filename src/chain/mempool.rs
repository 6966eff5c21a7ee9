use async_trait::async_trait;
use num_bigint::BigUint;
use thiserror::Error;

use crate::money::Address;

#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("subscription error: {0}")]
    Subscription(String),
}

/// The six known swap-function selectors the decoder recognizes, mirroring
/// the variants a production mempool watcher maps pending calldata onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapVariant {
    UniswapV2SwapExactTokensForTokens,
    UniswapV3ExactInputSingle,
    UniswapV3ExactInput,
    UniswapUniversalRouterExecute,
    CurveExchange,
    BalancerSwap,
}

/// A decoded pending swap. Downstream consumers (the Pricing Engine's
/// mempool hook, §4.4) receive only records whose `(token_in, token_out)`
/// both match a tracked pool's tokens.
#[derive(Debug, Clone)]
pub struct ParsedSwap {
    pub variant: SwapVariant,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: BigUint,
    pub sender: Address,
}

/// The pending-tx subscription surface the core consumes. Live
/// implementations subscribe over `ethers::providers::Ws`; generalized from
/// the teacher's WS provider construction in `chain/providers.rs`.
#[async_trait]
pub trait MempoolStream: Send + Sync {
    /// Pulls the next decoded swap from the subscription, or `None` once the
    /// stream has been closed.
    async fn next_swap(&mut self) -> Result<Option<ParsedSwap>, MempoolError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;

    pub struct ScriptedMempoolStream {
        pub queue: VecDeque<ParsedSwap>,
    }

    impl ScriptedMempoolStream {
        pub fn new(swaps: Vec<ParsedSwap>) -> Self {
            ScriptedMempoolStream {
                queue: swaps.into(),
            }
        }
    }

    #[async_trait]
    impl MempoolStream for ScriptedMempoolStream {
        async fn next_swap(&mut self) -> Result<Option<ParsedSwap>, MempoolError> {
            Ok(self.queue.pop_front())
        }
    }
}

/// True iff the swap touches both tokens of the tracked pool, in either
/// direction — the filter the Pricing Engine's mempool hook applies before
/// scheduling a `refresh_pool` (spec.md §4.4).
pub fn touches_pool(swap: &ParsedSwap, pool_token0: Address, pool_token1: Address) -> bool {
    let pair = (swap.token_in, swap.token_out);
    pair == (pool_token0, pool_token1) || pair == (pool_token1, pool_token0)
}
