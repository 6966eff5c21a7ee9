use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

use crate::money::{Address, Token};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmmError {
    #[error("invalid input amount")]
    InvalidInput,
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("token {0} is not part of this pair")]
    UnknownToken(Address),
    #[error("fee_bps must be in [0, 10000), got {0}")]
    InvalidFee(u32),
    #[error("token0 and token1 must differ")]
    DuplicateToken,
}

/// (address, token0, token1, reserve0, reserve1, fee_bps). Immutable value
/// object; swap simulation yields a new Pair rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub reserve0: BigUint,
    pub reserve1: BigUint,
    pub fee_bps: u32,
}

impl Pair {
    pub fn new(
        address: Address,
        token0: Token,
        token1: Token,
        reserve0: BigUint,
        reserve1: BigUint,
        fee_bps: u32,
    ) -> Result<Self, AmmError> {
        if fee_bps >= 10_000 {
            return Err(AmmError::InvalidFee(fee_bps));
        }
        if token0.address == token1.address {
            return Err(AmmError::DuplicateToken);
        }
        Ok(Pair {
            address,
            token0,
            token1,
            reserve0,
            reserve1,
            fee_bps,
        })
    }

    fn sides(&self, token_in: &Address) -> Result<(&BigUint, &BigUint), AmmError> {
        if *token_in == self.token0.address {
            Ok((&self.reserve0, &self.reserve1))
        } else if *token_in == self.token1.address {
            Ok((&self.reserve1, &self.reserve0))
        } else {
            Err(AmmError::UnknownToken(*token_in))
        }
    }

    pub fn other_token(&self, token_in: &Address) -> Result<&Token, AmmError> {
        if *token_in == self.token0.address {
            Ok(&self.token1)
        } else if *token_in == self.token1.address {
            Ok(&self.token0)
        } else {
            Err(AmmError::UnknownToken(*token_in))
        }
    }

    /// `aif = amount_in * (10000 - fee_bps); num = aif * reserve_out;
    /// den = reserve_in * 10000 + aif; amount_out = num / den` (floor).
    pub fn amount_out(&self, amount_in: &BigUint, token_in: &Address) -> Result<BigUint, AmmError> {
        if amount_in.is_zero() {
            return Err(AmmError::InvalidInput);
        }
        let (reserve_in, reserve_out) = self.sides(token_in)?;
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }
        let fee_multiplier = BigUint::from(10_000u32 - self.fee_bps);
        let aif = amount_in * &fee_multiplier;
        let num = &aif * reserve_out;
        let den = reserve_in * BigUint::from(10_000u32) + &aif;
        Ok(num / den)
    }

    /// `num = reserve_in * amount_out * 10000;
    /// den = (reserve_out - amount_out) * (10000 - fee_bps);
    /// amount_in = num / den + 1` (ceil).
    pub fn amount_in(&self, amount_out: &BigUint, token_out: &Address) -> Result<BigUint, AmmError> {
        // token_out is on the *receiving* side, so the reserve pair is reversed
        // relative to `sides`, which indexes by the token being spent.
        let (reserve_out, reserve_in) = self.sides(token_out)?;
        if amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity);
        }
        let num = reserve_in * amount_out * BigUint::from(10_000u32);
        let den = (reserve_out - amount_out) * BigUint::from(10_000u32 - self.fee_bps);
        Ok(num / den + BigUint::from(1u32))
    }

    /// Ratio of reserves in Q18 fixed point, decimals-adjusted so the result
    /// is in units of `token_out per token_in * 10^18`.
    pub fn spot_price_q18(&self, token_in: &Address) -> Result<BigUint, AmmError> {
        let (reserve_in, reserve_out) = self.sides(token_in)?;
        if reserve_in.is_zero() {
            return Err(AmmError::InsufficientLiquidity);
        }
        let token_in_decimals = if *token_in == self.token0.address {
            self.token0.decimals
        } else {
            self.token1.decimals
        };
        let token_out_decimals = self.other_token(token_in)?.decimals;
        let scale_in = BigUint::from(10u8).pow(token_in_decimals as u32);
        let scale_out = BigUint::from(10u8).pow(token_out_decimals as u32);
        let q18 = BigUint::from(10u64).pow(18);
        let num = reserve_out * &scale_in * &q18;
        let den = reserve_in * &scale_out;
        Ok(num / den)
    }

    /// Returns a new Pair with updated reserves; fails rather than produce a
    /// negative reserve.
    pub fn simulate_swap(&self, amount_in: &BigUint, token_in: &Address) -> Result<Pair, AmmError> {
        let amount_out = self.amount_out(amount_in, token_in)?;
        let mut next = self.clone();
        if *token_in == self.token0.address {
            next.reserve0 += amount_in;
            next.reserve1 = next
                .reserve1
                .checked_sub(&amount_out)
                .ok_or(AmmError::InsufficientLiquidity)?;
        } else {
            next.reserve1 += amount_in;
            next.reserve0 = next
                .reserve0
                .checked_sub(&amount_out)
                .ok_or(AmmError::InsufficientLiquidity)?;
        }
        Ok(next)
    }

    pub fn k(&self) -> BigUint {
        &self.reserve0 * &self.reserve1
    }
}
