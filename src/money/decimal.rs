use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount cannot be negative")]
    Negative,
    #[error("raw token amount does not fit in a Decimal")]
    Unrepresentable,
}

/// Converts a raw (on-chain, `decimals`-scaled) integer amount into a human
/// decimal value. The single explicit crossing point between the AMM's
/// unbounded-integer world and the P&L/CEX decimal world.
pub fn raw_to_decimal(raw: &BigUint, decimals: u8) -> Result<Decimal, MoneyError> {
    if raw.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let mut value =
        Decimal::from_str(&raw.to_string()).map_err(|_| MoneyError::Unrepresentable)?;
    value
        .set_scale(decimals as u32)
        .map_err(|_| MoneyError::Unrepresentable)?;
    Ok(value)
}

/// Converts a human decimal amount into raw integer units, rounding to the
/// token's `decimals` precision (half-up) rather than truncating silently.
pub fn decimal_to_raw(amount: Decimal, decimals: u8) -> Result<BigUint, MoneyError> {
    if amount.is_sign_negative() {
        return Err(MoneyError::Negative);
    }
    let rounded = amount.round_dp(decimals as u32);
    let scale = rounded.scale();
    let mantissa = rounded.mantissa().unsigned_abs();
    let pad = decimals as u32 - scale;
    Ok(BigUint::from(mantissa) * BigUint::from(10u32).pow(pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_whole_units() {
        let raw = BigUint::from(1_000_000_000_000_000_000u128); // 1 token @ 18 decimals
        let human = raw_to_decimal(&raw, 18).unwrap();
        assert_eq!(human, Decimal::from_str("1").unwrap());
        assert_eq!(decimal_to_raw(human, 18).unwrap(), raw);
    }

    #[test]
    fn handles_fractional_usdc_amounts() {
        let raw = BigUint::from(1_500_000u64); // 1.5 USDC @ 6 decimals
        let human = raw_to_decimal(&raw, 6).unwrap();
        assert_eq!(human, Decimal::from_str("1.5").unwrap());
        assert_eq!(decimal_to_raw(human, 6).unwrap(), raw);
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(raw_to_decimal(&BigUint::zero(), 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn rejects_negative_decimal() {
        assert_eq!(
            decimal_to_raw(Decimal::from_str("-1").unwrap(), 18),
            Err(MoneyError::Negative)
        );
    }

    #[test]
    fn rounds_excess_precision_half_up() {
        let amount = Decimal::from_str("1.23456789").unwrap();
        let raw = decimal_to_raw(amount, 6).unwrap();
        assert_eq!(raw, BigUint::from(1_234_568u64));
    }
}
