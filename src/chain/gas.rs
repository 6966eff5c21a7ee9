use num_bigint::BigUint;
use num_traits::cast::ToPrimitive;
use rust_decimal::Decimal;

use crate::chain::rpc::GasPrice;

/// Converts a gas estimate into a USD cost given a native-token price,
/// generalized from the teacher's `estimate_eth_cost_usd`/`estimate_base_cost_usd`
/// (which hard-coded Ethereum L1 and the OP Stack L1-fee oracle) into a
/// single chain-agnostic helper driven by `ChainClient::get_gas_price`.
pub fn estimate_cost_usd(gas_price: &GasPrice, gas_units: u64, native_price_usd: Decimal) -> Decimal {
    let total_wei = &gas_price.base_fee * BigUint::from(gas_units);
    let wei_f64 = total_wei.to_f64().unwrap_or(f64::MAX);
    let total_native = Decimal::from_f64_retain(wei_f64 / 1e18).unwrap_or(Decimal::ZERO);
    total_native * native_price_usd
}

/// Builds a `GasPrice` from a flat gwei figure, used by the Signal Generator
/// when it has a configured gas price rather than a live `ChainClient` fetch.
pub fn gas_price_from_gwei(gwei: u64) -> GasPrice {
    let wei = BigUint::from(gwei) * BigUint::from(1_000_000_000u64);
    GasPrice {
        base_fee: wei.clone(),
        priority_low: wei.clone() / 4u8,
        priority_medium: wei.clone() / 2u8,
        priority_high: wei,
    }
}

/// Test-fixture gas price, following the teacher's own
/// `#[cfg(any(test, debug_assertions))] create_test_gas_estimate` pattern in
/// the original `chain/gas.rs`.
#[cfg(any(test, debug_assertions))]
pub fn create_test_gas_price(gwei: u64) -> GasPrice {
    gas_price_from_gwei(gwei)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_cost_for_round_numbers() {
        let gp = create_test_gas_price(50); // 50 gwei
        let cost = estimate_cost_usd(&gp, 100_000, Decimal::from(4000));
        // 50e9 wei/gas * 100_000 gas = 5e15 wei = 0.005 ETH * $4000 = $20
        assert!((cost - Decimal::from(20)).abs() < Decimal::new(1, 1));
    }

    #[test]
    fn zero_gas_units_is_zero_cost() {
        let gp = create_test_gas_price(50);
        assert_eq!(estimate_cost_usd(&gp, 0, Decimal::from(4000)), Decimal::ZERO);
    }
}
