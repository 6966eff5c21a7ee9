use num_bigint::BigUint;
use rust_decimal::Decimal;

use super::address::Address;
use super::decimal::{decimal_to_raw, raw_to_decimal, MoneyError};

/// (symbol, decimals, address). Identity is by address; decimals drive
/// human<->raw conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: String,
    pub decimals: u8,
    pub address: Address,
}

impl Token {
    pub fn new(symbol: impl Into<String>, decimals: u8, address: Address) -> Self {
        Token {
            symbol: symbol.into(),
            decimals,
            address,
        }
    }

    pub fn to_human(&self, raw: &BigUint) -> Result<Decimal, MoneyError> {
        raw_to_decimal(raw, self.decimals)
    }

    pub fn to_raw(&self, human: Decimal) -> Result<BigUint, MoneyError> {
        decimal_to_raw(human, self.decimals)
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn weth() -> Token {
        Token::new(
            "WETH",
            18,
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".parse().unwrap(),
        )
    }

    #[test]
    fn identity_is_by_address_not_symbol() {
        let a = weth();
        let b = Token::new("notweth", 18, a.address);
        assert_eq!(a.address, b.address);
    }

    #[test]
    fn human_raw_round_trip() {
        let t = weth();
        let human = Decimal::from_str("2.5").unwrap();
        let raw = t.to_raw(human).unwrap();
        assert_eq!(t.to_human(&raw).unwrap(), human);
    }
}
