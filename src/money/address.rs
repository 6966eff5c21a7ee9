use std::fmt;
use std::str::FromStr;

use ethers::types::Address as EthersAddress;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid address: {0}")]
    Invalid(String),
}

/// A 20-byte identifier normalized to its EIP-55 mixed-case checksum form.
///
/// Equality and hashing operate on the raw bytes, so two addresses that
/// differ only in letter casing compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(EthersAddress);

impl Address {
    pub fn from_raw(inner: EthersAddress) -> Self {
        Address(inner)
    }

    pub fn as_ethers(&self) -> EthersAddress {
        self.0
    }

    /// EIP-55 checksummed representation, e.g. `0xAbC...`.
    pub fn checksummed(&self) -> String {
        to_checksum(&self.0, None)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EthersAddress::from_str(s)
            .map(Address)
            .map_err(|e| AddressError::Invalid(format!("{s}: {e}")))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.checksummed()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.checksummed())
    }
}
