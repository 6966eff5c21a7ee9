use chrono::{DateTime, Utc};
use num_bigint::BigUint;

use crate::amm::Route;

/// `(route, amount_in, expected_output, simulated_output, gas_used, timestamp)`.
/// A Quote is `valid` iff `|expected - simulated| * 1000 < expected` (<=0.1% drift).
#[derive(Debug, Clone)]
pub struct Quote {
    pub route: Route,
    pub amount_in: BigUint,
    pub expected_output: BigUint,
    pub simulated_output: BigUint,
    pub gas_used: u64,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn is_valid(&self) -> bool {
        if self.expected_output == BigUint::from(0u32) {
            return false;
        }
        let diff = if self.expected_output >= self.simulated_output {
            &self.expected_output - &self.simulated_output
        } else {
            &self.simulated_output - &self.expected_output
        };
        diff * BigUint::from(1000u32) < self.expected_output
    }
}
