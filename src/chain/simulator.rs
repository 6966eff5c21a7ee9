use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amm::Route;
use crate::money::Address;

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("HTTP error talking to fork simulator: {0}")]
    Http(String),
    #[error("simulation reverted: {0}")]
    Reverted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationResult {
    pub success: bool,
    pub amount_out: BigUint,
    pub gas_used: u64,
    pub error: Option<String>,
}

/// The fork simulator RPC surface the core consumes. Generalized from the
/// teacher's `chain/across_fees.rs::get_across_relay_fee` (plain
/// `reqwest` POST + JSON response) onto the route-simulation contract
/// spec.md §6 names.
#[async_trait]
pub trait ForkSimulator: Send + Sync {
    async fn simulate_route(
        &self,
        route: &Route,
        amount_in: &BigUint,
        sender: Address,
    ) -> Result<SimulationResult, SimulatorError>;

    /// Funds and approves `sender` as needed, using configured funder
    /// addresses, so `simulate_route` can run against a clean fork state.
    async fn ensure_sender_ready(&self, route: &Route, amount_in: &BigUint, sender: Address) -> Result<(), SimulatorError>;
}

#[derive(Debug, Serialize)]
struct SimulateRouteRequest {
    pools: Vec<String>,
    path: Vec<String>,
    amount_in: String,
    sender: String,
}

#[derive(Debug, Deserialize)]
struct SimulateRouteResponse {
    success: bool,
    amount_out: String,
    gas_used: u64,
    error: Option<String>,
}

pub struct LiveForkSimulator {
    client: reqwest::Client,
    base_url: String,
}

impl LiveForkSimulator {
    pub fn new(base_url: impl Into<String>) -> Self {
        LiveForkSimulator {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ForkSimulator for LiveForkSimulator {
    async fn simulate_route(
        &self,
        route: &Route,
        amount_in: &BigUint,
        sender: Address,
    ) -> Result<SimulationResult, SimulatorError> {
        let body = SimulateRouteRequest {
            pools: route.pools.iter().map(|a| a.checksummed()).collect(),
            path: route.path.iter().map(|a| a.checksummed()).collect(),
            amount_in: amount_in.to_string(),
            sender: sender.checksummed(),
        };
        let response: SimulateRouteResponse = self
            .client
            .post(format!("{}/simulate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SimulatorError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| SimulatorError::Http(e.to_string()))?;

        let amount_out = response
            .amount_out
            .parse()
            .map_err(|_| SimulatorError::Http("non-numeric amount_out in simulator response".to_string()))?;

        Ok(SimulationResult {
            success: response.success,
            amount_out,
            gas_used: response.gas_used,
            error: response.error,
        })
    }

    async fn ensure_sender_ready(&self, route: &Route, amount_in: &BigUint, sender: Address) -> Result<(), SimulatorError> {
        let body = SimulateRouteRequest {
            pools: route.pools.iter().map(|a| a.checksummed()).collect(),
            path: route.path.iter().map(|a| a.checksummed()).collect(),
            amount_in: amount_in.to_string(),
            sender: sender.checksummed(),
        };
        self.client
            .post(format!("{}/ensure-ready", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SimulatorError::Http(e.to_string()))?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    pub struct MockForkSimulator {
        pub next_result: Mutex<SimulationResult>,
    }

    impl MockForkSimulator {
        pub fn succeeding(amount_out: BigUint) -> Self {
            MockForkSimulator {
                next_result: Mutex::new(SimulationResult {
                    success: true,
                    amount_out,
                    gas_used: 150_000,
                    error: None,
                }),
            }
        }

        pub fn failing(reason: &str) -> Self {
            MockForkSimulator {
                next_result: Mutex::new(SimulationResult {
                    success: false,
                    amount_out: BigUint::from(0u32),
                    gas_used: 0,
                    error: Some(reason.to_string()),
                }),
            }
        }

        pub fn set_next(&self, result: SimulationResult) {
            *self.next_result.lock().unwrap() = result;
        }
    }

    #[async_trait]
    impl ForkSimulator for MockForkSimulator {
        async fn simulate_route(
            &self,
            _route: &Route,
            _amount_in: &BigUint,
            _sender: Address,
        ) -> Result<SimulationResult, SimulatorError> {
            Ok(self.next_result.lock().unwrap().clone())
        }

        async fn ensure_sender_ready(&self, _route: &Route, _amount_in: &BigUint, _sender: Address) -> Result<(), SimulatorError> {
            Ok(())
        }
    }
}
