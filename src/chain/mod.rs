pub mod exchange;
pub mod gas;
pub mod mempool;
pub mod providers;
pub mod rpc;
pub mod simulator;

pub use exchange::{ExchangeClient, ExchangeClientError, LiveExchangeClient};
pub use mempool::{MempoolError, MempoolStream, ParsedSwap};
pub use rpc::{ChainClient, ChainClientError, LiveChainClient};
pub use simulator::{ForkSimulator, LiveForkSimulator, SimulatorError};
