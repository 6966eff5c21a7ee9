pub mod engine;
pub mod quote;

pub use engine::{LivePoolSource, PoolSource, PricingEngine, PricingError};
pub use quote::Quote;
