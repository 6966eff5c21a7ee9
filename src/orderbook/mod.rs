pub mod analyzer;
pub mod model;

pub use analyzer::{AnalyzerError, OrderBookAnalyzer, WalkResult};
pub use model::{Level, NormalizedOrderBook, OrderBookError};
