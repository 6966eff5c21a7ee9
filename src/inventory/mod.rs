pub mod tracker;

pub use tracker::{Balance, ExecutionVerdict, InventoryError, InventoryTracker, RebalancePlan, SkewReport, TradeSide};
