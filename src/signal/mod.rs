pub mod gates;
pub mod generator;
pub mod scorer;
pub mod types;

pub use gates::{GateError, PretradeValidator, RiskLimits, RiskManager, RiskState, SafetyCheck, run_gates};
pub use generator::{GeneratorConfig, SignalError, SignalGenerator};
pub use scorer::{ScoreWeights, Scorer};
pub use types::{Direction, Economics, Market, Signal};
