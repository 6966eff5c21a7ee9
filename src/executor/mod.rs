pub mod circuit_breaker;
pub mod replay;
pub mod state_machine;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use replay::ReplayGuard;
pub use state_machine::{Executor, ExecutorConfig, ExecutorError, ExecutorState, ExecutionContext, LegFill, OrderingPolicy};
