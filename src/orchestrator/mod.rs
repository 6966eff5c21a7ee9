pub mod loop_;

pub use loop_::{Orchestrator, OrchestratorConfig, OrchestratorStatus, TickOutcome, TrackedPair};
