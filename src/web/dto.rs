use rocket::serde::Serialize;

/// Operator-facing snapshot of `OrchestratorStatus`, serialized as the
/// `/status` response. Field names are decimal strings rather than `f64`
/// since the core is decimal throughout (spec.md §9 "Decimal vs integer
/// boundaries") and JSON floats would reintroduce drift on the wire.
#[derive(Serialize)]
pub struct StatusResponse {
    pub production: bool,
    pub tracked_pairs: Vec<String>,
    pub tracked_pool_count: usize,
    pub current_capital_usd: String,
    pub peak_capital_usd: String,
    pub daily_loss_usd: String,
    pub consecutive_losses: u32,
    pub kill_switch_path: String,
    pub kill_switch_tripped: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
