use std::path::Path;
use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::{get, State};

use crate::bootstrap::AppState;
use crate::web::dto::{HealthResponse, StatusResponse};

/// Point-in-time view of the orchestrator, grounded on the teacher's
/// `/api/v1/arbitrage-opportunity` read-only reporting handler shape but
/// reporting the engine's own state rather than re-deriving a quote inline.
#[get("/status")]
pub async fn status(app_state: &State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = app_state.orchestrator.lock().await.status();
    Json(StatusResponse {
        production: app_state.config.production,
        tracked_pairs: snapshot.tracked_pairs,
        tracked_pool_count: snapshot.tracked_pool_count,
        current_capital_usd: snapshot.current_capital_usd.to_string(),
        peak_capital_usd: snapshot.peak_capital_usd.to_string(),
        daily_loss_usd: snapshot.daily_loss_usd.to_string(),
        consecutive_losses: snapshot.consecutive_losses,
        kill_switch_tripped: Path::new(&snapshot.kill_switch_path).exists(),
        kill_switch_path: snapshot.kill_switch_path,
    })
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Minimal Prometheus text-exposition of the same numbers `status` reports.
/// A real deployment would reach for the `prometheus` crate's registry;
/// spec.md §1 explicitly scopes metrics/observability infrastructure out,
/// so this stays a plain formatted dump rather than growing a dependency.
#[get("/metrics")]
pub async fn metrics(app_state: &State<Arc<AppState>>) -> String {
    let snapshot = app_state.orchestrator.lock().await.status();
    format!(
        "# TYPE meridian_arb_tracked_pools gauge\n\
         meridian_arb_tracked_pools {}\n\
         # TYPE meridian_arb_tracked_pairs gauge\n\
         meridian_arb_tracked_pairs {}\n\
         # TYPE meridian_arb_current_capital_usd gauge\n\
         meridian_arb_current_capital_usd {}\n\
         # TYPE meridian_arb_peak_capital_usd gauge\n\
         meridian_arb_peak_capital_usd {}\n\
         # TYPE meridian_arb_daily_loss_usd gauge\n\
         meridian_arb_daily_loss_usd {}\n\
         # TYPE meridian_arb_consecutive_losses gauge\n\
         meridian_arb_consecutive_losses {}\n",
        snapshot.tracked_pool_count,
        snapshot.tracked_pairs.len(),
        snapshot.current_capital_usd,
        snapshot.peak_capital_usd,
        snapshot.daily_loss_usd,
        snapshot.consecutive_losses,
    )
}
