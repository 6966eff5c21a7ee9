use std::sync::Arc;

use chrono::Utc;
use rocket::{launch, routes};

use meridian_arb::bootstrap::AppState;
use meridian_arb::config;
use meridian_arb::orchestrator::TickOutcome;
use meridian_arb::web::routes::{health, metrics, status};

/// Drives orchestrator ticks on a dedicated task, re-acquiring the mutex
/// each iteration so the Rocket reporting routes can interleave a `status`
/// read between ticks rather than blocking for the process lifetime.
async fn run_orchestrator_loop(app_state: Arc<AppState>) {
    loop {
        let outcome = { app_state.orchestrator.lock().await.tick(Utc::now()).await };
        let sleep_for = match outcome {
            TickOutcome::Stopped(reason) => {
                log::warn!("orchestrator stopping: {reason}");
                break;
            }
            TickOutcome::Completed => app_state.config.tick_interval_secs,
            TickOutcome::CompletedWithErrors => app_state.config.error_backoff_secs,
        };
        tokio::time::sleep(std::time::Duration::from_secs(sleep_for.max(0) as u64)).await;
    }
}

#[launch]
async fn rocket() -> _ {
    env_logger::init();

    let config = config::Config::from_env().expect("Failed to load configuration");

    let app_state = Arc::new(
        AppState::new(config)
            .await
            .expect("Failed to initialize application state"),
    );

    tokio::spawn(run_orchestrator_loop(app_state.clone()));

    let figment = rocket::Config::figment()
        .merge(("port", app_state.config.port))
        .merge(("address", "0.0.0.0"));

    rocket::custom(figment).manage(app_state).mount("/", routes![status, health, metrics])
}
