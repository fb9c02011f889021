//! Liveness handler.

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use axum::Json;
use pawtograder_github::InstallationRegistry;

use crate::handler::response::MonitorStatus;
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "pawtograder_server::handler::monitors";

/// Reports liveness and the number of installations loaded at startup.
async fn health_status(State(installations): State<InstallationRegistry>) -> Json<MonitorStatus> {
    tracing::trace!(
        target: TRACING_TARGET,
        installations = installations.len(),
        "Health status check requested"
    );

    Json(MonitorStatus::new(installations.len()))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}
