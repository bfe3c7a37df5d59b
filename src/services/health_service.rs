use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the fleet health, logging stopped workers.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let workers = state.fleet().len();
    let stopped = state.fleet().stopped_workers();
    if stopped.is_empty() {
        HealthResponse::ok(workers)
    } else {
        warn!(?stopped, "some workers stopped (degraded mode)");
        HealthResponse::degraded(workers, stopped)
    }
}
