use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::stats::{FleetStatsResponse, SessionCountResponse},
    services::public_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses((status = 200, description = "Fleet-wide load, possibly partial", body = FleetStatsResponse))
)]
/// Sum the load of every worker answering before the aggregation deadline.
pub async fn fleet_stats(State(state): State<SharedState>) -> Json<FleetStatsResponse> {
    Json(public_service::fleet_stats(&state).await)
}

#[utoipa::path(
    get,
    path = "/session-count",
    tag = "stats",
    responses((status = 200, description = "Running sessions", body = SessionCountResponse))
)]
/// Count the running sessions across the fleet.
pub async fn session_count(State(state): State<SharedState>) -> Json<SessionCountResponse> {
    Json(public_service::session_count(&state).await)
}

/// Configure the stats endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/stats", get(fleet_stats))
        .route("/session-count", get(session_count))
}
