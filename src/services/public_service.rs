//! Read-only projections: session snapshots and fleet stats.

use crate::{
    dto::{
        session::SessionSnapshot,
        stats::{FleetStatsResponse, SessionCountResponse},
    },
    error::ServiceError,
    state::SharedState,
};

/// Snapshot of the session running in `guild_id`.
pub async fn session_snapshot(
    state: &SharedState,
    guild_id: String,
) -> Result<SessionSnapshot, ServiceError> {
    state
        .worker_for(&guild_id)
        .snapshot(guild_id.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no active session in guild {guild_id}")))
}

/// Fleet-wide load, summed over the workers that answered before the deadline.
pub async fn fleet_stats(state: &SharedState) -> FleetStatsResponse {
    state.stats().collect().await.into()
}

/// Number of sessions across the fleet.
pub async fn session_count(state: &SharedState) -> SessionCountResponse {
    let stats = state.stats().collect().await;
    SessionCountResponse {
        sessions: stats.totals.active_sessions,
        partial: stats.is_partial(),
    }
}
