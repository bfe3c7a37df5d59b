use serde::Serialize;
use utoipa::ToSchema;

use crate::services::stats::FleetStats;

/// Fleet-wide load. `partial` is set when some workers missed the deadline.
#[derive(Debug, Serialize, ToSchema)]
pub struct FleetStatsResponse {
    pub active_sessions: usize,
    pub active_players: usize,
    /// Workers included in the sums.
    pub responders: Vec<u32>,
    /// Workers that did not answer in time.
    pub missing_workers: Vec<u32>,
    pub partial: bool,
}

impl From<FleetStats> for FleetStatsResponse {
    fn from(stats: FleetStats) -> Self {
        Self {
            active_sessions: stats.totals.active_sessions,
            active_players: stats.totals.active_players,
            partial: stats.is_partial(),
            responders: stats.responders,
            missing_workers: stats.missing,
        }
    }
}

/// Number of running sessions across the fleet.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCountResponse {
    pub sessions: usize,
    pub partial: bool,
}
