use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Workers in the fleet.
    pub workers: usize,
    /// Workers whose event loop stopped.
    pub stopped_workers: Vec<u32>,
}

impl HealthResponse {
    /// Every worker is processing events.
    pub fn ok(workers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            workers,
            stopped_workers: Vec::new(),
        }
    }

    /// Some workers stopped; their guilds cannot be served.
    pub fn degraded(workers: usize, stopped_workers: Vec<u32>) -> Self {
        Self {
            status: "degraded".to_string(),
            workers,
            stopped_workers,
        }
    }
}
