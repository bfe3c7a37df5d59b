pub mod game;
pub mod presence;
pub mod registry;
pub mod round;
pub mod scoreboard;
pub mod session;
pub mod sse;
pub mod state_machine;
pub mod timer;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    dao::{catalog::InMemoryCatalog, preferences::InMemoryPreferenceStore},
    services::{
        fleet::WorkerFleet,
        outbox::SseOutbox,
        stats::StatsAggregator,
        worker::{WorkerDeps, WorkerHandle},
    },
};

pub use self::sse::SseHub;
use self::presence::PresenceTracker;

pub type SharedState = Arc<AppState>;

/// Central application state: worker fleet handles and the shared collaborators.
///
/// Session state itself lives inside the workers and is only reached through
/// their handles.
pub struct AppState {
    config: AppConfig,
    fleet: WorkerFleet,
    presence: Arc<PresenceTracker>,
    preferences: Arc<InMemoryPreferenceStore>,
    stats: StatsAggregator,
    sse: Arc<SseHub>,
}

impl AppState {
    /// Spawn the worker fleet described by `config` and wrap the state in an [`Arc`].
    pub fn new(config: AppConfig) -> SharedState {
        let sse = Arc::new(SseHub::new(config.sse_capacity));
        let presence = Arc::new(PresenceTracker::new());
        let preferences = Arc::new(InMemoryPreferenceStore::new(config.preferences.clone()));
        let deps = WorkerDeps {
            presence: presence.clone(),
            preferences: preferences.clone(),
            songs: Arc::new(InMemoryCatalog::new(config.catalog.clone())),
            outbox: Arc::new(SseOutbox::new(sse.clone())),
        };
        let fleet = WorkerFleet::spawn(config.worker_count, deps);
        let stats = StatsAggregator::new(Arc::new(fleet.clone()), config.aggregation_deadline);

        Arc::new(Self {
            config,
            fleet,
            presence,
            preferences,
            stats,
            sse,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// All workers.
    pub fn fleet(&self) -> &WorkerFleet {
        &self.fleet
    }

    /// Worker owning the sessions of `guild_id`.
    pub fn worker_for(&self, guild_id: &str) -> &WorkerHandle {
        self.fleet.for_guild(guild_id)
    }

    /// Voice presence fed by the gateway.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Per-guild preferences.
    pub fn preferences(&self) -> &InMemoryPreferenceStore {
        &self.preferences
    }

    /// Fleet-wide stats aggregation.
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }
}
