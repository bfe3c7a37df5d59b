use std::hash::{DefaultHasher, Hash, Hasher};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::services::{
    stats::{FleetTransport, StatsRequest, WorkerReply},
    worker::{Worker, WorkerDeps, WorkerHandle, WorkerId},
};

/// In-process worker fleet. Each guild is owned by exactly one worker.
#[derive(Debug, Clone)]
pub struct WorkerFleet {
    workers: Vec<WorkerHandle>,
}

impl WorkerFleet {
    /// Spawn `count` workers (at least one) sharing `deps`.
    pub fn spawn(count: u32, deps: WorkerDeps) -> Self {
        let count = count.max(1);
        let workers = (0..count)
            .map(|id| Worker::spawn(id, deps.clone()))
            .collect();
        info!(workers = count, "worker fleet started");
        Self { workers }
    }

    /// Worker owning `guild_id`.
    ///
    /// Numeric platform ids are sharded on their timestamp bits, other ids by hash.
    pub fn for_guild(&self, guild_id: &str) -> &WorkerHandle {
        let count = self.workers.len() as u64;
        let key = match guild_id.parse::<u64>() {
            Ok(snowflake) => snowflake >> 22,
            Err(_) => {
                let mut hasher = DefaultHasher::new();
                guild_id.hash(&mut hasher);
                hasher.finish()
            }
        };
        &self.workers[(key % count) as usize]
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Always `false`: a fleet has at least one worker.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Workers whose loop stopped.
    pub fn stopped_workers(&self) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|worker| !worker.is_running())
            .map(WorkerHandle::id)
            .collect()
    }
}

impl FleetTransport for WorkerFleet {
    fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(WorkerHandle::id).collect()
    }

    fn broadcast(&self, request: StatsRequest) -> mpsc::Receiver<WorkerReply> {
        let (tx, rx) = mpsc::channel(self.workers.len());
        debug!(?request, workers = self.workers.len(), "broadcasting stats request");
        for worker in self.workers.iter().cloned() {
            let tx = tx.clone();
            tokio::spawn(async move {
                match worker.stats().await {
                    Ok(stats) => {
                        let _ = tx
                            .send(WorkerReply {
                                worker_id: worker.id(),
                                stats,
                            })
                            .await;
                    }
                    Err(err) => debug!(worker_id = worker.id(), error = %err, "no stats reply"),
                }
            });
        }
        rx
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::{
            catalog::{CatalogSong, InMemoryCatalog},
            preferences::InMemoryPreferenceStore,
        },
        services::{
            outbox::SseOutbox,
            stats::{AGGREGATION_DEADLINE, StatsAggregator},
        },
        state::{game::GameMode, presence::PresenceTracker, sse::SseHub},
    };

    fn fleet(count: u32, presence: Arc<PresenceTracker>) -> WorkerFleet {
        let deps = WorkerDeps {
            presence,
            preferences: Arc::new(InMemoryPreferenceStore::default()),
            songs: Arc::new(InMemoryCatalog::new(vec![CatalogSong {
                name: "Apple".into(),
                aliases: Vec::new(),
            }])),
            outbox: Arc::new(SseOutbox::new(Arc::new(SseHub::new(16)))),
        };
        WorkerFleet::spawn(count, deps)
    }

    #[tokio::test]
    async fn guild_routing_is_stable() {
        let fleet = fleet(4, Arc::new(PresenceTracker::new()));
        let guild = "80351110224678912";
        let owner = fleet.for_guild(guild).id();
        assert_eq!(owner, ((80351110224678912u64 >> 22) % 4) as u32);
        assert_eq!(fleet.for_guild(guild).id(), owner);
        assert_eq!(
            fleet.for_guild("guild-a").id(),
            fleet.for_guild("guild-a").id()
        );
    }

    #[tokio::test]
    async fn zero_workers_still_spawns_one() {
        let fleet = fleet(0, Arc::new(PresenceTracker::new()));
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.for_guild("anything").id(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn aggregator_sums_sessions_across_workers() {
        let presence = Arc::new(PresenceTracker::new());
        for (guild, player) in [("1", "p1"), ("1", "p2"), ("guild-b", "p3")] {
            presence.join(guild, player, false);
        }
        let fleet = fleet(3, presence);
        for guild in ["1", "guild-b"] {
            fleet
                .for_guild(guild)
                .start_session(guild.into(), "owner".into(), GameMode::Classic, None)
                .await
                .unwrap();
        }

        let stats = StatsAggregator::new(Arc::new(fleet.clone()), AGGREGATION_DEADLINE)
            .collect()
            .await;
        assert!(!stats.is_partial());
        assert_eq!(stats.responders, vec![0, 1, 2]);
        assert_eq!(stats.totals.active_sessions, 2);
        assert_eq!(stats.totals.active_players, 3);
        assert!(fleet.stopped_workers().is_empty());
    }
}
