//! Fleet-wide load aggregation with a reply deadline.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    time::{Instant, timeout_at},
};
use tracing::{debug, warn};

use crate::{services::worker::WorkerId, state::registry::WorkerStats};

/// How long the aggregator waits for worker replies.
pub const AGGREGATION_DEADLINE: Duration = Duration::from_millis(5000);

/// Stats request broadcast to every worker. Carries no parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsRequest;

/// One worker's answer to a [`StatsRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReply {
    /// Worker that answered.
    pub worker_id: WorkerId,
    /// Its local counts.
    pub stats: WorkerStats,
}

/// Broadcast/collect primitive over the worker fleet.
pub trait FleetTransport: Send + Sync {
    /// Workers expected to answer.
    fn worker_ids(&self) -> Vec<WorkerId>;
    /// Send `request` to every worker; replies arrive on the returned channel.
    fn broadcast(&self, request: StatsRequest) -> mpsc::Receiver<WorkerReply>;
}

/// Aggregated load, possibly partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetStats {
    /// Sum over the workers that answered in time.
    pub totals: WorkerStats,
    /// Workers that answered, ascending.
    pub responders: Vec<WorkerId>,
    /// Workers that did not answer before the deadline, ascending.
    pub missing: Vec<WorkerId>,
}

impl FleetStats {
    /// Whether some workers are missing from the sum.
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Sums worker stats received before a deadline.
#[derive(Clone)]
pub struct StatsAggregator {
    transport: Arc<dyn FleetTransport>,
    deadline: Duration,
}

impl StatsAggregator {
    /// Aggregator waiting at most `deadline` for replies.
    pub fn new(transport: Arc<dyn FleetTransport>, deadline: Duration) -> Self {
        Self {
            transport,
            deadline,
        }
    }

    /// Broadcast a stats request and sum the replies received before the deadline.
    ///
    /// Missing workers never fail the call: they are listed in the result and logged.
    pub async fn collect(&self) -> FleetStats {
        let expected: BTreeSet<WorkerId> = self.transport.worker_ids().into_iter().collect();
        let mut replies = self.transport.broadcast(StatsRequest);
        let deadline = Instant::now() + self.deadline;

        let mut seen = BTreeSet::new();
        let mut totals = WorkerStats::default();
        while seen.len() < expected.len() {
            match timeout_at(deadline, replies.recv()).await {
                Ok(Some(reply)) => {
                    if !expected.contains(&reply.worker_id) || !seen.insert(reply.worker_id) {
                        debug!(worker_id = reply.worker_id, "unexpected stats reply ignored");
                        continue;
                    }
                    totals += reply.stats;
                }
                // Deadline elapsed, or every sender is gone.
                Ok(None) | Err(_) => break,
            }
        }

        let missing: Vec<WorkerId> = expected.difference(&seen).copied().collect();
        if !missing.is_empty() {
            warn!(
                ?missing,
                responders = seen.len(),
                "stats aggregation returned a partial sum"
            );
        }

        FleetStats {
            totals,
            responders: seen.into_iter().collect(),
            missing,
        }
    }
}
