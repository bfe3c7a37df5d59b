use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::sse::{
        HintRevealedEvent, RoundEndedEvent, RoundStartedEvent, ServerEvent, SessionEndedEvent,
        SessionStartedEvent, VoteProgressEvent,
    },
    state::sse::SseHub,
};

const EVENT_SESSION_STARTED: &str = "session.started";
const EVENT_ROUND_STARTED: &str = "round.started";
const EVENT_VOTE_PROGRESS: &str = "vote.progress";
const EVENT_HINT_REVEALED: &str = "round.hint";
const EVENT_ROUND_ENDED: &str = "round.ended";
const EVENT_SESSION_ENDED: &str = "session.ended";

/// Semantic notification emitted by the engine. Rendering is up to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A session was created.
    SessionStarted(SessionStartedEvent),
    /// A round opened.
    RoundStarted(RoundStartedEvent),
    /// A vote was counted without reaching quorum.
    VoteProgress(VoteProgressEvent),
    /// The hint of the round was revealed.
    HintRevealed(HintRevealedEvent),
    /// A round was scored.
    RoundEnded(RoundEndedEvent),
    /// A session ended.
    SessionEnded(SessionEndedEvent),
}

impl Notification {
    /// SSE event name of the notification.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::SessionStarted(_) => EVENT_SESSION_STARTED,
            Notification::RoundStarted(_) => EVENT_ROUND_STARTED,
            Notification::VoteProgress(_) => EVENT_VOTE_PROGRESS,
            Notification::HintRevealed(_) => EVENT_HINT_REVEALED,
            Notification::RoundEnded(_) => EVENT_ROUND_ENDED,
            Notification::SessionEnded(_) => EVENT_SESSION_ENDED,
        }
    }
}

/// Sink for engine notifications.
pub trait Outbox: Send + Sync {
    /// Deliver a notification. Must not block the caller.
    fn publish(&self, notification: Notification);
}

/// Outbox broadcasting JSON events on the SSE hub.
pub struct SseOutbox {
    hub: Arc<SseHub>,
}

impl SseOutbox {
    /// Outbox writing to `hub`.
    pub fn new(hub: Arc<SseHub>) -> Self {
        Self { hub }
    }

    fn send_event(&self, event: &str, payload: &impl Serialize) {
        match ServerEvent::json(Some(event.to_string()), payload) {
            Ok(server_event) => {
                let delivered = self.hub.publish(server_event);
                debug!(event, delivered, "notification published");
            }
            Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
        }
    }
}

impl Outbox for SseOutbox {
    fn publish(&self, notification: Notification) {
        let name = notification.name();
        match &notification {
            Notification::SessionStarted(payload) => self.send_event(name, payload),
            Notification::RoundStarted(payload) => self.send_event(name, payload),
            Notification::VoteProgress(payload) => self.send_event(name, payload),
            Notification::HintRevealed(payload) => self.send_event(name, payload),
            Notification::RoundEnded(payload) => self.send_event(name, payload),
            Notification::SessionEnded(payload) => self.send_event(name, payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::game::GameMode;

    #[tokio::test]
    async fn notifications_are_broadcast_as_named_json_events() {
        let hub = Arc::new(SseHub::new(8));
        let mut receiver = hub.subscribe();
        let outbox = SseOutbox::new(hub.clone());

        outbox.publish(Notification::SessionStarted(SessionStartedEvent {
            guild_id: "g1".into(),
            mode: GameMode::Teams,
            owner_id: "owner".into(),
            players: Vec::new(),
        }));
        let round_id = Uuid::new_v4();
        outbox.publish(Notification::HintRevealed(HintRevealedEvent {
            guild_id: "g1".into(),
            round_id,
            hint: "a__l_".into(),
        }));

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(EVENT_SESSION_STARTED));
        let payload: serde_json::Value = serde_json::from_str(&first.data).unwrap();
        assert_eq!(payload["mode"], "teams");

        let second = receiver.recv().await.unwrap();
        assert_eq!(second.event.as_deref(), Some(EVENT_HINT_REVEALED));
        let payload: serde_json::Value = serde_json::from_str(&second.data).unwrap();
        assert_eq!(payload["hint"], "a__l_");
        assert_eq!(payload["round_id"], round_id.to_string());
    }
}
