use tokio::time::Instant;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle phases of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Session created, first round not started yet.
    Idle,
    /// A round is accepting guesses and votes.
    RoundActive,
    /// The last round was scored; the next one is being prepared.
    RoundEnding,
    /// Terminal state.
    Ended,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new round begins with a freshly selected answer set.
    StartRound,
    /// The current round is over.
    EndRound,
    /// The session is torn down.
    EndSession,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A transition validated up front and applied once its asynchronous work completes.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<SessionPhase>,
}

/// Round lifecycle of a single session.
///
/// Starting a round is two-phase: [`plan`](Self::plan) reserves the transition while
/// the answer set is fetched, [`apply`](Self::apply) commits it and
/// [`abort`](Self::abort) drops it. Ending a round or the session is immediate.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Identifier of the pending plan, if any.
    pub fn pending_id(&self) -> Option<PlanId> {
        self.pending.as_ref().map(|plan| plan.id)
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        self.phase = plan.to;
        self.version += 1;

        Ok(self.phase)
    }

    /// Drop a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), ApplyError> {
        let plan = self.pending.as_ref().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            return Err(ApplyError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Apply a transition immediately. Ending the session discards any pending plan.
    pub fn fire(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if next == SessionPhase::Ended {
            self.pending = None;
        }
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Idle | SessionPhase::RoundEnding, SessionEvent::StartRound) => {
                SessionPhase::RoundActive
            }
            (SessionPhase::RoundActive, SessionEvent::EndRound) => SessionPhase::RoundEnding,
            (from, SessionEvent::EndSession) if from != SessionPhase::Ended => SessionPhase::Ended,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_round(sm: &mut SessionStateMachine) -> SessionPhase {
        let plan = sm.plan(SessionEvent::StartRound).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Idle);
        assert_eq!(sm.snapshot().version, 0);
    }

    #[test]
    fn full_happy_path_through_session() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(start_round(&mut sm), SessionPhase::RoundActive);
        assert_eq!(sm.fire(SessionEvent::EndRound), Ok(SessionPhase::RoundEnding));
        assert_eq!(start_round(&mut sm), SessionPhase::RoundActive);
        assert_eq!(sm.fire(SessionEvent::EndRound), Ok(SessionPhase::RoundEnding));
        assert_eq!(sm.fire(SessionEvent::EndSession), Ok(SessionPhase::Ended));
        assert_eq!(sm.snapshot().version, 5);
    }

    #[test]
    fn ending_a_round_twice_is_rejected() {
        let mut sm = SessionStateMachine::new();
        start_round(&mut sm);
        sm.fire(SessionEvent::EndRound).unwrap();

        let err = sm.fire(SessionEvent::EndRound).unwrap_err();
        assert_eq!(err.from, SessionPhase::RoundEnding);
        assert_eq!(err.event, SessionEvent::EndRound);
    }

    #[test]
    fn end_round_without_round_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let err = sm.fire(SessionEvent::EndRound).unwrap_err();
        assert_eq!(err.from, SessionPhase::Idle);
    }

    #[test]
    fn round_cannot_start_while_active() {
        let mut sm = SessionStateMachine::new();
        start_round(&mut sm);
        match sm.plan(SessionEvent::StartRound).unwrap_err() {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, SessionPhase::RoundActive);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn only_one_round_start_can_be_pending() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::StartRound).unwrap();
        assert_eq!(sm.snapshot().pending, Some(SessionPhase::RoundActive));
        assert_eq!(sm.pending_id(), Some(plan.id));
        assert_eq!(
            sm.plan(SessionEvent::StartRound).unwrap_err(),
            PlanError::AlreadyPending
        );
    }

    #[test]
    fn stale_plan_id_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::StartRound).unwrap();
        let stale = Uuid::new_v4();
        match sm.apply(stale) {
            Err(ApplyError::IdMismatch { expected, got }) => {
                assert_eq!(expected, plan.id);
                assert_eq!(got, stale);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sm.apply(plan.id), Ok(SessionPhase::RoundActive));
        assert_eq!(sm.apply(plan.id), Err(ApplyError::NoPending));
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::StartRound).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.pending.is_none());
        assert_eq!(sm.phase(), SessionPhase::Idle);
    }

    #[test]
    fn end_session_is_valid_from_any_live_phase_and_drops_pending() {
        let mut sm = SessionStateMachine::new();
        sm.plan(SessionEvent::StartRound).unwrap();
        assert_eq!(sm.fire(SessionEvent::EndSession), Ok(SessionPhase::Ended));
        assert!(sm.pending_id().is_none());
        assert!(sm.fire(SessionEvent::EndSession).is_err());
        assert!(sm.plan(SessionEvent::StartRound).is_err());
    }
}
