use serde::Serialize;
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        game::{GameMode, VoteAction},
        round::Round,
        scoreboard::ScoreboardField,
        session::GameSession,
        state_machine::SessionPhase,
    },
};

/// Read-only view of a session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub guild_id: String,
    pub mode: GameMode,
    pub owner_id: String,
    pub phase: SessionPhase,
    /// Number of lifecycle transitions applied so far.
    pub version: usize,
    pub initialized: bool,
    pub rounds_played: u32,
    /// RFC 3339 timestamp of the last participant interaction.
    pub last_active_at: String,
    /// Current or last round.
    pub round: Option<RoundSnapshot>,
    pub scoreboard: Vec<ScoreboardField>,
}

/// Read-only view of a round. The answer is never exposed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSnapshot {
    pub round_id: Uuid,
    pub finished: bool,
    pub skip_achieved: bool,
    pub skip_votes: usize,
    pub hint_votes: usize,
    /// Hint text once revealed.
    pub hint: Option<String>,
    /// Correct guessers in arrival order.
    pub correct_guessers: Vec<String>,
    pub elapsed_ms: u64,
    /// Time left before the guess timer fires, when one is armed.
    pub remaining_ms: Option<u64>,
}

impl From<&Round> for RoundSnapshot {
    fn from(round: &Round) -> Self {
        Self {
            round_id: round.id(),
            finished: round.is_finished(),
            skip_achieved: round.skip_achieved(),
            skip_votes: round.votes(VoteAction::Skip).len(),
            hint_votes: round.votes(VoteAction::Hint).len(),
            hint: round.revealed_hint().map(str::to_string),
            correct_guessers: round
                .correct_guessers()
                .iter()
                .map(|guess| guess.player_id.clone())
                .collect(),
            elapsed_ms: round.started_at().elapsed().as_millis() as u64,
            remaining_ms: round.timeout_at().map(|deadline| {
                deadline
                    .saturating_duration_since(Instant::now())
                    .as_millis() as u64
            }),
        }
    }
}

impl From<&GameSession> for SessionSnapshot {
    fn from(session: &GameSession) -> Self {
        Self {
            guild_id: session.guild_id().to_string(),
            mode: session.mode(),
            owner_id: session.owner().to_string(),
            phase: session.phase(),
            version: session.version(),
            initialized: session.is_initialized(),
            rounds_played: session.rounds_played(),
            last_active_at: format_system_time(session.last_active_at()),
            round: session.round().map(RoundSnapshot::from),
            scoreboard: session.scoreboard().embed_fields(),
        }
    }
}
