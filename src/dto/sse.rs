use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    services::consensus::VoteTally,
    state::{
        game::{GameMode, RankedGuess, RoundOutcome, SessionEndReason, VoteAction},
        scoreboard::ScoreboardField,
        session::{RoundSummary, SessionSummary, Streak},
    },
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name.
    pub event: Option<String>,
    /// Serialised payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Emitted when a session is created.
pub struct SessionStartedEvent {
    pub guild_id: String,
    pub mode: GameMode,
    pub owner_id: String,
    /// Players enrolled at creation.
    pub players: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Emitted when a round opens.
pub struct RoundStartedEvent {
    pub guild_id: String,
    pub round_id: Uuid,
    /// 1-based ordinal of the round.
    pub round_number: u32,
    /// Guess timeout, when one is configured.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Emitted after a counted vote that did not reach quorum.
pub struct VoteProgressEvent {
    pub guild_id: String,
    pub round_id: Uuid,
    pub action: VoteAction,
    pub current: usize,
    pub quorum: usize,
}

impl VoteProgressEvent {
    /// Progress of `action` from a tally.
    pub fn new(guild_id: &str, round_id: Uuid, action: VoteAction, tally: VoteTally) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            round_id,
            action,
            current: tally.current,
            quorum: tally.quorum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Emitted when the hint quorum is reached.
pub struct HintRevealedEvent {
    pub guild_id: String,
    pub round_id: Uuid,
    pub hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// How a round ended, as seen by clients.
pub enum RoundOutcomeKind {
    Guessed,
    Unanswered,
    Skipped,
    ForceSkipped,
    TimedOut,
}

impl From<&RoundOutcome> for RoundOutcomeKind {
    fn from(outcome: &RoundOutcome) -> Self {
        match outcome {
            RoundOutcome::Guessed(_) => RoundOutcomeKind::Guessed,
            RoundOutcome::Unanswered => RoundOutcomeKind::Unanswered,
            RoundOutcome::Skipped { forced: false } => RoundOutcomeKind::Skipped,
            RoundOutcome::Skipped { forced: true } => RoundOutcomeKind::ForceSkipped,
            RoundOutcome::TimedOut => RoundOutcomeKind::TimedOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// A ranked correct guess.
pub struct GuesserSummary {
    pub player_id: String,
    pub elapsed_ms: u64,
    pub points: f64,
}

impl From<&RankedGuess> for GuesserSummary {
    fn from(guess: &RankedGuess) -> Self {
        Self {
            player_id: guess.player_id.clone(),
            elapsed_ms: guess.elapsed.as_millis() as u64,
            points: guess.points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Consecutive rounds won by the same player.
pub struct StreakSummary {
    pub player_id: String,
    pub rounds: u32,
}

impl From<Streak> for StreakSummary {
    fn from(streak: Streak) -> Self {
        Self {
            player_id: streak.player_id,
            rounds: streak.rounds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Emitted once per round when it is scored.
pub struct RoundEndedEvent {
    pub guild_id: String,
    pub round_id: Uuid,
    pub round_number: u32,
    pub outcome: RoundOutcomeKind,
    /// Canonical answer of the round.
    pub answer: String,
    pub guessers: Vec<GuesserSummary>,
    /// Players who lost their last life this round.
    pub eliminated: Vec<String>,
    pub streak: Option<StreakSummary>,
    pub scoreboard: Vec<ScoreboardField>,
}

impl RoundEndedEvent {
    /// Event for a finished round with the scoreboard as it stands after scoring.
    pub fn new(guild_id: &str, summary: RoundSummary, scoreboard: Vec<ScoreboardField>) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            round_id: summary.round_id,
            round_number: summary.round_number,
            outcome: RoundOutcomeKind::from(&summary.outcome),
            answer: summary.answer,
            guessers: summary
                .outcome
                .ranked_winners()
                .iter()
                .map(GuesserSummary::from)
                .collect(),
            eliminated: summary.eliminated,
            streak: summary.streak.map(StreakSummary::from),
            scoreboard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
/// Emitted once when a session ends, with the final scoreboard.
pub struct SessionEndedEvent {
    pub guild_id: String,
    pub mode: GameMode,
    pub reason: SessionEndReason,
    pub rounds_played: u32,
    pub correct_guesses: u32,
    pub average_guess_time_ms: Option<u64>,
    pub duration_ms: u64,
    pub winners: Vec<String>,
    pub scoreboard: Vec<ScoreboardField>,
}

impl From<SessionSummary> for SessionEndedEvent {
    fn from(summary: SessionSummary) -> Self {
        Self {
            guild_id: summary.guild_id,
            mode: summary.mode,
            reason: summary.reason,
            rounds_played: summary.rounds_played,
            correct_guesses: summary.correct_guesses,
            average_guess_time_ms: summary
                .average_guess_time
                .map(|duration| duration.as_millis() as u64),
            duration_ms: summary.duration.as_millis() as u64,
            winners: summary.winners,
            scoreboard: summary.scoreboard,
        }
    }
}
