use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque identifier of the guild (server) owning a session.
pub type GuildId = String;
/// Opaque identifier of a participant.
pub type PlayerId = String;
/// Display name of a team, unique within a session.
pub type TeamName = String;
/// Unique identifier of a round, used to discard stale timer callbacks.
pub type RoundId = Uuid;

/// Points awarded to the first correct guesser of a round.
pub const BASE_POINTS: f64 = 1.0;

/// Competitive mode a session is started in. Fixed for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Free-for-all points.
    Classic,
    /// Players join named teams; teams accumulate points.
    Teams,
    /// Every player starts with lives; losing a round costs one.
    Elimination,
    /// Guesses are collected silently until everyone has answered.
    Hidden,
    /// Moderated play where only the session owner drives cooperative actions.
    Competition,
}

impl GameMode {
    /// Whether a correct guess may open a grace window for later guessers.
    pub fn supports_multiguess(self) -> bool {
        !matches!(self, GameMode::Hidden)
    }
}

/// Answer set returned by the song selection collaborator for a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet {
    /// Canonical name of the clip being played.
    pub primary_name: String,
    /// Alternative accepted names.
    pub aliases: Vec<String>,
}

impl AnswerSet {
    /// Build an answer set from a primary name and its aliases.
    pub fn new(primary_name: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            primary_name: primary_name.into(),
            aliases,
        }
    }
}

/// Cooperative action decided by majority vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    /// Skip the current round.
    Skip,
    /// Reveal a hint for the current round.
    Hint,
}

/// A correct guess ranked by arrival order, with the points it earned.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedGuess {
    /// Player who guessed.
    pub player_id: PlayerId,
    /// Time elapsed between round start and the guess.
    pub elapsed: Duration,
    /// Points awarded for this guess.
    pub points: f64,
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// At least one player guessed correctly; winners are ranked by arrival.
    Guessed(Vec<RankedGuess>),
    /// Every eligible player answered in hidden mode and nobody was right.
    Unanswered,
    /// Skip quorum was reached, or the owner forced the skip.
    Skipped {
        /// True when the owner bypassed the vote.
        forced: bool,
    },
    /// The guess timer elapsed without a correct guess.
    TimedOut,
}

impl RoundOutcome {
    /// Ranked winners of the round (empty unless guessed).
    pub fn ranked_winners(&self) -> &[RankedGuess] {
        match self {
            RoundOutcome::Guessed(winners) => winners,
            _ => &[],
        }
    }

    /// Whether somebody guessed the answer.
    pub fn is_correct(&self) -> bool {
        !self.ranked_winners().is_empty()
    }
}

/// Reason a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SessionEndReason {
    /// Explicit end requested through the gateway.
    Requested,
    /// The goal score was reached.
    GoalReached,
    /// Elimination finished: one survivor or nobody left.
    LastPlayerStanding,
    /// Nobody was left in the voice channel when a round was about to start.
    EmptyChannel,
    /// A collaborator failed while preparing a round.
    Failure(String),
}
