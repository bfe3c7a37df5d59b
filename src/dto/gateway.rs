//! Payloads exchanged with the chat gateway forwarding platform events.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::preferences::GuildPreferences,
    dto::validation::validate_opaque_id,
    services::consensus::VoteTally,
    state::{
        game::{GameMode, VoteAction},
        scoreboard::TeamJoin,
    },
};

/// Longest accepted guess, in bytes.
const MAX_GUESS_LENGTH: u64 = 200;
/// Longest accepted team name, in bytes.
const MAX_TEAM_NAME_LENGTH: u64 = 32;

/// Start a session in a guild.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartSessionRequest {
    #[validate(custom(function = "validate_opaque_id"))]
    pub owner_id: String,
    pub mode: GameMode,
    /// Starting lives for elimination sessions.
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub lives: Option<u32>,
}

/// Free-text guess from a participant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    #[validate(custom(function = "validate_opaque_id"))]
    pub player_id: String,
    #[validate(length(min = 1, max = MAX_GUESS_LENGTH))]
    pub content: String,
}

/// Skip or hint vote.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VoteRequest {
    #[validate(custom(function = "validate_opaque_id"))]
    pub player_id: String,
    pub action: VoteAction,
}

/// Action attributed to a single participant, such as a force-skip.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerActionRequest {
    #[validate(custom(function = "validate_opaque_id"))]
    pub player_id: String,
}

/// Join or switch team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinTeamRequest {
    #[validate(custom(function = "validate_opaque_id"))]
    pub player_id: String,
    #[validate(length(min = 1, max = MAX_TEAM_NAME_LENGTH))]
    pub team: String,
}

/// Voice presence change reported by the gateway.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PresenceUpdateRequest {
    #[validate(custom(function = "validate_opaque_id"))]
    pub guild_id: String,
    #[validate(custom(function = "validate_opaque_id"))]
    pub player_id: String,
    /// `true` when joining the session's voice channel, `false` when leaving.
    pub joined: bool,
    /// Bots never count as participants.
    #[serde(default)]
    pub bot: bool,
}

/// Guild options, durations in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct PreferencesPayload {
    pub typos_allowed: bool,
    pub multiguess: bool,
    #[validate(range(min = 100, max = 10000))]
    pub multiguess_delay_ms: u64,
    #[serde(default)]
    #[validate(range(min = 1000, max = 600000))]
    pub guess_timeout_ms: Option<u64>,
    #[serde(default)]
    #[validate(range(min = 1, max = 1000))]
    pub goal: Option<u32>,
    #[validate(range(max = 60000))]
    pub round_start_delay_ms: u64,
}

impl From<PreferencesPayload> for GuildPreferences {
    fn from(payload: PreferencesPayload) -> Self {
        Self {
            typos_allowed: payload.typos_allowed,
            multiguess: payload.multiguess,
            multiguess_delay: Duration::from_millis(payload.multiguess_delay_ms),
            guess_timeout: payload.guess_timeout_ms.map(Duration::from_millis),
            goal: payload.goal,
            round_start_delay: Duration::from_millis(payload.round_start_delay_ms),
        }
    }
}

impl From<GuildPreferences> for PreferencesPayload {
    fn from(preferences: GuildPreferences) -> Self {
        Self {
            typos_allowed: preferences.typos_allowed,
            multiguess: preferences.multiguess,
            multiguess_delay_ms: preferences.multiguess_delay.as_millis() as u64,
            guess_timeout_ms: preferences
                .guess_timeout
                .map(|timeout| timeout.as_millis() as u64),
            goal: preferences.goal,
            round_start_delay_ms: preferences.round_start_delay.as_millis() as u64,
        }
    }
}

/// Why an event was accepted but had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredReason {
    /// No round is accepting input.
    NoActiveRound,
    /// The player is not in the session's voice channel.
    NotCoLocated,
    /// Eliminated, or without a team in team play.
    NotEligible,
    /// The player already found the answer this round.
    AlreadyGuessed,
    /// Only the session owner may do this.
    NotPermitted,
    /// The action was already applied this round.
    AlreadyAchieved,
    /// The player already voted for this action.
    DuplicateVote,
}

/// Result of a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum GuessOutcome {
    /// The guess matched; `rank` is 1 for the first correct guesser.
    Correct {
        rank: usize,
        /// Accepted thanks to typo tolerance.
        typo: bool,
    },
    /// Hidden mode: the guess was recorded without feedback.
    Recorded,
    /// The guess did not match.
    Incorrect,
    /// The guess was dropped.
    Ignored { reason: IgnoredReason },
}

/// Result of a vote or force-skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum VoteOutcome {
    /// Counted, quorum not reached yet.
    Pending { current: usize, quorum: usize },
    /// Quorum reached and the action applied.
    Achieved { current: usize, quorum: usize },
    /// The vote was dropped.
    Ignored { reason: IgnoredReason },
}

impl VoteOutcome {
    /// Outcome of a counted vote.
    pub fn from_tally(tally: VoteTally) -> Self {
        if tally.reached() {
            VoteOutcome::Achieved {
                current: tally.current,
                quorum: tally.quorum,
            }
        } else {
            VoteOutcome::Pending {
                current: tally.current,
                quorum: tally.quorum,
            }
        }
    }
}

/// Result of a team join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum TeamJoinResponse {
    Created,
    Joined,
    Switched { from: String, removed: bool },
    AlreadyMember,
}

impl From<TeamJoin> for TeamJoinResponse {
    fn from(join: TeamJoin) -> Self {
        match join {
            TeamJoin::Created => TeamJoinResponse::Created,
            TeamJoin::Joined => TeamJoinResponse::Joined,
            TeamJoin::Switched { from, removed } => TeamJoinResponse::Switched { from, removed },
            TeamJoin::AlreadyMember => TeamJoinResponse::AlreadyMember,
        }
    }
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_request_limits_content() {
        let ok = GuessRequest {
            player_id: "1234".into(),
            content: "apple".into(),
        };
        assert!(ok.validate().is_ok());

        let empty = GuessRequest {
            player_id: "1234".into(),
            content: String::new(),
        };
        assert!(empty.validate().is_err());

        let bad_player = GuessRequest {
            player_id: "12 34".into(),
            content: "apple".into(),
        };
        assert!(bad_player.validate().is_err());
    }

    #[test]
    fn preferences_payload_round_trips_durations() {
        let payload = PreferencesPayload {
            typos_allowed: true,
            multiguess: true,
            multiguess_delay_ms: 1500,
            guess_timeout_ms: Some(30000),
            goal: Some(10),
            round_start_delay_ms: 0,
        };
        assert!(payload.validate().is_ok());

        let preferences = GuildPreferences::from(payload);
        assert_eq!(preferences.guess_timeout, Some(Duration::from_secs(30)));
        assert_eq!(preferences.multiguess_delay, Duration::from_millis(1500));
        assert!(preferences.round_start_delay.is_zero());
    }

    #[test]
    fn preferences_payload_rejects_tiny_timeouts() {
        let payload = PreferencesPayload {
            typos_allowed: true,
            multiguess: false,
            multiguess_delay_ms: 1500,
            guess_timeout_ms: Some(10),
            goal: None,
            round_start_delay_ms: 3000,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn vote_outcome_reflects_quorum() {
        assert_eq!(
            VoteOutcome::from_tally(VoteTally {
                current: 2,
                quorum: 3
            }),
            VoteOutcome::Pending {
                current: 2,
                quorum: 3
            }
        );
        assert!(matches!(
            VoteOutcome::from_tally(VoteTally {
                current: 3,
                quorum: 3
            }),
            VoteOutcome::Achieved { .. }
        ));
    }
}
