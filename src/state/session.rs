use std::time::{Duration, SystemTime};

use tokio::time::Instant;

use crate::{
    dao::preferences::GuildPreferences,
    error::SessionError,
    state::{
        game::{AnswerSet, GameMode, GuildId, PlayerId, RoundId, RoundOutcome, SessionEndReason},
        round::Round,
        scoreboard::{ScoreboardField, Scoreboard},
        state_machine::{
            ApplyError, InvalidTransition, PlanError, PlanId, SessionEvent, SessionPhase,
            SessionStateMachine,
        },
    },
};

/// Consecutive rounds won by the same player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Streak {
    /// Player on a streak.
    pub player_id: PlayerId,
    /// Consecutive first places.
    pub rounds: u32,
}

/// What a finished round produced, for notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    /// Round identifier.
    pub round_id: RoundId,
    /// Ordinal of the round within the session, starting at 1.
    pub round_number: u32,
    /// Canonical answer.
    pub answer: String,
    /// How the round ended.
    pub outcome: RoundOutcome,
    /// Players who lost their last life this round.
    pub eliminated: Vec<PlayerId>,
    /// Streak of the first guesser, when there was one.
    pub streak: Option<Streak>,
}

/// Final state of a session, emitted once when it ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Guild the session ran in.
    pub guild_id: GuildId,
    /// Mode of the session.
    pub mode: GameMode,
    /// Why the session ended.
    pub reason: SessionEndReason,
    /// Rounds that were played to the end.
    pub rounds_played: u32,
    /// Correct guesses over the whole session.
    pub correct_guesses: u32,
    /// Mean time to the first correct guess of guessed rounds.
    pub average_guess_time: Option<Duration>,
    /// Session duration.
    pub duration: Duration,
    /// Winning players or teams.
    pub winners: Vec<String>,
    /// Final scoreboard.
    pub scoreboard: Vec<ScoreboardField>,
}

/// Per-guild game: mode, scoreboard, current round and lifecycle.
#[derive(Debug)]
pub struct GameSession {
    guild_id: GuildId,
    mode: GameMode,
    owner: PlayerId,
    scoreboard: Scoreboard,
    current_round: Option<Round>,
    machine: SessionStateMachine,
    preferences: GuildPreferences,
    initialized: bool,
    started_at: Instant,
    last_active_at: SystemTime,
    rounds_played: u32,
    correct_guesses: u32,
    guess_times: Vec<Duration>,
    streak: Option<Streak>,
}

impl GameSession {
    /// New idle session. `starting_lives` only matters for elimination.
    pub fn new(guild_id: GuildId, mode: GameMode, owner: PlayerId, starting_lives: Option<u32>) -> Self {
        Self {
            guild_id,
            mode,
            owner,
            scoreboard: Scoreboard::for_mode(mode, starting_lives),
            current_round: None,
            machine: SessionStateMachine::new(),
            preferences: GuildPreferences::default(),
            initialized: false,
            started_at: Instant::now(),
            last_active_at: SystemTime::now(),
            rounds_played: 0,
            correct_guesses: 0,
            guess_times: Vec::new(),
            streak: None,
        }
    }

    /// Guild of the session.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }

    /// Mode fixed at creation.
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Player who started the session.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// State machine version, incremented on each transition.
    pub fn version(&self) -> usize {
        self.machine.snapshot().version
    }

    /// Whether the first round has begun.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Preferences captured when the current round started.
    pub fn preferences(&self) -> &GuildPreferences {
        &self.preferences
    }

    /// Scoreboard of the session.
    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Mutable scoreboard, for roster changes.
    pub fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.scoreboard
    }

    /// Current or last round.
    pub fn round(&self) -> Option<&Round> {
        self.current_round.as_ref()
    }

    /// Round accepting guesses and votes, if any.
    pub fn active_round(&self) -> Option<&Round> {
        self.current_round
            .as_ref()
            .filter(|round| self.machine.phase() == SessionPhase::RoundActive && !round.is_finished())
    }

    /// Split borrow of the active round and the scoreboard.
    pub fn active_round_and_scoreboard(&mut self) -> Option<(&mut Round, &Scoreboard)> {
        if self.machine.phase() != SessionPhase::RoundActive {
            return None;
        }
        let round = self.current_round.as_mut().filter(|round| !round.is_finished())?;
        Some((round, &self.scoreboard))
    }

    /// Rounds played to the end.
    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    /// Last time a participant interacted with the session.
    pub fn last_active_at(&self) -> SystemTime {
        self.last_active_at
    }

    /// Record participant activity.
    pub fn touch(&mut self) {
        self.last_active_at = SystemTime::now();
    }

    /// Identifier of the round start being prepared, if any.
    pub fn pending_round(&self) -> Option<PlanId> {
        self.machine.pending_id()
    }

    /// Reserve the start of the next round while its answer set is fetched.
    pub fn request_round(&mut self) -> Result<PlanId, SessionError> {
        match self.machine.plan(SessionEvent::StartRound) {
            Ok(plan) => Ok(plan.id),
            Err(PlanError::InvalidTransition(invalid)) => Err(invalid.into()),
            Err(PlanError::AlreadyPending) => Err(InvalidTransition {
                from: self.machine.phase(),
                event: SessionEvent::StartRound,
            }
            .into()),
        }
    }

    /// Drop a reserved round start after the fetch failed.
    pub fn abandon_round_request(&mut self, request_id: PlanId) -> Result<(), ApplyError> {
        self.machine.abort(request_id)
    }

    /// Open the round reserved by `request_id`.
    pub fn begin_round(
        &mut self,
        request_id: PlanId,
        answers: &AnswerSet,
        preferences: GuildPreferences,
        now: Instant,
    ) -> Result<&mut Round, ApplyError> {
        self.machine.apply(request_id)?;
        self.initialized = true;
        self.preferences = preferences;
        // Dropping the previous round cancels any timer it still held.
        Ok(self.current_round.insert(Round::new(answers, now)))
    }

    /// End the active round with `outcome`: mark it finished, cancel its timer and apply
    /// scoring. A second call for the same round is rejected without side effects.
    pub fn end_round(&mut self, outcome: RoundOutcome) -> Result<RoundSummary, SessionError> {
        let phase = self.machine.phase();
        let invalid = || InvalidTransition {
            from: phase,
            event: SessionEvent::EndRound,
        };

        let round = self.current_round.as_mut().ok_or_else(invalid)?;
        if phase != SessionPhase::RoundActive || !round.finish() {
            return Err(invalid().into());
        }
        if matches!(outcome, RoundOutcome::Skipped { .. }) {
            round.mark_skipped();
        }
        let round_id = round.id();
        let answer = round.primary_name().to_string();
        self.machine.fire(SessionEvent::EndRound)?;

        let eliminated = self.scoreboard.apply_round_result(outcome.ranked_winners());

        let winners = outcome.ranked_winners();
        self.rounds_played += 1;
        self.correct_guesses += winners.len() as u32;
        if let Some(first) = winners.first() {
            self.guess_times.push(first.elapsed);
        }
        self.streak = match (self.streak.take(), winners.first()) {
            (Some(streak), Some(first)) if streak.player_id == first.player_id => Some(Streak {
                player_id: streak.player_id,
                rounds: streak.rounds + 1,
            }),
            (_, Some(first)) => Some(Streak {
                player_id: first.player_id.clone(),
                rounds: 1,
            }),
            (_, None) => None,
        };

        Ok(RoundSummary {
            round_id,
            round_number: self.rounds_played,
            answer,
            outcome,
            eliminated,
            streak: self.streak.clone(),
        })
    }

    /// Whether the scoreboard says the game is over.
    pub fn game_finished(&self) -> bool {
        self.scoreboard.game_finished(self.preferences.goal)
    }

    /// Tear the session down: cancel timers, abort the round in progress without
    /// scoring and produce the final summary.
    pub fn end(&mut self, reason: SessionEndReason) -> Result<SessionSummary, SessionError> {
        self.machine.fire(SessionEvent::EndSession)?;
        if let Some(round) = self.current_round.as_mut() {
            round.finish();
        }

        let average_guess_time = (!self.guess_times.is_empty()).then(|| {
            self.guess_times.iter().sum::<Duration>() / self.guess_times.len() as u32
        });

        Ok(SessionSummary {
            guild_id: self.guild_id.clone(),
            mode: self.mode,
            reason,
            rounds_played: self.rounds_played,
            correct_guesses: self.correct_guesses,
            average_guess_time,
            duration: self.started_at.elapsed(),
            winners: self.scoreboard.winners(),
            scoreboard: self.scoreboard.embed_fields(),
        })
    }
}
