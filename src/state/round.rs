use std::collections::HashSet;

use rand::{Rng, seq::index::sample};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    services::guess::{self, GuessMatch},
    state::{
        game::{AnswerSet, BASE_POINTS, PlayerId, RankedGuess, RoundId, VoteAction},
        timer::RoundTimer,
    },
};

/// Share of the letters of the answer hidden by a hint.
const HINT_MASK_RATIO: f64 = 0.75;
const HINT_MASK: char = '_';

/// A correct guess recorded during a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectGuess {
    /// Player who guessed.
    pub player_id: PlayerId,
    /// Arrival time of the guess.
    pub at: Instant,
}

/// One clip-guessing round. Owned by exactly one session and replaced each round.
#[derive(Debug)]
pub struct Round {
    id: RoundId,
    primary_name: String,
    answer_keys: Vec<String>,
    started_at: Instant,
    timeout_at: Option<Instant>,
    skip_votes: HashSet<PlayerId>,
    hint_votes: HashSet<PlayerId>,
    hint: String,
    hint_revealed: bool,
    skip_achieved: bool,
    finished: bool,
    correct_guessers: Vec<CorrectGuess>,
    hidden_guessers: HashSet<PlayerId>,
    timer: Option<RoundTimer>,
}

impl Round {
    /// Open a round for `answers`, started at `started_at`.
    pub fn new(answers: &AnswerSet, started_at: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            primary_name: answers.primary_name.clone(),
            answer_keys: guess::answer_keys(answers),
            started_at,
            timeout_at: None,
            skip_votes: HashSet::new(),
            hint_votes: HashSet::new(),
            hint: generate_hint(&answers.primary_name, &mut rand::rng()),
            hint_revealed: false,
            skip_achieved: false,
            finished: false,
            correct_guessers: Vec::new(),
            hidden_guessers: HashSet::new(),
            timer: None,
        }
    }

    /// Unique identifier of the round.
    pub fn id(&self) -> RoundId {
        self.id
    }

    /// Canonical answer.
    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    /// When the round started.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// When the guess timer expires, if one is armed.
    pub fn timeout_at(&self) -> Option<Instant> {
        self.timeout_at
    }

    /// Whether the round has ended. Never reverts once set.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the skip quorum (or a forced skip) ended the round.
    pub fn skip_achieved(&self) -> bool {
        self.skip_achieved
    }

    /// Whether the hint has been revealed.
    pub fn hint_revealed(&self) -> bool {
        self.hint_revealed
    }

    /// The hint text once revealed.
    pub fn revealed_hint(&self) -> Option<&str> {
        self.hint_revealed.then_some(self.hint.as_str())
    }

    /// Players who voted for `action`.
    pub fn votes(&self, action: VoteAction) -> &HashSet<PlayerId> {
        match action {
            VoteAction::Skip => &self.skip_votes,
            VoteAction::Hint => &self.hint_votes,
        }
    }

    /// Whether the outcome of `action` has already been applied.
    pub fn action_achieved(&self, action: VoteAction) -> bool {
        match action {
            VoteAction::Skip => self.skip_achieved,
            VoteAction::Hint => self.hint_revealed,
        }
    }

    /// Record a vote. Returns `false` for a repeated vote or a finished round.
    pub fn record_vote(&mut self, action: VoteAction, player_id: &str) -> bool {
        if self.finished {
            return false;
        }
        let votes = match action {
            VoteAction::Skip => &mut self.skip_votes,
            VoteAction::Hint => &mut self.hint_votes,
        };
        votes.insert(player_id.to_string())
    }

    /// Reveal the hint. Returns the hint text the first time only.
    pub fn reveal_hint(&mut self) -> Option<&str> {
        if self.hint_revealed || self.finished {
            return None;
        }
        self.hint_revealed = true;
        Some(&self.hint)
    }

    /// Flag the round as skipped. Scoring happens when the session ends the round.
    pub fn mark_skipped(&mut self) {
        self.skip_achieved = true;
    }

    /// Compare a candidate against the accepted answers.
    pub fn check(&self, candidate: &str, typos_allowed: bool) -> GuessMatch {
        guess::resolve(candidate, &self.answer_keys, typos_allowed)
    }

    /// Record a correct guess and return its zero-based rank, or `None` when the
    /// player already guessed correctly.
    pub fn record_correct(&mut self, player_id: &str, at: Instant) -> Option<usize> {
        if self.has_guessed_correctly(player_id) {
            return None;
        }
        self.correct_guessers.push(CorrectGuess {
            player_id: player_id.to_string(),
            at,
        });
        Some(self.correct_guessers.len() - 1)
    }

    /// Whether `player_id` is already among the correct guessers.
    pub fn has_guessed_correctly(&self, player_id: &str) -> bool {
        self.correct_guessers
            .iter()
            .any(|guess| guess.player_id == player_id)
    }

    /// Correct guessers in arrival order.
    pub fn correct_guessers(&self) -> &[CorrectGuess] {
        &self.correct_guessers
    }

    /// Record that a player answered in hidden mode. Returns `false` if they already had.
    pub fn record_hidden_guess(&mut self, player_id: &str) -> bool {
        self.hidden_guessers.insert(player_id.to_string())
    }

    /// Players who answered in hidden mode.
    pub fn hidden_guessers(&self) -> &HashSet<PlayerId> {
        &self.hidden_guessers
    }

    /// Correct guessers with the points they earned: the first guesser gets the full
    /// points, later ones half, and everything is halved once a hint was revealed.
    pub fn ranked_guesses(&self) -> Vec<RankedGuess> {
        let hint_factor = if self.hint_revealed { 0.5 } else { 1.0 };
        self.correct_guessers
            .iter()
            .enumerate()
            .map(|(rank, guess)| {
                let base = if rank == 0 { BASE_POINTS } else { BASE_POINTS / 2.0 };
                RankedGuess {
                    player_id: guess.player_id.clone(),
                    elapsed: guess.at.saturating_duration_since(self.started_at),
                    points: base * hint_factor,
                }
            })
            .collect()
    }

    /// Arm a timer, cancelling the one currently armed.
    pub fn arm_timer(&mut self, timer: RoundTimer, timeout_at: Option<Instant>) {
        if timeout_at.is_some() {
            self.timeout_at = timeout_at;
        }
        self.timer = Some(timer);
    }

    /// Cancel the armed timer, if any.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    /// Mark the round finished and cancel its timer. Returns `true` only on the
    /// first call.
    pub fn finish(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.cancel_timer();
        true
    }
}

/// Mask most letters of `answer`, keeping spaces and punctuation visible.
pub fn generate_hint<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = answer.chars().collect();
    let letters: Vec<usize> = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_alphanumeric())
        .map(|(index, _)| index)
        .collect();
    if letters.is_empty() {
        return answer.to_string();
    }

    let masked = ((letters.len() as f64 * HINT_MASK_RATIO).floor() as usize).max(1);
    for picked in sample(rng, letters.len(), masked) {
        chars[letters[picked]] = HINT_MASK;
    }
    chars.into_iter().collect()
}
