//! Majority voting for cooperative round actions (skip, hint).

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::{
    game::{GameMode, VoteAction},
    round::Round,
    scoreboard::Scoreboard,
};

/// Votes counted for an action against the quorum needed to apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct VoteTally {
    /// Votes that count.
    pub current: usize,
    /// Votes required.
    pub quorum: usize,
}

impl VoteTally {
    /// Whether enough votes were counted.
    pub fn reached(&self) -> bool {
        self.current >= self.quorum
    }
}

/// Strict majority of `eligible` voters, never below one.
pub fn quorum(eligible: usize) -> usize {
    eligible / 2 + 1
}

/// Count the votes for `action` in `round`.
///
/// Elimination sessions only count surviving players, both in the vote set and in the
/// quorum base. Other modes use the active participant count reported by presence.
pub fn tally(
    round: &Round,
    action: VoteAction,
    mode: GameMode,
    scoreboard: &Scoreboard,
    active_participants: usize,
) -> VoteTally {
    let votes = round.votes(action);
    match (mode, scoreboard.alive_count()) {
        (GameMode::Elimination, Some(alive)) => VoteTally {
            current: votes
                .iter()
                .filter(|player| scoreboard.can_participate(player.as_str()))
                .count(),
            quorum: quorum(alive),
        },
        _ => VoteTally {
            current: votes.len(),
            quorum: quorum(active_participants),
        },
    }
}

/// Whether the votes for `action` reach the quorum.
pub fn has_quorum(
    round: &Round,
    action: VoteAction,
    mode: GameMode,
    scoreboard: &Scoreboard,
    active_participants: usize,
) -> bool {
    tally(round, action, mode, scoreboard, active_participants).reached()
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::state::game::AnswerSet;

    fn round() -> Round {
        Round::new(&AnswerSet::new("apple", Vec::new()), Instant::now())
    }

    fn elimination_board(players: &[&str], lives: u32) -> Scoreboard {
        let mut board = Scoreboard::for_mode(GameMode::Elimination, Some(lives));
        for player in players {
            board.add_player(player, false);
        }
        board
    }

    #[test]
    fn quorum_is_a_strict_majority() {
        assert_eq!(quorum(0), 1);
        assert_eq!(quorum(1), 1);
        assert_eq!(quorum(2), 2);
        assert_eq!(quorum(3), 2);
        assert_eq!(quorum(4), 3);
        assert_eq!(quorum(5), 3);
    }

    #[test]
    fn quorum_is_monotonic() {
        for eligible in 0..200 {
            assert!(quorum(eligible + 1) >= quorum(eligible));
            assert!(quorum(eligible) >= 1);
        }
    }

    #[test]
    fn quorum_stays_reached_as_votes_keep_coming() {
        let board = Scoreboard::for_mode(GameMode::Classic, None);
        for active in 1..=8 {
            let threshold = quorum(active);
            let mut round = round();
            for voters in 1..=active {
                round.record_vote(VoteAction::Skip, &format!("p{voters}"));
                assert_eq!(
                    has_quorum(&round, VoteAction::Skip, GameMode::Classic, &board, active),
                    voters >= threshold,
                    "{voters} of {active} voters"
                );
            }
        }
    }

    #[test]
    fn default_quorum_uses_active_participants() {
        let board = Scoreboard::for_mode(GameMode::Classic, None);
        let mut round = round();
        round.record_vote(VoteAction::Skip, "p1");
        round.record_vote(VoteAction::Skip, "p2");

        let tally = tally(&round, VoteAction::Skip, GameMode::Classic, &board, 4);
        assert_eq!(tally, VoteTally { current: 2, quorum: 3 });
        assert!(!tally.reached());

        round.record_vote(VoteAction::Skip, "p3");
        assert!(has_quorum(&round, VoteAction::Skip, GameMode::Classic, &board, 4));
        assert!(!has_quorum(&round, VoteAction::Hint, GameMode::Classic, &board, 4));
    }

    #[test]
    fn elimination_threshold_follows_alive_players() {
        let board = elimination_board(&["p1", "p2", "p3", "p4", "p5"], 3);
        let mut round = round();
        round.record_vote(VoteAction::Skip, "p1");
        round.record_vote(VoteAction::Skip, "p2");
        assert!(!has_quorum(&round, VoteAction::Skip, GameMode::Elimination, &board, 9));
        round.record_vote(VoteAction::Skip, "p3");
        let tally = tally(&round, VoteAction::Skip, GameMode::Elimination, &board, 9);
        assert_eq!(tally.quorum, 3);
        assert!(tally.reached());
    }

    #[test]
    fn single_survivor_needs_one_vote() {
        let mut board = elimination_board(&["p1", "p2"], 1);
        board.apply_round_result(&[crate::state::game::RankedGuess {
            player_id: "p1".into(),
            elapsed: std::time::Duration::ZERO,
            points: 1.0,
        }]);
        let mut round = round();
        round.record_vote(VoteAction::Skip, "p1");
        let tally = tally(&round, VoteAction::Skip, GameMode::Elimination, &board, 2);
        assert_eq!(tally, VoteTally { current: 1, quorum: 1 });
    }

    #[test]
    fn eliminated_votes_are_not_counted() {
        let mut board = elimination_board(&["p1", "p2", "p3"], 1);
        board.apply_round_result(&[crate::state::game::RankedGuess {
            player_id: "p1".into(),
            elapsed: std::time::Duration::ZERO,
            points: 1.0,
        }]);
        let mut round = round();
        round.record_vote(VoteAction::Hint, "p2");
        round.record_vote(VoteAction::Hint, "p3");
        let tally = tally(&round, VoteAction::Hint, GameMode::Elimination, &board, 3);
        assert_eq!(tally, VoteTally { current: 0, quorum: 1 });
    }
}
