//! Scoreboards for the three scoring variants.
//!
//! The session owns a single [`Scoreboard`] value and every scoring call goes through
//! the enum, which dispatches to the variant matching the session mode.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::game::{GameMode, PlayerId, RankedGuess, TeamName};

/// Lives granted to players enrolled at the start of an elimination session.
pub const DEFAULT_STARTING_LIVES: u32 = 10;

/// Per-player points tally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerScore {
    /// Accumulated points.
    pub score: f64,
    /// Rounds in which the player guessed correctly.
    pub correct_guesses: u32,
    /// Sequence number of the last scoring guess, used to order ties.
    reached_at: u64,
}

/// Per-player lives in elimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLives {
    /// Remaining lives; 0 means eliminated.
    pub lives: u32,
    /// Rounds in which the player guessed correctly.
    pub correct_guesses: u32,
}

impl PlayerLives {
    /// Whether the player is out of the game.
    pub fn is_eliminated(&self) -> bool {
        self.lives == 0
    }
}

/// Value displayed next to a scoreboard entry.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Standing {
    /// Points for classic and team scoring.
    Points(f64),
    /// Remaining lives for a surviving elimination player.
    Lives(u32),
    /// Elimination player out of the game.
    Eliminated,
}

/// One display row of a scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScoreboardField {
    /// 1-based display rank; tied entries share a rank.
    pub rank: usize,
    /// Player id, or team name in team scoring.
    pub name: String,
    /// Points or lives.
    pub standing: Standing,
}

/// Result of a team join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamJoin {
    /// The team did not exist and was created with the player in it.
    Created,
    /// The player joined an existing team.
    Joined,
    /// The player moved from another team; `removed` tells whether it was left empty and deleted.
    Switched {
        /// Previous team.
        from: TeamName,
        /// Whether the previous team was deleted.
        removed: bool,
    },
    /// The player already belonged to the team.
    AlreadyMember,
}

/// Free-for-all points.
#[derive(Debug, Clone, Default)]
pub struct ClassicBoard {
    players: IndexMap<PlayerId, PlayerScore>,
    sequence: u64,
}

impl ClassicBoard {
    fn add_player(&mut self, player_id: &str) {
        self.players.entry(player_id.to_string()).or_default();
    }

    fn apply(&mut self, winners: &[RankedGuess]) {
        for winner in winners {
            self.sequence += 1;
            let entry = self.players.entry(winner.player_id.clone()).or_default();
            entry.score += winner.points;
            entry.correct_guesses += 1;
            entry.reached_at = self.sequence;
        }
    }

    fn ordered(&self) -> Vec<(&PlayerId, &PlayerScore)> {
        let mut entries: Vec<_> = self.players.iter().collect();
        entries.sort_by(|(_, a), (_, b)| {
            b.score
                .total_cmp(&a.score)
                .then(a.reached_at.cmp(&b.reached_at))
        });
        entries
    }
}

#[derive(Debug, Clone, Default)]
struct TeamScore {
    score: f64,
    reached_at: u64,
    members: IndexSet<PlayerId>,
}

/// Team points, with an informational per-player tally.
#[derive(Debug, Clone, Default)]
pub struct TeamBoard {
    teams: IndexMap<TeamName, TeamScore>,
    membership: IndexMap<PlayerId, TeamName>,
    players: IndexMap<PlayerId, PlayerScore>,
    sequence: u64,
}

impl TeamBoard {
    /// Put a player in a team, creating it when needed and deleting a team left empty.
    pub fn join(&mut self, player_id: &str, team: &str) -> TeamJoin {
        let previous = self.membership.get(player_id).cloned();
        if previous.as_deref() == Some(team) {
            return TeamJoin::AlreadyMember;
        }

        let mut removed = false;
        if let Some(previous) = &previous
            && let Some(old) = self.teams.get_mut(previous)
        {
            old.members.shift_remove(player_id);
            if old.members.is_empty() {
                self.teams.shift_remove(previous);
                removed = true;
            }
        }

        let created = !self.teams.contains_key(team);
        self.teams
            .entry(team.to_string())
            .or_default()
            .members
            .insert(player_id.to_string());
        self.membership
            .insert(player_id.to_string(), team.to_string());
        self.players.entry(player_id.to_string()).or_default();

        match (previous, created) {
            (Some(from), _) => TeamJoin::Switched { from, removed },
            (None, true) => TeamJoin::Created,
            (None, false) => TeamJoin::Joined,
        }
    }

    /// Team of a player.
    pub fn team_of(&self, player_id: &str) -> Option<&TeamName> {
        self.membership.get(player_id)
    }

    /// Current score of a team.
    pub fn team_score(&self, team: &str) -> Option<f64> {
        self.teams.get(team).map(|team| team.score)
    }

    /// Members of a team in join order.
    pub fn members(&self, team: &str) -> Vec<&PlayerId> {
        self.teams
            .get(team)
            .map(|team| team.members.iter().collect())
            .unwrap_or_default()
    }

    fn apply(&mut self, winners: &[RankedGuess]) {
        let mut credited: HashSet<TeamName> = HashSet::new();
        for winner in winners {
            let player = self.players.entry(winner.player_id.clone()).or_default();
            player.score += winner.points;
            player.correct_guesses += 1;

            let Some(team_name) = self.membership.get(&winner.player_id) else {
                continue;
            };
            if !credited.insert(team_name.clone()) {
                continue;
            }
            if let Some(team) = self.teams.get_mut(team_name) {
                self.sequence += 1;
                team.score += winner.points;
                team.reached_at = self.sequence;
            }
        }
    }

    fn ordered(&self) -> Vec<(&TeamName, &TeamScore)> {
        let mut entries: Vec<_> = self.teams.iter().collect();
        entries.sort_by(|(_, a), (_, b)| {
            b.score
                .total_cmp(&a.score)
                .then(a.reached_at.cmp(&b.reached_at))
        });
        entries
    }
}

/// Lives-based scoring.
#[derive(Debug, Clone)]
pub struct EliminationBoard {
    starting_lives: u32,
    players: IndexMap<PlayerId, PlayerLives>,
}

impl EliminationBoard {
    fn new(starting_lives: u32) -> Self {
        Self {
            starting_lives: starting_lives.max(1),
            players: IndexMap::new(),
        }
    }

    /// Lives assigned to the initial roster.
    pub fn starting_lives(&self) -> u32 {
        self.starting_lives
    }

    /// Enroll a player. Before the game starts everyone gets the starting lives;
    /// later arrivals get the lives of the weakest survivor. Returns the lives of
    /// newly enrolled players.
    pub fn enroll(&mut self, player_id: &str, late: bool) -> Option<u32> {
        if self.players.contains_key(player_id) {
            return None;
        }
        let lives = if late {
            self.weakest_alive().unwrap_or(self.starting_lives)
        } else {
            self.starting_lives
        };
        self.players.insert(
            player_id.to_string(),
            PlayerLives {
                lives,
                correct_guesses: 0,
            },
        );
        Some(lives)
    }

    fn weakest_alive(&self) -> Option<u32> {
        self.players
            .values()
            .filter(|player| !player.is_eliminated())
            .map(|player| player.lives)
            .min()
    }

    /// Lives of a player, if enrolled.
    pub fn player(&self, player_id: &str) -> Option<&PlayerLives> {
        self.players.get(player_id)
    }

    fn alive_count(&self) -> usize {
        self.players
            .values()
            .filter(|player| !player.is_eliminated())
            .count()
    }

    fn apply(&mut self, winners: &[RankedGuess]) -> Vec<PlayerId> {
        let winners: HashSet<&str> = winners.iter().map(|w| w.player_id.as_str()).collect();
        let mut eliminated = Vec::new();
        for (player_id, player) in self.players.iter_mut() {
            if player.is_eliminated() {
                continue;
            }
            if winners.contains(player_id.as_str()) {
                player.correct_guesses += 1;
                continue;
            }
            player.lives -= 1;
            if player.is_eliminated() {
                eliminated.push(player_id.clone());
            }
        }
        eliminated
    }

    fn ordered(&self) -> Vec<(&PlayerId, &PlayerLives)> {
        let mut entries: Vec<_> = self.players.iter().collect();
        entries.sort_by(|(_, a), (_, b)| b.lives.cmp(&a.lives));
        entries
    }
}

/// Scoreboard of a session, one variant per scoring rule.
#[derive(Debug, Clone)]
pub enum Scoreboard {
    /// Classic, Hidden and Competition sessions.
    Classic(ClassicBoard),
    /// Teams sessions.
    Teams(TeamBoard),
    /// Elimination sessions.
    Elimination(EliminationBoard),
}

impl Scoreboard {
    /// Empty scoreboard for `mode`.
    pub fn for_mode(mode: GameMode, starting_lives: Option<u32>) -> Self {
        match mode {
            GameMode::Classic | GameMode::Hidden | GameMode::Competition => {
                Scoreboard::Classic(ClassicBoard::default())
            }
            GameMode::Teams => Scoreboard::Teams(TeamBoard::default()),
            GameMode::Elimination => Scoreboard::Elimination(EliminationBoard::new(
                starting_lives.unwrap_or(DEFAULT_STARTING_LIVES),
            )),
        }
    }

    /// Apply the result of a finished round. Returns the players eliminated by it.
    pub fn apply_round_result(&mut self, ranked_winners: &[RankedGuess]) -> Vec<PlayerId> {
        match self {
            Scoreboard::Classic(board) => {
                board.apply(ranked_winners);
                Vec::new()
            }
            Scoreboard::Teams(board) => {
                board.apply(ranked_winners);
                Vec::new()
            }
            Scoreboard::Elimination(board) => board.apply(ranked_winners),
        }
    }

    /// Register a co-located player. Teams rosters are built through [`Scoreboard::join_team`].
    pub fn add_player(&mut self, player_id: &str, late: bool) {
        match self {
            Scoreboard::Classic(board) => board.add_player(player_id),
            Scoreboard::Teams(_) => {}
            Scoreboard::Elimination(board) => {
                board.enroll(player_id, late);
            }
        }
    }

    /// Put a player in a team. `None` when the scoreboard is not a team scoreboard.
    pub fn join_team(&mut self, player_id: &str, team: &str) -> Option<TeamJoin> {
        match self {
            Scoreboard::Teams(board) => Some(board.join(player_id, team)),
            _ => None,
        }
    }

    /// Whether a player may guess and vote: team players need a team, elimination
    /// players must still be alive.
    pub fn can_participate(&self, player_id: &str) -> bool {
        match self {
            Scoreboard::Classic(_) => true,
            Scoreboard::Teams(board) => board.team_of(player_id).is_some(),
            Scoreboard::Elimination(board) => board
                .player(player_id)
                .is_some_and(|player| !player.is_eliminated()),
        }
    }

    /// Whether the player was eliminated.
    pub fn is_eliminated(&self, player_id: &str) -> bool {
        match self {
            Scoreboard::Elimination(board) => board
                .player(player_id)
                .is_some_and(PlayerLives::is_eliminated),
            _ => false,
        }
    }

    /// Surviving players in elimination, `None` for other scoreboards.
    pub fn alive_count(&self) -> Option<usize> {
        match self {
            Scoreboard::Elimination(board) => Some(board.alive_count()),
            _ => None,
        }
    }

    /// Players known to the scoreboard.
    pub fn player_ids(&self) -> Vec<&PlayerId> {
        match self {
            Scoreboard::Classic(board) => board.players.keys().collect(),
            Scoreboard::Teams(board) => board.membership.keys().collect(),
            Scoreboard::Elimination(board) => board.players.keys().collect(),
        }
    }

    /// Leading players or teams. Ties are all winners; nobody wins a scoreless game.
    pub fn winners(&self) -> Vec<String> {
        match self {
            Scoreboard::Classic(board) => top_by_score(
                board
                    .players
                    .iter()
                    .map(|(id, player)| (id.as_str(), player.score)),
            ),
            Scoreboard::Teams(board) => top_by_score(
                board
                    .teams
                    .iter()
                    .map(|(name, team)| (name.as_str(), team.score)),
            ),
            Scoreboard::Elimination(board) => {
                let Some(best) = board
                    .players
                    .values()
                    .filter(|player| !player.is_eliminated())
                    .map(|player| player.lives)
                    .max()
                else {
                    return Vec::new();
                };
                board
                    .players
                    .iter()
                    .filter(|(_, player)| player.lives == best)
                    .map(|(id, _)| id.clone())
                    .collect()
            }
        }
    }

    /// Whether nothing worth displaying happened yet.
    pub fn is_empty(&self) -> bool {
        match self {
            Scoreboard::Classic(board) => board.players.values().all(|player| player.score <= 0.0),
            Scoreboard::Teams(board) => board.teams.values().all(|team| team.score <= 0.0),
            Scoreboard::Elimination(board) => board.players.is_empty(),
        }
    }

    /// Whether the game is over: the goal was reached, or elimination has at most
    /// one survivor out of several players.
    pub fn game_finished(&self, goal: Option<u32>) -> bool {
        match self {
            Scoreboard::Classic(board) => reached_goal(board.players.values().map(|p| p.score), goal),
            Scoreboard::Teams(board) => reached_goal(board.teams.values().map(|t| t.score), goal),
            Scoreboard::Elimination(board) => {
                let alive = board.alive_count();
                !board.players.is_empty() && (alive == 0 || (alive == 1 && board.players.len() > 1))
            }
        }
    }

    /// Display rows in ranking order.
    pub fn embed_fields(&self) -> Vec<ScoreboardField> {
        match self {
            Scoreboard::Classic(board) => ranked_fields(
                board
                    .ordered()
                    .into_iter()
                    .map(|(id, player)| (id.clone(), Standing::Points(player.score))),
            ),
            Scoreboard::Teams(board) => ranked_fields(
                board
                    .ordered()
                    .into_iter()
                    .map(|(name, team)| (name.clone(), Standing::Points(team.score))),
            ),
            Scoreboard::Elimination(board) => ranked_fields(board.ordered().into_iter().map(
                |(id, player)| {
                    let standing = if player.is_eliminated() {
                        Standing::Eliminated
                    } else {
                        Standing::Lives(player.lives)
                    };
                    (id.clone(), standing)
                },
            )),
        }
    }
}

fn reached_goal(mut scores: impl Iterator<Item = f64>, goal: Option<u32>) -> bool {
    match goal {
        Some(goal) if goal > 0 => scores.any(|score| score >= f64::from(goal)),
        _ => false,
    }
}

fn top_by_score<'a>(entries: impl Iterator<Item = (&'a str, f64)> + Clone) -> Vec<String> {
    let best = entries
        .clone()
        .map(|(_, score)| score)
        .fold(0.0_f64, f64::max);
    if best <= 0.0 {
        return Vec::new();
    }
    entries
        .filter(|(_, score)| *score == best)
        .map(|(id, _)| id.to_string())
        .collect()
}

fn ranked_fields(entries: impl Iterator<Item = (String, Standing)>) -> Vec<ScoreboardField> {
    let mut fields: Vec<ScoreboardField> = Vec::new();
    for (position, (name, standing)) in entries.enumerate() {
        let rank = match fields.last() {
            Some(previous) if previous.standing == standing => previous.rank,
            _ => position + 1,
        };
        fields.push(ScoreboardField {
            rank,
            name,
            standing,
        });
    }
    fields
}
