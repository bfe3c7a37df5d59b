use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::SessionError,
    state::{game::GuildId, presence::PresenceProvider, session::GameSession},
};

/// Load reported by one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkerStats {
    /// Sessions currently registered.
    pub active_sessions: usize,
    /// Scoreboard players currently co-located with their session.
    pub active_players: usize,
}

impl std::ops::AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.active_sessions += other.active_sessions;
        self.active_players += other.active_players;
    }
}

/// Sessions owned by one worker, keyed by guild. At most one session per guild.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<GuildId, GameSession>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session of a guild.
    pub fn get(&self, guild_id: &str) -> Option<&GameSession> {
        self.sessions.get(guild_id)
    }

    /// Mutable session of a guild.
    pub fn get_mut(&mut self, guild_id: &str) -> Option<&mut GameSession> {
        self.sessions.get_mut(guild_id)
    }

    /// Register a new session, refusing to replace a running one.
    pub fn create(&mut self, session: GameSession) -> Result<&mut GameSession, SessionError> {
        match self.sessions.entry(session.guild_id().to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                Err(SessionError::AlreadyActive(entry.key().clone()))
            }
            std::collections::hash_map::Entry::Vacant(entry) => Ok(entry.insert(session)),
        }
    }

    /// Unregister the session of a guild.
    pub fn remove(&mut self, guild_id: &str) -> Option<GameSession> {
        self.sessions.remove(guild_id)
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterate over the sessions.
    pub fn iter(&self) -> impl Iterator<Item = &GameSession> {
        self.sessions.values()
    }

    /// Load of this registry: session count and co-located scoreboard players.
    pub fn local_stats(&self, presence: &dyn PresenceProvider) -> WorkerStats {
        let active_players = self
            .sessions
            .values()
            .map(|session| {
                session
                    .scoreboard()
                    .player_ids()
                    .into_iter()
                    .filter(|player| presence.is_co_located(session.guild_id(), player))
                    .count()
            })
            .sum();

        WorkerStats {
            active_sessions: self.sessions.len(),
            active_players,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{game::GameMode, presence::PresenceTracker};

    fn session(guild_id: &str) -> GameSession {
        GameSession::new(guild_id.into(), GameMode::Classic, "owner".into(), None)
    }

    #[test]
    fn at_most_one_session_per_guild() {
        let mut registry = SessionRegistry::new();
        assert!(registry.create(session("g1")).is_ok());
        assert_eq!(
            registry.create(session("g1")).unwrap_err(),
            SessionError::AlreadyActive("g1".into())
        );
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("g1").is_some());
        assert!(registry.get("g1").is_none());
        assert!(registry.remove("g1").is_none());
        assert!(registry.create(session("g1")).is_ok());
    }

    #[test]
    fn local_stats_count_co_located_scoreboard_players() {
        let presence = PresenceTracker::new();
        presence.join("g1", "p1", false);
        presence.join("g1", "p2", false);
        presence.join("g2", "p3", false);

        let mut registry = SessionRegistry::new();
        let first = registry.create(session("g1")).unwrap();
        first.scoreboard_mut().add_player("p1", false);
        first.scoreboard_mut().add_player("p2", false);
        first.scoreboard_mut().add_player("gone", false);
        registry.create(session("g2")).unwrap();

        assert_eq!(
            registry.local_stats(&presence),
            WorkerStats {
                active_sessions: 2,
                active_players: 2
            }
        );
        assert!(registry.iter().any(|session| session.guild_id() == "g2"));
    }
}
