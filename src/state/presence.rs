use dashmap::DashMap;
use indexmap::IndexSet;

use crate::state::game::{GuildId, PlayerId};

/// Voice presence as seen by the engine.
pub trait PresenceProvider: Send + Sync {
    /// Non-bot participants currently co-located with the guild's session.
    fn active_participant_count(&self, guild_id: &str) -> usize;
    /// Whether `player_id` is currently co-located with the guild's session.
    fn is_co_located(&self, guild_id: &str, player_id: &str) -> bool;
    /// Co-located participants in arrival order.
    fn co_located_players(&self, guild_id: &str) -> Vec<PlayerId>;
}

/// Presence fed by gateway join/leave events.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    guilds: DashMap<GuildId, IndexSet<PlayerId>>,
}

impl PresenceTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a participant joining the guild's voice channel. Bots are never tracked.
    /// Returns `true` when the participant was not already present.
    pub fn join(&self, guild_id: &str, player_id: &str, bot: bool) -> bool {
        if bot {
            return false;
        }
        self.guilds
            .entry(guild_id.to_string())
            .or_default()
            .insert(player_id.to_string())
    }

    /// Record a participant leaving. Returns `true` when they were present.
    pub fn leave(&self, guild_id: &str, player_id: &str) -> bool {
        let Some(mut players) = self.guilds.get_mut(guild_id) else {
            return false;
        };
        let removed = players.shift_remove(player_id);
        let empty = players.is_empty();
        drop(players);
        if empty {
            self.guilds.remove_if(guild_id, |_, players| players.is_empty());
        }
        removed
    }
}

impl PresenceProvider for PresenceTracker {
    fn active_participant_count(&self, guild_id: &str) -> usize {
        self.guilds
            .get(guild_id)
            .map(|players| players.len())
            .unwrap_or(0)
    }

    fn is_co_located(&self, guild_id: &str, player_id: &str) -> bool {
        self.guilds
            .get(guild_id)
            .is_some_and(|players| players.contains(player_id))
    }

    fn co_located_players(&self, guild_id: &str) -> Vec<PlayerId> {
        self.guilds
            .get(guild_id)
            .map(|players| players.iter().cloned().collect())
            .unwrap_or_default()
    }
}
