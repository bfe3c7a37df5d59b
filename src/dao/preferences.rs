use std::time::Duration;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};

use crate::{
    dao::storage::StorageResult,
    state::game::{GameMode, GuildId},
};

/// Default grace window after the first correct guess when multi-guess is on.
pub const DEFAULT_MULTIGUESS_DELAY: Duration = Duration::from_millis(1500);
/// Default pause between two rounds.
pub const DEFAULT_ROUND_START_DELAY: Duration = Duration::from_secs(3);
/// Round timeout of hidden rounds when the guild sets none. Hidden rounds always run a timer.
pub const HIDDEN_GUESS_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-guild options read when a round starts.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildPreferences {
    /// Accept guesses one edit away from an answer.
    pub typos_allowed: bool,
    /// Keep the round open briefly after the first correct guess.
    pub multiguess: bool,
    /// Length of the multi-guess grace window.
    pub multiguess_delay: Duration,
    /// Round timeout. Without one, only hidden rounds are timed (see [`HIDDEN_GUESS_TIMEOUT`]).
    pub guess_timeout: Option<Duration>,
    /// Score ending the game; `None` plays until the session is ended.
    pub goal: Option<u32>,
    /// Pause before every round after the first one.
    pub round_start_delay: Duration,
}

impl Default for GuildPreferences {
    fn default() -> Self {
        Self {
            typos_allowed: true,
            multiguess: false,
            multiguess_delay: DEFAULT_MULTIGUESS_DELAY,
            guess_timeout: None,
            goal: None,
            round_start_delay: DEFAULT_ROUND_START_DELAY,
        }
    }
}

impl GuildPreferences {
    /// Timeout armed for a round of `mode`.
    pub fn round_timeout(&self, mode: GameMode) -> Option<Duration> {
        match (self.guess_timeout, mode) {
            (None, GameMode::Hidden) => Some(HIDDEN_GUESS_TIMEOUT),
            (timeout, _) => timeout,
        }
    }
}

/// Source of per-guild preferences.
pub trait PreferenceStore: Send + Sync {
    /// Preferences of `guild_id`, falling back to defaults for unknown guilds.
    fn preferences(&self, guild_id: &str) -> BoxFuture<'static, StorageResult<GuildPreferences>>;
    /// Replace the preferences of `guild_id`.
    fn save_preferences(
        &self,
        guild_id: &str,
        preferences: GuildPreferences,
    ) -> BoxFuture<'static, StorageResult<()>>;
}

/// Process-local preference store seeded with configured defaults.
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    defaults: GuildPreferences,
    overrides: DashMap<GuildId, GuildPreferences>,
}

impl InMemoryPreferenceStore {
    /// Store answering `defaults` for guilds without overrides.
    pub fn new(defaults: GuildPreferences) -> Self {
        Self {
            defaults,
            overrides: DashMap::new(),
        }
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn preferences(&self, guild_id: &str) -> BoxFuture<'static, StorageResult<GuildPreferences>> {
        let preferences = self
            .overrides
            .get(guild_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.defaults.clone());
        Box::pin(future::ready(Ok(preferences)))
    }

    fn save_preferences(
        &self,
        guild_id: &str,
        preferences: GuildPreferences,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.overrides.insert(guild_id.to_string(), preferences);
        Box::pin(future::ready(Ok(())))
    }
}
