use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    dao::{preferences::GuildPreferences, storage::StorageError},
    state::game::{AnswerSet, GuildId},
};

/// Failure to pick the next clip for a round.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// There is nothing to pick from.
    #[error("song catalog is empty")]
    EmptyCatalog,
    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A playable clip with its accepted names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogSong {
    /// Canonical name.
    pub name: String,
    /// Alternative accepted names.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl From<&CatalogSong> for AnswerSet {
    fn from(song: &CatalogSong) -> Self {
        AnswerSet::new(song.name.clone(), song.aliases.clone())
    }
}

/// Picks the answer set of the next round for a guild.
pub trait SongSelector: Send + Sync {
    /// Next answer set to play in `guild_id`.
    fn next_answer_set(
        &self,
        guild_id: &str,
        preferences: &GuildPreferences,
    ) -> BoxFuture<'static, Result<AnswerSet, SelectionError>>;
}

/// Fixed catalog dealt to each guild as a shuffled deck, so no clip repeats before
/// the whole catalog was played.
#[derive(Debug)]
pub struct InMemoryCatalog {
    songs: Vec<CatalogSong>,
    decks: DashMap<GuildId, Vec<usize>>,
}

impl InMemoryCatalog {
    /// Catalog over `songs`.
    pub fn new(songs: Vec<CatalogSong>) -> Self {
        Self {
            songs,
            decks: DashMap::new(),
        }
    }

    /// Number of songs in the catalog.
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Whether the catalog has no songs.
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    fn draw(&self, guild_id: &str) -> Result<AnswerSet, SelectionError> {
        if self.songs.is_empty() {
            return Err(SelectionError::EmptyCatalog);
        }

        let mut deck = self.decks.entry(guild_id.to_string()).or_default();
        if deck.is_empty() {
            let mut fresh: Vec<usize> = (0..self.songs.len()).collect();
            fresh.shuffle(&mut rand::rng());
            *deck = fresh;
        }

        let index = deck.pop().ok_or(SelectionError::EmptyCatalog)?;
        Ok(AnswerSet::from(&self.songs[index]))
    }
}

impl SongSelector for InMemoryCatalog {
    fn next_answer_set(
        &self,
        guild_id: &str,
        _preferences: &GuildPreferences,
    ) -> BoxFuture<'static, Result<AnswerSet, SelectionError>> {
        Box::pin(future::ready(self.draw(guild_id)))
    }
}
