//! Application-level configuration loading: fleet size, engine timings, default guild
//! preferences and the seed song catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dao::{catalog::CatalogSong, preferences::GuildPreferences},
    services::stats::AGGREGATION_DEADLINE,
    state::scoreboard::DEFAULT_STARTING_LIVES,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLIP_TRIVIA_CONFIG_PATH";
const DEFAULT_WORKER_COUNT: u32 = 4;
const DEFAULT_SSE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Number of worker event loops.
    pub worker_count: u32,
    /// How long `/stats` waits for worker replies.
    pub aggregation_deadline: Duration,
    /// Starting lives of elimination sessions that do not pick their own.
    pub elimination_lives: u32,
    /// Buffered events per SSE subscriber.
    pub sse_capacity: usize,
    /// Preferences of guilds that never saved their own.
    pub preferences: GuildPreferences,
    /// Songs dealt to every guild.
    pub catalog: Vec<CatalogSong>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        workers = config.worker_count,
                        songs = config.catalog.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            aggregation_deadline: AGGREGATION_DEADLINE,
            elimination_lives: DEFAULT_STARTING_LIVES,
            sse_capacity: DEFAULT_SSE_CAPACITY,
            preferences: GuildPreferences::default(),
            catalog: default_catalog(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Every key is optional.
struct RawConfig {
    worker_count: Option<u32>,
    aggregation_deadline_ms: Option<u64>,
    elimination_lives: Option<u32>,
    sse_capacity: Option<usize>,
    preferences: Option<RawPreferences>,
    catalog: Option<Vec<CatalogSong>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let catalog = value
            .catalog
            .filter(|songs| !songs.is_empty())
            .unwrap_or(defaults.catalog);
        Self {
            worker_count: value.worker_count.unwrap_or(defaults.worker_count).max(1),
            aggregation_deadline: value
                .aggregation_deadline_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.aggregation_deadline),
            elimination_lives: value
                .elimination_lives
                .unwrap_or(defaults.elimination_lives)
                .max(1),
            sse_capacity: value.sse_capacity.unwrap_or(defaults.sse_capacity).max(1),
            preferences: value
                .preferences
                .map(GuildPreferences::from)
                .unwrap_or(defaults.preferences),
            catalog,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// Default guild preferences as written in the configuration file.
struct RawPreferences {
    typos_allowed: Option<bool>,
    multiguess: Option<bool>,
    multiguess_delay_ms: Option<u64>,
    guess_timeout_ms: Option<u64>,
    goal: Option<u32>,
    round_start_delay_ms: Option<u64>,
}

impl From<RawPreferences> for GuildPreferences {
    fn from(value: RawPreferences) -> Self {
        let defaults = GuildPreferences::default();
        Self {
            typos_allowed: value.typos_allowed.unwrap_or(defaults.typos_allowed),
            multiguess: value.multiguess.unwrap_or(defaults.multiguess),
            multiguess_delay: value
                .multiguess_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.multiguess_delay),
            guess_timeout: value.guess_timeout_ms.map(Duration::from_millis),
            goal: value.goal.filter(|goal| *goal > 0),
            round_start_delay: value
                .round_start_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.round_start_delay),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in catalog shipped with the binary.
fn default_catalog() -> Vec<CatalogSong> {
    [
        ("Bohemian Rhapsody", &["Bohemian"][..]),
        ("Smells Like Teen Spirit", &["Teen Spirit"][..]),
        ("Billie Jean", &[][..]),
        ("Hey Jude", &[][..]),
        ("Like a Rolling Stone", &["Rolling Stone"][..]),
        ("Hotel California", &[][..]),
        ("Sweet Child O' Mine", &["Sweet Child of Mine"][..]),
        ("Rock & Roll", &["Rock and Roll"][..]),
        ("Waterloo", &[][..]),
        ("Dancing Queen", &[][..]),
        ("Take On Me", &[][..]),
        ("Africa", &[][..]),
    ]
    .into_iter()
    .map(|(name, aliases)| CatalogSong {
        name: name.to_string(),
        aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
    })
    .collect()
}
