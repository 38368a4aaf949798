//! Runtime configuration for the table synchronization layer.
//!
//! Consolidates the `TUOSAN_*` environment variables and falls back to
//! defaults for anything unset or unparsable.

use std::path::PathBuf;
use std::str::FromStr;
use tuosan_core::{BotDifficulty, DeckConfig, DragThree, GameConfig, HeartFourSteal, RuleSet};

/// Namespace of the persisted table record
pub const DEFAULT_STORE_KEY: &str = "tuosan_tables_v1";

/// Credential accepted by the administrative reset
pub const DEFAULT_ADMIN_SECRET: &str = "root";

pub const DEFAULT_TABLES: u32 = 10;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Complete configuration of a client session
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of tables in the lobby
    pub tables: u32,
    /// Key of the shared table record
    pub store_key: String,
    pub admin_secret: String,
    /// JSON file backing the shared store; in-memory when `None`
    pub store_path: Option<PathBuf>,
    /// Buffered messages per broadcast receiver before it lags
    pub channel_capacity: usize,
    /// Difficulty of the bots filling empty seats
    pub bot_difficulty: BotDifficulty,
    /// Deck and house rules for every round dealt
    pub game: GameConfig,
    /// Count steal windows down in real time; otherwise only on `Tick`
    pub auto_tick: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tables: DEFAULT_TABLES,
            store_key: DEFAULT_STORE_KEY.to_string(),
            admin_secret: DEFAULT_ADMIN_SECRET.to_string(),
            store_path: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            bot_difficulty: BotDifficulty::Medium,
            game: GameConfig::default(),
            auto_tick: true,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// - `TUOSAN_TABLES`: lobby size
    /// - `TUOSAN_STORE_KEY`: record namespace
    /// - `TUOSAN_ADMIN_SECRET`: reset credential
    /// - `TUOSAN_STORE_PATH`: JSON file for the shared store
    /// - `TUOSAN_CHANNEL_CAPACITY`: broadcast buffer
    /// - `TUOSAN_DECKS`: decks per deal (1-4)
    /// - `TUOSAN_DRAG_THREE`: enable the drag-three obligation
    /// - `TUOSAN_STEAL_WINDOW_SECS`: enable the heart-four steal (0 disables)
    /// - `TUOSAN_BOT_DIFFICULTY`: `easy`, `medium` or `hard`
    /// - `TUOSAN_AUTO_TICK`: real-time steal window clock
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut rules = RuleSet::standard();
        if parse_env_or("TUOSAN_DRAG_THREE", false) {
            rules = rules.with_drag_three(DragThree::default());
        }
        let window_secs = parse_env_or("TUOSAN_STEAL_WINDOW_SECS", 0u32);
        if window_secs > 0 {
            rules = rules.with_heart_four_steal(HeartFourSteal { window_secs });
        }

        let bot_difficulty = match std::env::var("TUOSAN_BOT_DIFFICULTY").as_deref() {
            Ok("easy") => BotDifficulty::Easy,
            Ok("hard") => BotDifficulty::Hard,
            _ => defaults.bot_difficulty,
        };

        Self {
            tables: parse_env_or("TUOSAN_TABLES", defaults.tables).max(1),
            store_key: std::env::var("TUOSAN_STORE_KEY").unwrap_or(defaults.store_key),
            admin_secret: std::env::var("TUOSAN_ADMIN_SECRET").unwrap_or(defaults.admin_secret),
            store_path: std::env::var("TUOSAN_STORE_PATH").ok().map(PathBuf::from),
            channel_capacity: parse_env_or("TUOSAN_CHANNEL_CAPACITY", defaults.channel_capacity)
                .max(1),
            bot_difficulty,
            game: GameConfig {
                deck: DeckConfig::new(parse_env_or("TUOSAN_DECKS", defaults.game.deck.decks)),
                rules,
                seed: None,
            },
            auto_tick: parse_env_or("TUOSAN_AUTO_TICK", defaults.auto_tick),
        }
    }
}

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.tables, 10);
        assert_eq!(config.store_key, "tuosan_tables_v1");
        assert_eq!(config.admin_secret, "root");
        assert_eq!(config.game.deck.decks, 2);
        assert!(config.game.rules.drag_three.is_none());
    }

    #[test]
    fn test_parse_env_or_falls_back() {
        assert_eq!(parse_env_or("TUOSAN_TEST_UNSET_VARIABLE", 7u32), 7);
    }
}
