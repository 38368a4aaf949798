//! Tuosan - a four-player drag-three trick-taking card game engine
//!
//! This crate provides the core game logic for Tuosan, including:
//! - The deck, with point cards (5, 10, K)
//! - Hand classification and the bomb hierarchy
//! - The trick state machine with pass counting, point capture and finish ranks
//! - House-rule hooks for the drag-three obligation and the heart-four steal
//! - Wholesale state snapshots for synchronizing clients
//!
//! # Architecture
//!
//! The engine is pure and platform-agnostic. It can be compiled to:
//! - Native Rust for the table synchronization layer
//! - WebAssembly for browser clients
//!
//! # Modules
//!
//! - [`cards`]: Cards, ranks, suits and deck building
//! - [`hand`]: `classify` and `can_beat`
//! - [`game`]: Round state machine
//! - [`rules`]: House rule extensions
//! - [`snapshot`]: Wire snapshot of a round

pub mod actions;
pub mod bot;
pub mod cards;
pub mod game;
pub mod hand;
pub mod player;
pub mod rules;
pub mod snapshot;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, GameHistory};
pub use bot::{Bot, BotDifficulty};
pub use cards::{Card, CardId, DeckConfig, Rank, Seat, Suit, SEATS};
pub use game::{GameConfig, GameError, GamePhase, GameState, RoundResult};
pub use hand::{can_beat, classify, HandType, PlayedHand};
pub use player::{Player, RoundAction, SeatInfo};
pub use rules::{DragThree, HeartFourSteal, HouseRules, RuleSet, StandardRules};
pub use snapshot::{GameStateSync, TableId};
