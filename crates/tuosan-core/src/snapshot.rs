//! Wire snapshot of a round.
//!
//! Clients never exchange deltas: every update carries the whole
//! [`GameState`], tagged with the table it belongs to and a version counter.

use crate::game::GameState;
use serde::{Deserialize, Serialize};

/// Lobby table index
pub type TableId = u32;

/// Full serializable projection of a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSync {
    pub table_id: TableId,
    /// Increases with every accepted action on the table
    pub version: u64,
    #[serde(flatten)]
    pub state: GameState,
}

impl GameStateSync {
    pub fn new(table_id: TableId, version: u64, state: GameState) -> Self {
        Self {
            table_id,
            version,
            state,
        }
    }

    /// Whether this snapshot should replace `current`.
    ///
    /// Equal versions are accepted so that a re-sent snapshot is harmless.
    pub fn supersedes(&self, current: Option<&GameStateSync>) -> bool {
        match current {
            None => true,
            Some(current) => self.table_id != current.table_id || self.version >= current.version,
        }
    }

    /// The snapshot that follows this one after a local action
    pub fn next(&self, state: GameState) -> Self {
        Self::new(self.table_id, self.version + 1, state)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
