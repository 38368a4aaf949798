//! Game actions that players can take.
//!
//! This module defines all possible actions in a round and the events
//! that result from those actions.

use crate::cards::{CardId, Seat};
use crate::hand::PlayedHand;
use crate::player::RoundAction;
use serde::{Deserialize, Serialize};

/// All possible actions a seat can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Play the given cards (lead or follow)
    Play(Vec<CardId>),
    /// Decline to beat the leading hand
    Pass,
    /// Interrupt turn order during an open steal window
    Steal(Vec<CardId>),
    /// Give up an open steal window early
    DeclineSteal,
}

/// One entry of the round log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameHistory {
    pub turn: u32,
    pub player_id: Seat,
    pub action: RoundAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<crate::cards::Card>>,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A hand was played
    HandPlayed { player: Seat, hand: PlayedHand },

    /// A seat passed
    Passed { player: Seat },

    /// A seat with no legal lead handed the lead on
    LeadForfeited { player: Seat },

    /// A trick closed; its point cards went to the leader
    TrickWon { player: Seat, team: u8, points: u32 },

    /// A seat emptied its hand
    PlayerFinished { player: Seat, rank: u8 },

    /// A steal window opened for a seat
    StealWindowOpened { player: Seat, seconds: u32 },

    /// A steal window ended without a steal
    StealWindowClosed { player: Seat },

    /// Turn moved to another seat
    TurnChanged { player: Seat },

    /// The round is over
    RoundOver {
        winners: Vec<Seat>,
        team_points: [u32; 2],
    },
}
