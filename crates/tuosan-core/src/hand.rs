//! Hand classification and comparison.
//!
//! [`classify`] turns an arbitrary selection of cards into a [`PlayedHand`];
//! [`can_beat`] decides whether that hand may be played over the hand
//! currently leading the trick.
//!
//! Bomb precedence, low to high:
//! - `Bomb4Plus`: four or more cards of one rank (longer wins, then higher rank)
//! - `Bomb510K`: a 5, a 10 and a K (a single-suit "pure" set beats a mixed one)
//! - `Bomb3SameSuit`: three identical cards (higher rank wins)

use crate::cards::{Card, Rank, Seat};
use serde::{Deserialize, Serialize};

/// Mixed-suit 5-10-K
pub const MIXED_510K: u8 = 0;

/// Single-suit 5-10-K
pub const PURE_510K: u8 = 1;

/// Category of a played hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandType {
    Single,
    Pair,
    Triplet,
    Bomb4Plus,
    Bomb510K,
    Bomb3SameSuit,
    Invalid,
}

impl HandType {
    pub fn is_bomb(&self) -> bool {
        self.bomb_tier().is_some()
    }

    /// Position of a bomb family in the bomb hierarchy
    fn bomb_tier(&self) -> Option<u8> {
        match self {
            HandType::Bomb4Plus => Some(1),
            HandType::Bomb510K => Some(2),
            HandType::Bomb3SameSuit => Some(3),
            _ => None,
        }
    }
}

/// A classified group of cards played by one seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedHand {
    pub cards: Vec<Card>,
    pub player_id: Seat,
    #[serde(rename = "type")]
    pub hand_type: HandType,
    /// Rank value driving comparisons
    pub primary_value: u8,
    /// Number of cards
    pub length: usize,
    /// Only set for 5-10-K bombs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type_level: Option<u8>,
}

impl PlayedHand {
    pub fn is_valid(&self) -> bool {
        self.hand_type != HandType::Invalid
    }

    pub fn is_bomb(&self) -> bool {
        self.hand_type.is_bomb()
    }

    /// Points carried by the cards of this hand
    pub fn points(&self) -> u32 {
        crate::cards::total_points(&self.cards)
    }

    fn invalid(cards: Vec<Card>, player_id: Seat) -> Self {
        let length = cards.len();
        Self {
            cards,
            player_id,
            hand_type: HandType::Invalid,
            primary_value: 0,
            length,
            sub_type_level: None,
        }
    }
}

/// Classify a group of cards. Never panics; unrecognised groups are `Invalid`.
pub fn classify(cards: &[Card], player_id: Seat) -> PlayedHand {
    let mut sorted = cards.to_vec();
    crate::cards::sort_cards(&mut sorted);

    let Some(first) = sorted.first().copied() else {
        return PlayedHand::invalid(sorted, player_id);
    };

    let count = sorted.len();
    let same_rank = sorted.iter().all(|c| c.rank == first.rank);
    let same_suit = sorted.iter().all(|c| c.suit == first.suit);

    let (hand_type, primary_value, sub_type_level) = if count == 3 && same_rank && same_suit {
        (HandType::Bomb3SameSuit, first.value, None)
    } else if is_five_ten_king(&sorted) {
        let level = if same_suit { PURE_510K } else { MIXED_510K };
        (HandType::Bomb510K, Rank::King.value(), Some(level))
    } else if same_rank && count >= 4 {
        (HandType::Bomb4Plus, first.value, None)
    } else if count == 1 {
        (HandType::Single, first.value, None)
    } else if count == 2 && same_rank {
        (HandType::Pair, first.value, None)
    } else if count == 3 && same_rank {
        (HandType::Triplet, first.value, None)
    } else {
        return PlayedHand::invalid(sorted, player_id);
    };

    PlayedHand {
        cards: sorted,
        player_id,
        hand_type,
        primary_value,
        length: count,
        sub_type_level,
    }
}

/// Exactly one 5, one 10 and one K (input sorted by value)
fn is_five_ten_king(sorted: &[Card]) -> bool {
    matches!(
        sorted,
        [a, b, c] if a.rank == Rank::Five && b.rank == Rank::Ten && c.rank == Rank::King
    )
}

/// Whether `candidate` may be played over `leading`.
///
/// With no leading hand (opening a trick) any valid hand is accepted. The
/// relation is irreflexive: a hand never beats an identical classification.
pub fn can_beat(candidate: &PlayedHand, leading: Option<&PlayedHand>) -> bool {
    if !candidate.is_valid() {
        return false;
    }
    let Some(leading) = leading else {
        return true;
    };

    match (candidate.hand_type.bomb_tier(), leading.hand_type.bomb_tier()) {
        (None, None) => {
            candidate.hand_type == leading.hand_type
                && candidate.length == leading.length
                && candidate.primary_value > leading.primary_value
        }
        (None, Some(_)) => false,
        (Some(_), None) => true,
        (Some(c), Some(l)) if c != l => c > l,
        (Some(_), Some(_)) => match candidate.hand_type {
            HandType::Bomb4Plus => {
                (candidate.length, candidate.primary_value)
                    > (leading.length, leading.primary_value)
            }
            HandType::Bomb510K => {
                candidate.sub_type_level.unwrap_or(MIXED_510K)
                    > leading.sub_type_level.unwrap_or(MIXED_510K)
            }
            HandType::Bomb3SameSuit => candidate.primary_value > leading.primary_value,
            _ => false,
        },
    }
}
