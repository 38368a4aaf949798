//! Player state for a single round.
//!
//! This module contains:
//! - Player struct with hand, captured points and finish rank
//! - Seat descriptions used to create a round
//! - Per-trick display state

use crate::cards::{self, Card, CardId, Seat};
use serde::{Deserialize, Serialize};

/// What a player did in the current trick (for display)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundAction {
    Play,
    Pass,
}

/// Who sits in a seat when a round is dealt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub name: String,
    pub is_bot: bool,
    /// Lobby identity of a human player
    pub network_id: Option<String>,
}

impl SeatInfo {
    pub fn human(name: impl Into<String>, network_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_bot: false,
            network_id: Some(network_id.into()),
        }
    }

    pub fn bot(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_bot: true,
            network_id: None,
        }
    }
}

/// A player in the current round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Seat index (0-3)
    pub id: Seat,
    pub name: String,
    pub is_bot: bool,
    /// Cards still held, sorted by value
    pub hand: Vec<Card>,
    /// Partnership: seats 0 and 2 against seats 1 and 3
    pub team: u8,
    /// Points captured this round
    pub score: u32,
    pub cards_points_captured: Vec<Card>,
    /// 1-based order in which this player emptied their hand
    pub finished_rank: Option<u8>,
    /// Cards of this player's most recent play
    pub last_played_hand: Option<Vec<Card>>,
    /// Declared final-play size (drag-three obligation)
    #[serde(default)]
    pub drag_three: Option<u8>,
    #[serde(default)]
    pub network_id: Option<String>,
    pub current_round_action: Option<RoundAction>,
    pub current_round_cards: Option<Vec<Card>>,
}

impl Player {
    pub fn new(id: Seat, seat: SeatInfo) -> Self {
        Self {
            id,
            name: seat.name,
            is_bot: seat.is_bot,
            hand: Vec::new(),
            team: Self::team_of(id),
            score: 0,
            cards_points_captured: Vec::new(),
            finished_rank: None,
            last_played_hand: None,
            drag_three: None,
            network_id: seat.network_id,
            current_round_action: None,
            current_round_cards: None,
        }
    }

    /// Team of a seat
    pub fn team_of(seat: Seat) -> u8 {
        seat % 2
    }

    pub fn is_finished(&self) -> bool {
        self.finished_rank.is_some()
    }

    /// Whether the player still holds cards and has no rank yet
    pub fn is_active(&self) -> bool {
        !self.is_finished() && !self.hand.is_empty()
    }

    pub fn card_count(&self) -> usize {
        self.hand.len()
    }

    /// Receive dealt cards
    pub fn receive(&mut self, dealt: Vec<Card>) {
        self.hand.extend(dealt);
        cards::sort_cards(&mut self.hand);
    }

    pub fn heart_fours(&self) -> usize {
        self.hand.iter().filter(|c| c.is_heart_four()).count()
    }

    /// Look up the given cards in hand. Returns `None` if any id is missing
    /// or repeated.
    pub fn find_cards(&self, ids: &[CardId]) -> Option<Vec<Card>> {
        let mut found: Vec<Card> = Vec::with_capacity(ids.len());
        for id in ids {
            if found.iter().any(|c| c.id == *id) {
                return None;
            }
            found.push(*self.hand.iter().find(|c| c.id == *id)?);
        }
        Some(found)
    }

    /// Remove cards from hand (ids must have been checked with `find_cards`)
    pub fn remove_cards(&mut self, ids: &[CardId]) {
        self.hand.retain(|c| !ids.contains(&c.id));
    }

    /// Take the point cards of a won trick
    pub fn capture(&mut self, won: Vec<Card>) -> u32 {
        let points = cards::total_points(&won);
        self.score += points;
        self.cards_points_captured.extend(won);
        points
    }

    pub fn clear_round_display(&mut self) {
        self.current_round_action = None;
        self.current_round_cards = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Rank, Suit};

    fn sample_player() -> Player {
        let mut p = Player::new(2, SeatInfo::human("Ana", "user-1"));
        p.receive(vec![
            Card::new(10, Suit::Spade, Rank::King),
            Card::new(11, Suit::Heart, Rank::Four),
            Card::new(12, Suit::Club, Rank::Five),
        ]);
        p
    }

    #[test]
    fn test_new_player_team() {
        assert_eq!(Player::new(0, SeatInfo::bot("B")).team, 0);
        assert_eq!(Player::new(1, SeatInfo::bot("B")).team, 1);
        assert_eq!(Player::new(2, SeatInfo::bot("B")).team, 0);
        assert_eq!(Player::new(3, SeatInfo::bot("B")).team, 1);
    }

    #[test]
    fn test_hand_sorted_on_receive() {
        let p = sample_player();
        let values: Vec<u8> = p.hand.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![4, 5, 13]);
        assert_eq!(p.heart_fours(), 1);
    }

    #[test]
    fn test_find_cards_rejects_missing_and_duplicates() {
        let p = sample_player();
        assert_eq!(p.find_cards(&[10, 12]).map(|c| c.len()), Some(2));
        assert!(p.find_cards(&[10, 99]).is_none());
        assert!(p.find_cards(&[10, 10]).is_none());
    }

    #[test]
    fn test_capture_adds_points() {
        let mut p = sample_player();
        let won = vec![
            Card::new(20, Suit::Club, Rank::Ten),
            Card::new(21, Suit::Club, Rank::Five),
        ];
        assert_eq!(p.capture(won), 15);
        assert_eq!(p.score, 15);
        assert_eq!(p.cards_points_captured.len(), 2);
    }
}
