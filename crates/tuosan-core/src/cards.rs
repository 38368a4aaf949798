//! Cards and the deck.
//!
//! A deal uses one or more standard 54-card decks (52 cards plus two jokers).
//! Every card carries a sortable value (3 lowest, big joker highest) and a
//! point value: fives are worth 5, tens and kings are worth 10.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seat index at a table (0-3)
pub type Seat = u8;

/// Number of seats at every table
pub const SEATS: usize = 4;

/// Unique card identity within a deal
pub type CardId = u16;

/// Card suit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spade,
    #[serde(rename = "♥")]
    Heart,
    #[serde(rename = "♣")]
    Club,
    #[serde(rename = "♦")]
    Diamond,
    #[serde(rename = "★")]
    Joker,
}

impl Suit {
    /// The four regular suits
    pub const STANDARD: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Club, Suit::Diamond];

    pub fn symbol(&self) -> char {
        match self {
            Suit::Spade => '♠',
            Suit::Heart => '♥',
            Suit::Club => '♣',
            Suit::Diamond => '♦',
            Suit::Joker => '★',
        }
    }
}

/// Card rank, declared in playing strength order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "SJ")]
    SmallJoker,
    #[serde(rename = "BJ")]
    BigJoker,
}

impl Rank {
    /// The thirteen ranks found in every regular suit
    pub const STANDARD: [Rank; 13] = [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Two,
    ];

    /// Sortable value: 3 = 3 ... A = 14, 2 = 15, SJ = 16, BJ = 17
    pub const fn value(self) -> u8 {
        self as u8 + 3
    }

    /// Points captured with this rank
    pub const fn points(self) -> u8 {
        match self {
            Rank::Five => 5,
            Rank::Ten | Rank::King => 10,
            _ => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::SmallJoker => "SJ",
            Rank::BigJoker => "BJ",
        }
    }
}

/// A single dealt card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub suit: Suit,
    pub rank: Rank,
    pub value: u8,
    pub points: u8,
}

impl Card {
    pub fn new(id: CardId, suit: Suit, rank: Rank) -> Self {
        Self {
            id,
            suit,
            rank,
            value: rank.value(),
            points: rank.points(),
        }
    }

    /// Whether this is a heart four (the first-lead marker card)
    pub fn is_heart_four(&self) -> bool {
        self.suit == Suit::Heart && self.rank == Rank::Four
    }

    pub fn is_point_card(&self) -> bool {
        self.points > 0
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank {
            Rank::SmallJoker | Rank::BigJoker => write!(f, "{}", self.rank.label()),
            _ => write!(f, "{}{}", self.suit.symbol(), self.rank.label()),
        }
    }
}

/// Deck composition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Number of 54-card decks shuffled together (1-4)
    pub decks: u8,
}

impl DeckConfig {
    pub const MAX_DECKS: u8 = 4;

    pub fn new(decks: u8) -> Self {
        Self {
            decks: decks.clamp(1, Self::MAX_DECKS),
        }
    }

    /// Total number of cards
    pub fn size(&self) -> usize {
        self.decks as usize * 54
    }

    /// Build the unshuffled deck with sequential card ids
    pub fn build(&self) -> Vec<Card> {
        let mut deck = Vec::with_capacity(self.size());
        let mut next_id: CardId = 0;
        let mut push = |suit, rank| {
            deck.push(Card::new(next_id, suit, rank));
            next_id += 1;
        };

        for _ in 0..self.decks {
            for suit in Suit::STANDARD {
                for rank in Rank::STANDARD {
                    push(suit, rank);
                }
            }
            push(Suit::Joker, Rank::SmallJoker);
            push(Suit::Joker, Rank::BigJoker);
        }

        deck
    }
}

impl Default for DeckConfig {
    /// Two decks: 108 cards, 27 per seat
    fn default() -> Self {
        Self { decks: 2 }
    }
}

/// Shuffle a deck
pub fn shuffle_deck<R: Rng>(deck: &mut [Card], rng: &mut R) {
    deck.shuffle(rng);
}

/// Sort a hand by value, then suit, then id
pub fn sort_cards(cards: &mut [Card]) {
    cards.sort_by_key(|c| (c.value, c.suit, c.id));
}

/// Sum of point values
pub fn total_points(cards: &[Card]) -> u32 {
    cards.iter().map(|c| c.points as u32).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rank_values_strictly_increase() {
        let mut all: Vec<Rank> = Rank::STANDARD.to_vec();
        all.push(Rank::SmallJoker);
        all.push(Rank::BigJoker);

        assert_eq!(Rank::Three.value(), 3);
        assert_eq!(Rank::Ace.value(), 14);
        assert_eq!(Rank::Two.value(), 15);
        assert_eq!(Rank::BigJoker.value(), 17);
        assert!(all.windows(2).all(|w| w[0].value() < w[1].value()));
    }

    #[test]
    fn test_point_cards() {
        assert_eq!(Rank::Five.points(), 5);
        assert_eq!(Rank::Ten.points(), 10);
        assert_eq!(Rank::King.points(), 10);
        assert_eq!(Rank::Queen.points(), 0);
    }

    #[test]
    fn test_default_deck_has_108_unique_cards() {
        let deck = DeckConfig::default().build();
        assert_eq!(deck.len(), 108);

        let ids: HashSet<CardId> = deck.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 108);

        // Two decks hold 2 * (4 fives + 4 tens + 4 kings) point cards
        assert_eq!(total_points(&deck), 2 * (4 * 5 + 4 * 10 + 4 * 10));
        assert_eq!(deck.iter().filter(|c| c.is_heart_four()).count(), 2);
    }

    #[test]
    fn test_deck_config_clamps() {
        assert_eq!(DeckConfig::new(0).decks, 1);
        assert_eq!(DeckConfig::new(9).decks, DeckConfig::MAX_DECKS);
    }

    #[test]
    fn test_card_serde_uses_symbols() {
        let card = Card::new(7, Suit::Heart, Rank::Ten);
        let json = serde_json::to_value(card).unwrap();
        assert_eq!(json["suit"], "♥");
        assert_eq!(json["rank"], "10");
        assert_eq!(json["value"], 10);
        assert_eq!(json["points"], 10);
        assert_eq!(card.to_string(), "♥10");
    }
}
