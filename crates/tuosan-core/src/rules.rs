//! House rule extensions.
//!
//! The trick loop itself is fixed; anything that varies between tables
//! (who opens, final-play obligations, out-of-turn steals) goes through the
//! [`HouseRules`] hooks. [`RuleSet`] is the serializable selection of rules a
//! round is played with.

use crate::cards::Seat;
use crate::game::{GameError, GameState};
use crate::hand::PlayedHand;
use crate::player::Player;
use serde::{Deserialize, Serialize};

/// Hooks consulted by the trick engine
pub trait HouseRules {
    /// Seat leading the first trick
    fn opener(&self, game: &GameState) -> Seat {
        game.first_rh4_player.unwrap_or(0)
    }

    /// Called once after dealing
    fn on_deal(&self, _players: &mut [Player]) {}

    /// Extra validation of an otherwise legal play. Must not mutate.
    fn check_play(&self, _game: &GameState, _seat: Seat, _hand: &PlayedHand) -> Result<(), GameError> {
        Ok(())
    }

    /// Seat allowed to interrupt after `played_by` made an accepted play
    fn steal_seat(&self, _game: &GameState, _played_by: Seat, _led: bool) -> Option<Seat> {
        None
    }

    /// Length of a steal window
    fn steal_window_secs(&self) -> u32 {
        0
    }
}

/// Plain rules: heart-four holder opens with a heart four, no obligations,
/// no steals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardRules;

impl HouseRules for StandardRules {
    /// Until the first play lands, a seat holding a heart four must play one.
    /// Seats without one (after a forfeited lead) lead freely.
    fn check_play(&self, game: &GameState, seat: Seat, hand: &PlayedHand) -> Result<(), GameError> {
        if !game.is_first_turn_of_game {
            return Ok(());
        }
        let holds = game.get_player(seat).map(|p| p.heart_fours() > 0).unwrap_or(false);
        if holds && !hand.cards.iter().any(|c| c.is_heart_four()) {
            return Err(GameError::MustLeadHeartFour);
        }
        Ok(())
    }
}

/// Every seat must go out on a play of exactly `final_size` cards.
///
/// Plays that would leave a hand smaller than the obligation (but not empty)
/// are rejected too, since they could never be finished legally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragThree {
    pub final_size: u8,
}

impl Default for DragThree {
    fn default() -> Self {
        Self { final_size: 3 }
    }
}

impl HouseRules for DragThree {
    fn on_deal(&self, players: &mut [Player]) {
        for p in players {
            p.drag_three = Some(self.final_size);
        }
    }

    fn check_play(&self, game: &GameState, seat: Seat, hand: &PlayedHand) -> Result<(), GameError> {
        let Some(player) = game.get_player(seat) else {
            return Err(GameError::InvalidSeat);
        };
        let Some(required) = player.drag_three else {
            return Ok(());
        };

        let remaining = player.card_count().saturating_sub(hand.length);
        let required = required as usize;
        if remaining == 0 && hand.length != required {
            return Err(GameError::DragThreeViolation { required });
        }
        if remaining > 0 && remaining < required {
            return Err(GameError::DragThreeViolation { required });
        }
        Ok(())
    }
}

/// The seat holding every heart four may play out of turn right after a
/// trick is led, within a short window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartFourSteal {
    pub window_secs: u32,
}

impl Default for HeartFourSteal {
    fn default() -> Self {
        Self { window_secs: 10 }
    }
}

impl HouseRules for HeartFourSteal {
    fn steal_seat(&self, game: &GameState, played_by: Seat, led: bool) -> Option<Seat> {
        if !led {
            return None;
        }
        let seat = game.double_rh4_player?;
        let player = game.get_player(seat)?;
        let eligible = seat != played_by
            && seat != game.turn
            && player.is_active()
            && player.heart_fours() > 0;
        eligible.then_some(seat)
    }

    fn steal_window_secs(&self) -> u32 {
        self.window_secs
    }
}

/// Rules a round is played with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default)]
    pub drag_three: Option<DragThree>,
    #[serde(default)]
    pub heart_four_steal: Option<HeartFourSteal>,
}

impl RuleSet {
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn with_drag_three(mut self, rule: DragThree) -> Self {
        self.drag_three = Some(rule);
        self
    }

    pub fn with_heart_four_steal(mut self, rule: HeartFourSteal) -> Self {
        self.heart_four_steal = Some(rule);
        self
    }
}

impl HouseRules for RuleSet {
    fn opener(&self, game: &GameState) -> Seat {
        StandardRules.opener(game)
    }

    fn on_deal(&self, players: &mut [Player]) {
        if let Some(rule) = &self.drag_three {
            rule.on_deal(players);
        }
    }

    fn check_play(&self, game: &GameState, seat: Seat, hand: &PlayedHand) -> Result<(), GameError> {
        StandardRules.check_play(game, seat, hand)?;
        match &self.drag_three {
            Some(rule) => rule.check_play(game, seat, hand),
            None => Ok(()),
        }
    }

    fn steal_seat(&self, game: &GameState, played_by: Seat, led: bool) -> Option<Seat> {
        self.heart_four_steal
            .as_ref()
            .and_then(|rule| rule.steal_seat(game, played_by, led))
    }

    fn steal_window_secs(&self) -> u32 {
        self.heart_four_steal
            .map(|rule| rule.steal_window_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::GameAction;
    use crate::cards::{Card, Rank, Suit};
    use crate::hand::classify;
    use crate::player::SeatInfo;

    fn seats() -> Vec<SeatInfo> {
        (0..4).map(|i| SeatInfo::bot(format!("Bot {}", i))).collect()
    }

    fn numbered(start: u16, spec: &[(Suit, Rank)]) -> Vec<Card> {
        spec.iter()
            .enumerate()
            .map(|(i, &(s, r))| Card::new(start + i as u16, s, r))
            .collect()
    }

    #[test]
    fn test_drag_three_final_play_must_be_three_cards() {
        let hands = vec![
            numbered(0, &[(Suit::Spade, Rank::Six), (Suit::Heart, Rank::Six)]),
            numbered(10, &[(Suit::Spade, Rank::Seven); 5]),
            numbered(20, &[(Suit::Club, Rank::Eight); 5]),
            numbered(30, &[(Suit::Diamond, Rank::Nine); 5]),
        ];
        let rules = RuleSet::standard().with_drag_three(DragThree::default());
        let game = GameState::from_hands(seats(), hands, rules, 0).unwrap();
        assert_eq!(game.players[0].drag_three, Some(3));

        let pair = classify(&game.players[0].hand, 0);
        assert_eq!(
            rules.check_play(&game, 0, &pair),
            Err(GameError::DragThreeViolation { required: 3 })
        );
    }

    #[test]
    fn test_drag_three_rejects_stranding_plays() {
        let hands = vec![
            numbered(0, &[
                (Suit::Spade, Rank::Six),
                (Suit::Heart, Rank::Six),
                (Suit::Club, Rank::Six),
                (Suit::Spade, Rank::Nine),
            ]),
            numbered(10, &[(Suit::Spade, Rank::Seven); 5]),
            numbered(20, &[(Suit::Club, Rank::Eight); 5]),
            numbered(30, &[(Suit::Diamond, Rank::Nine); 5]),
        ];
        let rules = RuleSet::standard().with_drag_three(DragThree::default());
        let game = GameState::from_hands(seats(), hands, rules, 0).unwrap();

        // Leading the nine leaves three sixes: fine
        let nine = classify(&game.players[0].hand[3..], 0);
        assert!(rules.check_play(&game, 0, &nine).is_ok());

        // Leading a pair of sixes leaves two cards: stranded
        let sixes = classify(&game.players[0].hand[..2], 0);
        assert_eq!(sixes.hand_type, crate::hand::HandType::Pair);
        assert!(rules.check_play(&game, 0, &sixes).is_err());
    }

    #[test]
    fn test_opening_play_must_include_heart_four() {
        let hands = vec![
            numbered(0, &[(Suit::Heart, Rank::Four), (Suit::Spade, Rank::Nine), (Suit::Spade, Rank::Three)]),
            numbered(10, &[(Suit::Spade, Rank::Seven), (Suit::Spade, Rank::Eight)]),
            numbered(20, &[(Suit::Club, Rank::Eight)]),
            numbered(30, &[(Suit::Diamond, Rank::Nine)]),
        ];
        let mut game = GameState::from_hands(seats(), hands, RuleSet::standard(), 0).unwrap();
        assert_eq!(game.turn, 0);
        assert!(game.is_first_turn_of_game);

        let pick = |game: &GameState, rank: Rank| {
            game.players[0].hand.iter().find(|c| c.rank == rank).map(|c| c.id).unwrap()
        };
        let nine = vec![pick(&game, Rank::Nine)];
        let before = game.clone();
        assert_eq!(
            game.apply_action(0, GameAction::Play(nine.clone())),
            Err(GameError::MustLeadHeartFour)
        );
        assert_eq!(game, before);
        assert!(game
            .valid_plays(0)
            .iter()
            .all(|h| h.cards.iter().any(|c| c.is_heart_four())));

        let four = vec![pick(&game, Rank::Four)];
        game.apply_action(0, GameAction::Play(four)).unwrap();
        assert!(!game.is_first_turn_of_game);

        // Later leads are free
        for seat in 1..=3 {
            game.apply_action(seat, GameAction::Pass).unwrap();
        }
        game.apply_action(0, GameAction::Play(nine)).unwrap();
    }

    #[test]
    fn test_standard_rules_never_steal() {
        let game = GameState::new_standard_4player();
        assert_eq!(RuleSet::standard().steal_seat(&game, 0, true), None);
        assert_eq!(RuleSet::standard().steal_window_secs(), 0);
    }

    #[test]
    fn test_heart_four_steal_requires_double_holder() {
        let hands = vec![
            numbered(0, &[(Suit::Spade, Rank::Six), (Suit::Heart, Rank::Seven)]),
            numbered(10, &[(Suit::Spade, Rank::Seven), (Suit::Spade, Rank::Eight)]),
            numbered(20, &[(Suit::Heart, Rank::Four), (Suit::Heart, Rank::Four), (Suit::Club, Rank::Ace)]),
            numbered(30, &[(Suit::Diamond, Rank::Nine), (Suit::Diamond, Rank::Ten)]),
        ];
        let rules = RuleSet::standard().with_heart_four_steal(HeartFourSteal::default());
        let mut game = GameState::from_hands(seats(), hands, rules, 0).unwrap();
        assert_eq!(game.double_rh4_player, Some(2));

        // Seat 2 may steal after seat 0 leads, while seat 1 is to act
        game.turn = 1;
        assert_eq!(rules.steal_seat(&game, 0, true), Some(2));
        // Not on follows, and not when it is already seat 2's turn
        assert_eq!(rules.steal_seat(&game, 0, false), None);
        game.turn = 2;
        assert_eq!(rules.steal_seat(&game, 1, true), None);
    }
}
