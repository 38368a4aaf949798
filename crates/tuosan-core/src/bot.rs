//! AI bot players for Tuosan.
//!
//! This module provides different difficulty levels of AI players:
//! - Easy: Random valid moves
//! - Medium: Cheapest play that works, bombs only for points
//! - Hard: Partner-aware; saves bombs for points or a nearly-finished opponent

use crate::actions::GameAction;
use crate::cards::{total_points, CardId, Seat};
use crate::game::{GamePhase, GameState};
use crate::hand::PlayedHand;
use crate::player::Player;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Trick value at which a bot is willing to spend a bomb
const BOMB_FOR_POINTS: u32 = 10;

/// Opponent hand size at which a hard bot bombs to slow them down
const OPPONENT_NEARLY_OUT: usize = 3;

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

/// A bot player that can decide on actions
pub struct Bot {
    pub seat: Seat,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(seat: Seat, difficulty: BotDifficulty) -> Self {
        Self {
            seat,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seat: Seat, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            seat,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action, or `None` when this seat has nothing to do
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        match game.phase {
            GamePhase::RoundOver => None,
            // Bots never interrupt; they let the window go
            GamePhase::StealWindow { seat } => {
                (seat == self.seat).then_some(GameAction::DeclineSteal)
            }
            GamePhase::AwaitingLead | GamePhase::AwaitingFollow => {
                if game.turn != self.seat {
                    return None;
                }
                let plays = game.valid_plays(self.seat);
                let choice = match self.difficulty {
                    BotDifficulty::Easy => self.choose_easy(game, &plays),
                    BotDifficulty::Medium => self.choose_medium(game, &plays),
                    BotDifficulty::Hard => self.choose_hard(game, &plays),
                };
                Some(match choice {
                    Some(hand) => GameAction::Play(card_ids(hand)),
                    None => GameAction::Pass,
                })
            }
        }
    }

    /// Easy: any legal play, passing a third of the time when following
    fn choose_easy<'a>(&mut self, game: &GameState, plays: &'a [PlayedHand]) -> Option<&'a PlayedHand> {
        if game.leading_hand().is_some() && self.rng.gen_ratio(1, 3) {
            return None;
        }
        plays.choose(&mut self.rng)
    }

    /// Medium: cheapest non-bomb; bomb only when the trick is worth it
    fn choose_medium<'a>(&mut self, game: &GameState, plays: &'a [PlayedHand]) -> Option<&'a PlayedHand> {
        if let Some(play) = plays.iter().find(|p| !p.is_bomb()) {
            return Some(play);
        }
        let Some(leading) = game.leading_hand() else {
            return plays.first();
        };
        if trick_value(game) >= BOMB_FOR_POINTS && !self.is_partner(leading.player_id) {
            return plays.first();
        }
        None
    }

    /// Hard: never beat a partner, bomb to deny points or stop a runner
    fn choose_hard<'a>(&mut self, game: &GameState, plays: &'a [PlayedHand]) -> Option<&'a PlayedHand> {
        let Some(leading) = game.leading_hand() else {
            // On lead, shed the lowest single/pair/triplet first
            return plays.iter().find(|p| !p.is_bomb()).or_else(|| plays.first());
        };

        let my_cards = game.get_player(self.seat).map(Player::card_count).unwrap_or(0);
        let goes_out = |p: &&PlayedHand| p.length == my_cards;

        if self.is_partner(leading.player_id) {
            return plays.iter().find(goes_out);
        }

        if let Some(play) = plays.iter().find(|p| !p.is_bomb()) {
            return Some(play);
        }

        let runner = game
            .get_player(leading.player_id)
            .map(|p| p.card_count() <= OPPONENT_NEARLY_OUT)
            .unwrap_or(false);
        if runner || trick_value(game) >= BOMB_FOR_POINTS || plays.iter().any(|p| goes_out(&p)) {
            return plays.first();
        }
        None
    }

    fn is_partner(&self, seat: Seat) -> bool {
        seat != self.seat && seat % 2 == self.seat % 2
    }
}

fn card_ids(hand: &PlayedHand) -> Vec<CardId> {
    hand.cards.iter().map(|c| c.id).collect()
}

/// Points staged in the open trick
fn trick_value(game: &GameState) -> u32 {
    total_points(&game.trick_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, Rank, Suit};
    use crate::player::SeatInfo;
    use crate::rules::RuleSet;

    fn game_with(hands: Vec<Vec<(Suit, Rank)>>) -> GameState {
        let mut next = 0u16;
        let hands = hands
            .into_iter()
            .map(|h| {
                h.into_iter()
                    .map(|(s, r)| {
                        next += 1;
                        Card::new(next, s, r)
                    })
                    .collect()
            })
            .collect();
        let seats = (0..4).map(|i| SeatInfo::bot(format!("Bot {}", i))).collect();
        GameState::from_hands(seats, hands, RuleSet::standard(), 1).unwrap()
    }

    #[test]
    fn test_bot_creation() {
        let bot = Bot::new(0, BotDifficulty::Easy);
        assert_eq!(bot.seat, 0);
        assert_eq!(bot.difficulty, BotDifficulty::Easy);
    }

    #[test]
    fn test_bots_finish_a_round() {
        for difficulty in [BotDifficulty::Easy, BotDifficulty::Medium, BotDifficulty::Hard] {
            let mut game = GameState::new_standard_4player();
            let mut bots: Vec<Bot> = (0..4)
                .map(|seat| Bot::with_seed(seat, difficulty, 11 + seat as u64))
                .collect();

            let mut steps = 0;
            while !game.is_round_over() && steps < 5_000 {
                let seat = match game.phase {
                    GamePhase::StealWindow { seat } => seat,
                    _ => game.turn,
                };
                let action = bots[seat as usize].choose_action(&game).expect("bot acts on its turn");
                game.apply_action(seat, action).expect("bot action is legal");
                steps += 1;
            }

            assert!(game.is_round_over(), "{:?} bots did not finish", difficulty);
            assert_eq!(game.winners.len(), 4);
            // Point cards are either captured or still held by the last seat
            let held: u32 = game.players.iter().map(|p| total_points(&p.hand)).sum();
            assert_eq!(game.team_points().iter().sum::<u32>() + held, 200);
        }
    }

    #[test]
    fn test_medium_prefers_cheapest_single() {
        let game = game_with(vec![
            vec![(Suit::Heart, Rank::Four), (Suit::Spade, Rank::Nine), (Suit::Spade, Rank::Ace)],
            vec![(Suit::Club, Rank::Five)],
            vec![(Suit::Club, Rank::Six)],
            vec![(Suit::Diamond, Rank::Seven)],
        ]);
        let mut bot = Bot::with_seed(0, BotDifficulty::Medium, 3);
        let action = bot.choose_action(&game).unwrap();
        let four = game.players[0].hand[0].id;
        assert_eq!(action, GameAction::Play(vec![four]));
    }

    #[test]
    fn test_hard_bot_does_not_overtake_partner() {
        let mut game = game_with(vec![
            vec![(Suit::Diamond, Rank::Four), (Suit::Spade, Rank::Nine)],
            vec![(Suit::Club, Rank::Five), (Suit::Club, Rank::Three)],
            vec![(Suit::Club, Rank::Jack), (Suit::Club, Rank::Eight)],
            vec![(Suit::Diamond, Rank::Seven)],
        ]);
        let nine = game.players[0].hand[1].id;
        game.apply_action(0, GameAction::Play(vec![nine])).unwrap();
        game.apply_action(1, GameAction::Pass).unwrap();

        let mut bot = Bot::with_seed(2, BotDifficulty::Hard, 5);
        assert_eq!(bot.choose_action(&game), Some(GameAction::Pass));
    }

    #[test]
    fn test_bot_waits_for_its_turn() {
        let game = GameState::new_standard_4player();
        let other = (game.turn + 1) % 4;
        let mut bot = Bot::with_seed(other, BotDifficulty::Medium, 9);
        assert_eq!(bot.choose_action(&game), None);
    }
}
