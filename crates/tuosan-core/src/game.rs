//! Core trick-taking state machine.
//!
//! This module contains the main `GameState` struct and all round logic.
//!
//! Phases:
//! - `AwaitingLead`: the seat on turn opens a new trick with any valid hand
//! - `AwaitingFollow`: seats beat the leading hand or pass
//! - `StealWindow`: follow play is paused while one seat may interrupt
//! - `RoundOver`: terminal
//!
//! Closing a trick is not a resting phase: once every other seat still holding
//! cards has passed, the staged point cards go to the leader and the engine
//! moves straight back to `AwaitingLead`.

use crate::actions::{GameAction, GameEvent, GameHistory};
use crate::cards::{self, Card, CardId, DeckConfig, Rank, Seat, Suit, SEATS};
use crate::hand::{can_beat, classify, HandType, PlayedHand};
use crate::player::{Player, RoundAction, SeatInfo};
use crate::rules::{HouseRules, RuleSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Number of finished seats that ends a round
const FINISHERS_TO_END: usize = SEATS - 1;

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Seat on turn must open a trick
    AwaitingLead,

    /// Seats beat the leading hand or pass
    AwaitingFollow,

    /// Normal order paused; only `seat` may steal or decline
    StealWindow { seat: Seat },

    /// Round is over
    RoundOver,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid seat")]
    InvalidSeat,

    #[error("A round needs exactly four seats")]
    WrongSeatCount,

    #[error("Those cards are not in your hand")]
    CardsNotInHand,

    #[error("Not a valid hand")]
    InvalidHand,

    #[error("Does not beat the leading hand")]
    CannotBeat,

    #[error("You must lead a hand")]
    MustLead,

    #[error("You have already finished")]
    AlreadyFinished,

    #[error("The opening play must include a heart four")]
    MustLeadHeartFour,

    #[error("Final play must be exactly {required} cards")]
    DragThreeViolation { required: usize },

    #[error("Waiting for a steal decision")]
    StealWindowOpen,

    #[error("No steal window is open for you")]
    NoStealWindow,

    #[error("Round is over")]
    RoundOver,
}

/// Deal configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub deck: DeckConfig,
    pub rules: RuleSet,
    /// Fixed shuffle seed; random when `None`
    pub seed: Option<u64>,
}

/// Read-out of a finished round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Seats in finishing order
    pub finish_order: Vec<Seat>,
    pub team_points: [u32; 2],
    /// Points captured by each seat
    pub seat_points: [u32; SEATS],
}

/// The complete round state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: Vec<Player>,
    #[serde(rename = "gamePhase")]
    pub phase: GamePhase,
    /// Seat to act
    pub turn: Seat,
    /// Number of accepted actions so far
    pub turn_number: u32,
    /// Hand currently leading the trick
    pub last_played_hand: Option<PlayedHand>,
    /// Consecutive passes since the leading hand
    pub pass_count: u8,
    /// Every card played into the open trick
    pub current_trick_cards: Vec<Card>,
    /// Point cards staged in the open trick
    pub trick_points: Vec<Card>,
    pub history: Vec<GameHistory>,
    /// Seats in finishing order
    pub winners: Vec<Seat>,
    /// First seat (in seat order) dealt a heart four
    #[serde(rename = "firstRH4Player")]
    pub first_rh4_player: Option<Seat>,
    /// Seat dealt every heart four, if any
    #[serde(rename = "doubleRH4Player")]
    pub double_rh4_player: Option<Seat>,
    pub is_first_turn_of_game: bool,
    /// Status line for display
    pub message: String,
    /// Seconds left in an open steal window
    pub steal_timer: u32,
    pub rules: RuleSet,
    /// Shuffle seed (for deterministic replays)
    rng_seed: u64,
}

impl GameState {
    /// Shuffle and deal a new round
    pub fn new(config: GameConfig, seats: Vec<SeatInfo>) -> Result<Self, GameError> {
        let seats = <[SeatInfo; SEATS]>::try_from(seats).map_err(|_| GameError::WrongSeatCount)?;
        Ok(Self::deal(config, seats))
    }

    /// Create a standard 4-bot round with random cards
    pub fn new_standard_4player() -> Self {
        let seats = [1, 2, 3, 4].map(|i| SeatInfo::bot(format!("Player {}", i)));
        Self::deal(GameConfig::default(), seats)
    }

    fn deal(config: GameConfig, seats: [SeatInfo; SEATS]) -> Self {
        let rng_seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(rng_seed);

        let mut deck = config.deck.build();
        cards::shuffle_deck(&mut deck, &mut rng);

        let mut hands: [Vec<Card>; SEATS] = Default::default();
        for (i, card) in deck.into_iter().enumerate() {
            hands[i % SEATS].push(card);
        }

        Self::assemble(seats, hands, config.rules, rng_seed)
    }

    /// Start a round from known hands
    pub fn from_hands(
        seats: Vec<SeatInfo>,
        hands: Vec<Vec<Card>>,
        rules: RuleSet,
        rng_seed: u64,
    ) -> Result<Self, GameError> {
        let seats = <[SeatInfo; SEATS]>::try_from(seats).map_err(|_| GameError::WrongSeatCount)?;
        let hands = <[Vec<Card>; SEATS]>::try_from(hands).map_err(|_| GameError::WrongSeatCount)?;
        Ok(Self::assemble(seats, hands, rules, rng_seed))
    }

    fn assemble(
        seats: [SeatInfo; SEATS],
        hands: [Vec<Card>; SEATS],
        rules: RuleSet,
        rng_seed: u64,
    ) -> Self {
        let mut players: Vec<Player> = seats
            .into_iter()
            .enumerate()
            .map(|(i, seat)| Player::new(i as Seat, seat))
            .collect();
        for (player, hand) in players.iter_mut().zip(hands) {
            player.receive(hand);
        }
        rules.on_deal(&mut players);

        let heart_fours: usize = players.iter().map(|p| p.heart_fours()).sum();
        let first_rh4_player = players.iter().find(|p| p.heart_fours() > 0).map(|p| p.id);
        let double_rh4_player = players
            .iter()
            .find(|p| heart_fours > 1 && p.heart_fours() == heart_fours)
            .map(|p| p.id);

        let mut game = Self {
            players,
            phase: GamePhase::AwaitingLead,
            turn: 0,
            turn_number: 0,
            last_played_hand: None,
            pass_count: 0,
            current_trick_cards: Vec::new(),
            trick_points: Vec::new(),
            history: Vec::new(),
            winners: Vec::new(),
            first_rh4_player,
            double_rh4_player,
            is_first_turn_of_game: true,
            message: String::new(),
            steal_timer: 0,
            rules,
            rng_seed,
        };
        game.turn = rules.opener(&game);
        if !game.seat_active(game.turn) {
            game.turn = game.next_active(game.turn).unwrap_or(0);
        }
        game.message = format!("{} leads", game.players[game.turn as usize].name);
        game
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Get a player by seat
    pub fn get_player(&self, seat: Seat) -> Option<&Player> {
        self.players.get(seat as usize)
    }

    fn get_player_mut(&mut self, seat: Seat) -> Result<&mut Player, GameError> {
        self.players.get_mut(seat as usize).ok_or(GameError::InvalidSeat)
    }

    pub fn is_round_over(&self) -> bool {
        self.phase == GamePhase::RoundOver
    }

    /// The hand to beat, if a trick is open
    pub fn leading_hand(&self) -> Option<&PlayedHand> {
        match self.phase {
            GamePhase::AwaitingLead | GamePhase::RoundOver => None,
            _ => self.last_played_hand.as_ref(),
        }
    }

    fn seat_active(&self, seat: Seat) -> bool {
        self.get_player(seat).map(|p| p.is_active()).unwrap_or(false)
    }

    /// Seats still holding cards
    pub fn active_seats(&self) -> Vec<Seat> {
        self.players.iter().filter(|p| p.is_active()).map(|p| p.id).collect()
    }

    /// Next seat after `from` (clockwise) still holding cards
    pub fn next_active(&self, from: Seat) -> Option<Seat> {
        (1..=SEATS as Seat)
            .map(|step| (from + step) % SEATS as Seat)
            .find(|&seat| self.seat_active(seat))
    }

    /// Passes needed to close the open trick
    fn passes_to_close(&self) -> usize {
        let leader = self.last_played_hand.as_ref().map(|h| h.player_id);
        self.players
            .iter()
            .filter(|p| p.is_active() && Some(p.id) != leader)
            .count()
    }

    /// Points captured per team
    pub fn team_points(&self) -> [u32; 2] {
        let mut points = [0u32; 2];
        for p in &self.players {
            points[p.team as usize % 2] += p.score;
        }
        points
    }

    /// Final standings, available once the round is over
    pub fn result(&self) -> Option<RoundResult> {
        if !self.is_round_over() {
            return None;
        }
        let mut seat_points = [0u32; SEATS];
        for p in &self.players {
            seat_points[p.id as usize] = p.score;
        }
        Some(RoundResult {
            finish_order: self.winners.clone(),
            team_points: self.team_points(),
            seat_points,
        })
    }

    /// Every legal play for a seat against the current leading hand.
    ///
    /// Plays are listed weakest first: non-bombs by value, then bombs by
    /// precedence.
    pub fn valid_plays(&self, seat: Seat) -> Vec<PlayedHand> {
        let Some(player) = self.get_player(seat) else {
            return Vec::new();
        };
        if !player.is_active() {
            return Vec::new();
        }

        let leading = self.leading_hand();
        let mut plays: Vec<PlayedHand> = candidate_groups(&player.hand)
            .into_iter()
            .map(|group| classify(&group, seat))
            .filter(|hand| can_beat(hand, leading))
            .filter(|hand| self.rules.check_play(self, seat, hand).is_ok())
            .collect();

        plays.sort_by_key(|h| {
            let tier = match h.hand_type {
                HandType::Bomb4Plus => 1,
                HandType::Bomb510K => 2,
                HandType::Bomb3SameSuit => 3,
                _ => 0,
            };
            (tier, h.length, h.primary_value, h.sub_type_level)
        });
        plays
    }

    /// Get all currently valid actions for a seat
    pub fn valid_actions(&self, seat: Seat) -> Vec<GameAction> {
        let ids = |h: PlayedHand| h.cards.iter().map(|c| c.id).collect::<Vec<CardId>>();

        match self.phase {
            GamePhase::RoundOver => Vec::new(),
            GamePhase::StealWindow { seat: stealer } => {
                if seat != stealer {
                    return Vec::new();
                }
                let mut actions: Vec<GameAction> =
                    self.valid_plays(seat).into_iter().map(|h| GameAction::Steal(ids(h))).collect();
                actions.push(GameAction::DeclineSteal);
                actions
            }
            GamePhase::AwaitingLead | GamePhase::AwaitingFollow => {
                if seat != self.turn {
                    return Vec::new();
                }
                let plays = self.valid_plays(seat);
                let can_pass = self.phase == GamePhase::AwaitingFollow || plays.is_empty();
                let mut actions: Vec<GameAction> =
                    plays.into_iter().map(|h| GameAction::Play(ids(h))).collect();
                if can_pass {
                    actions.push(GameAction::Pass);
                }
                actions
            }
        }
    }

    /// Apply an action to the game state. A rejected action changes nothing.
    pub fn apply_action(
        &mut self,
        seat: Seat,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.is_round_over() {
            return Err(GameError::RoundOver);
        }

        match action {
            GameAction::Play(ids) => {
                if let GamePhase::StealWindow { .. } = self.phase {
                    return Err(GameError::StealWindowOpen);
                }
                if seat != self.turn {
                    return Err(GameError::NotYourTurn);
                }
                let hand = self.validate_play(seat, &ids)?;
                self.commit_play(seat, hand)
            }

            GameAction::Steal(ids) => {
                if self.phase != (GamePhase::StealWindow { seat }) {
                    return Err(GameError::NoStealWindow);
                }
                let hand = self.validate_play(seat, &ids)?;
                self.steal_timer = 0;
                self.phase = GamePhase::AwaitingFollow;
                self.commit_play(seat, hand)
            }

            GameAction::DeclineSteal => {
                if self.phase != (GamePhase::StealWindow { seat }) {
                    return Err(GameError::NoStealWindow);
                }
                Ok(self.close_steal_window(seat))
            }

            GameAction::Pass => {
                if let GamePhase::StealWindow { .. } = self.phase {
                    return Err(GameError::StealWindowOpen);
                }
                if seat != self.turn {
                    return Err(GameError::NotYourTurn);
                }
                if self.phase == GamePhase::AwaitingLead {
                    if !self.valid_plays(seat).is_empty() {
                        return Err(GameError::MustLead);
                    }
                    return Ok(self.forfeit_lead(seat));
                }
                Ok(self.pass(seat))
            }
        }
    }

    /// Advance the local steal-window deadline
    pub fn tick(&mut self, elapsed_secs: u32) -> Vec<GameEvent> {
        let GamePhase::StealWindow { seat } = self.phase else {
            return Vec::new();
        };
        self.steal_timer = self.steal_timer.saturating_sub(elapsed_secs);
        if self.steal_timer == 0 {
            self.close_steal_window(seat)
        } else {
            Vec::new()
        }
    }

    fn validate_play(&self, seat: Seat, ids: &[CardId]) -> Result<PlayedHand, GameError> {
        let player = self.get_player(seat).ok_or(GameError::InvalidSeat)?;
        if !player.is_active() {
            return Err(GameError::AlreadyFinished);
        }
        let selected = player.find_cards(ids).ok_or(GameError::CardsNotInHand)?;

        let hand = classify(&selected, seat);
        if !hand.is_valid() {
            return Err(GameError::InvalidHand);
        }
        if !can_beat(&hand, self.leading_hand()) {
            return Err(GameError::CannotBeat);
        }
        self.rules.check_play(self, seat, &hand)?;
        Ok(hand)
    }

    fn commit_play(&mut self, seat: Seat, hand: PlayedHand) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();
        let led = self.phase == GamePhase::AwaitingLead;
        let ids: Vec<CardId> = hand.cards.iter().map(|c| c.id).collect();

        let player = self.get_player_mut(seat)?;
        player.remove_cards(&ids);
        player.last_played_hand = Some(hand.cards.clone());
        player.current_round_action = Some(RoundAction::Play);
        player.current_round_cards = Some(hand.cards.clone());
        let emptied = player.hand.is_empty();
        let name = player.name.clone();

        self.trick_points
            .extend(hand.cards.iter().filter(|c| c.is_point_card()).copied());
        self.current_trick_cards.extend(hand.cards.iter().copied());
        self.turn_number += 1;
        self.history.push(GameHistory {
            turn: self.turn_number,
            player_id: seat,
            action: RoundAction::Play,
            cards: Some(hand.cards.clone()),
        });
        self.pass_count = 0;
        self.is_first_turn_of_game = false;
        self.phase = GamePhase::AwaitingFollow;
        self.message = format!("{} played {} card(s)", name, hand.length);
        self.last_played_hand = Some(hand.clone());

        events.push(GameEvent::HandPlayed { player: seat, hand });

        if emptied {
            events.push(self.record_finish(seat)?);
            if self.winners.len() >= FINISHERS_TO_END {
                events.extend(self.finish_round());
                return Ok(events);
            }
        }

        match self.next_active(seat) {
            Some(next) => self.turn = next,
            None => {
                events.extend(self.finish_round());
                return Ok(events);
            }
        }

        if let Some(stealer) = self.rules.steal_seat(self, seat, led) {
            let seconds = self.rules.steal_window_secs();
            if seconds > 0 {
                self.phase = GamePhase::StealWindow { seat: stealer };
                self.steal_timer = seconds;
                events.push(GameEvent::StealWindowOpened {
                    player: stealer,
                    seconds,
                });
                return Ok(events);
            }
        }

        events.push(GameEvent::TurnChanged { player: self.turn });
        Ok(events)
    }

    fn record_finish(&mut self, seat: Seat) -> Result<GameEvent, GameError> {
        let rank = self.winners.len() as u8 + 1;
        self.winners.push(seat);
        self.get_player_mut(seat)?.finished_rank = Some(rank);
        Ok(GameEvent::PlayerFinished { player: seat, rank })
    }

    fn pass(&mut self, seat: Seat) -> Vec<GameEvent> {
        let mut events = vec![GameEvent::Passed { player: seat }];
        self.record_pass(seat);
        self.pass_count += 1;

        if self.pass_count as usize >= self.passes_to_close() {
            events.extend(self.close_trick());
            return events;
        }

        if let Some(next) = self.next_active(seat) {
            self.turn = next;
        }
        events.push(GameEvent::TurnChanged { player: self.turn });
        events
    }

    /// The seat on lead has nothing legal to open with
    fn forfeit_lead(&mut self, seat: Seat) -> Vec<GameEvent> {
        let mut events = vec![GameEvent::LeadForfeited { player: seat }];
        self.record_pass(seat);
        self.pass_count += 1;

        if self.pass_count as usize >= self.active_seats().len() {
            events.extend(self.finish_round());
            return events;
        }

        if let Some(next) = self.next_active(seat) {
            self.turn = next;
        }
        events.push(GameEvent::TurnChanged { player: self.turn });
        events
    }

    fn record_pass(&mut self, seat: Seat) {
        self.turn_number += 1;
        self.history.push(GameHistory {
            turn: self.turn_number,
            player_id: seat,
            action: RoundAction::Pass,
            cards: None,
        });
        if let Some(p) = self.players.get_mut(seat as usize) {
            p.current_round_action = Some(RoundAction::Pass);
            p.current_round_cards = None;
            self.message = format!("{} passed", p.name);
        }
    }

    fn close_trick(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(leader) = self.last_played_hand.take().map(|h| h.player_id) else {
            self.phase = GamePhase::AwaitingLead;
            return events;
        };

        events.push(self.award_trick(leader));

        self.current_trick_cards.clear();
        self.pass_count = 0;
        for p in &mut self.players {
            p.clear_round_display();
        }

        self.turn = if self.seat_active(leader) {
            leader
        } else {
            self.next_active(leader).unwrap_or(leader)
        };
        self.phase = GamePhase::AwaitingLead;
        self.message = format!("{} leads", self.players[self.turn as usize].name);
        events.push(GameEvent::TurnChanged { player: self.turn });
        events
    }

    fn award_trick(&mut self, leader: Seat) -> GameEvent {
        let won: Vec<Card> = self.trick_points.drain(..).collect();
        let player = &mut self.players[leader as usize];
        let points = player.capture(won);
        GameEvent::TrickWon {
            player: leader,
            team: player.team,
            points,
        }
    }

    fn close_steal_window(&mut self, seat: Seat) -> Vec<GameEvent> {
        self.phase = GamePhase::AwaitingFollow;
        self.steal_timer = 0;
        vec![
            GameEvent::StealWindowClosed { player: seat },
            GameEvent::TurnChanged { player: self.turn },
        ]
    }

    fn finish_round(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if let Some(leader) = self.last_played_hand.as_ref().map(|h| h.player_id) {
            if !self.trick_points.is_empty() {
                events.push(self.award_trick(leader));
            }
        }

        // Seats still holding cards rank by fewest cards left, then seat order
        let mut remaining: Vec<&Player> = self.players.iter().filter(|p| !p.is_finished()).collect();
        remaining.sort_by_key(|p| (p.card_count(), p.id));
        let remaining: Vec<Seat> = remaining.into_iter().map(|p| p.id).collect();
        for seat in remaining {
            let rank = self.winners.len() as u8 + 1;
            self.winners.push(seat);
            self.players[seat as usize].finished_rank = Some(rank);
        }

        self.phase = GamePhase::RoundOver;
        self.steal_timer = 0;
        let team_points = self.team_points();
        self.message = format!("Round over: {} - {}", team_points[0], team_points[1]);
        events.push(GameEvent::RoundOver {
            winners: self.winners.clone(),
            team_points,
        });
        events
    }
}

/// Every distinct card group worth classifying from a hand: one entry per
/// single, pair and triplet value, every bomb length, same-suit and
/// mixed-suit triplets, groups holding a heart four and every suit
/// combination of 5-10-K.
fn candidate_groups(hand: &[Card]) -> Vec<Vec<Card>> {
    let mut by_rank: BTreeMap<Rank, Vec<Card>> = BTreeMap::new();
    let mut by_rank_suit: BTreeMap<(Rank, Suit), Vec<Card>> = BTreeMap::new();
    for card in hand {
        by_rank.entry(card.rank).or_default().push(*card);
        by_rank_suit.entry((card.rank, card.suit)).or_default().push(*card);
    }

    let mut groups = Vec::new();
    for same in by_rank.values() {
        for n in 1..=same.len() {
            groups.push(same[..n].to_vec());
        }

        // Shorter prefixes miss the heart four an opening play needs
        if let Some(pos) = same.iter().position(|c| c.is_heart_four()) {
            let mut hearts_first = same.clone();
            hearts_first[..=pos].rotate_right(1);
            for n in 1..=pos {
                groups.push(hearts_first[..n].to_vec());
            }
        }

        // The first three may share a suit; keep a plain triplet too
        if same.len() > 3 && same[..3].iter().all(|c| c.suit == same[0].suit) {
            if let Some(other) = same[3..].iter().find(|c| c.suit != same[0].suit) {
                groups.push(vec![same[0], same[1], *other]);
            }
        }
    }
    for same in by_rank_suit.values() {
        if same.len() >= 3 {
            groups.push(same[..3].to_vec());
        }
    }

    let firsts = |rank: Rank| -> Vec<Card> {
        Suit::STANDARD
            .iter()
            .filter_map(|suit| by_rank_suit.get(&(rank, *suit)).and_then(|v| v.first()).copied())
            .collect()
    };
    for five in firsts(Rank::Five) {
        for ten in firsts(Rank::Ten) {
            for king in firsts(Rank::King) {
                groups.push(vec![five, ten, king]);
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seats() -> Vec<SeatInfo> {
        ["A", "B", "C", "D"].iter().map(|n| SeatInfo::bot(*n)).collect()
    }

    fn ids(game: &GameState, seat: Seat, ranks: &[Rank]) -> Vec<CardId> {
        let mut taken: Vec<CardId> = Vec::new();
        for rank in ranks {
            let card = game.players[seat as usize]
                .hand
                .iter()
                .find(|c| c.rank == *rank && !taken.contains(&c.id))
                .expect("card in hand");
            taken.push(card.id);
        }
        taken
    }

    fn deal(hands: Vec<Vec<(Suit, Rank)>>) -> GameState {
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
        GameState::from_hands(seats(), hands, RuleSet::standard(), 7).unwrap()
    }

    #[test]
    fn test_new_round_deals_evenly() {
        let config = GameConfig {
            seed: Some(42),
            ..GameConfig::default()
        };
        let game = GameState::new(config, seats()).unwrap();
        assert!(game.players.iter().all(|p| p.hand.len() == 27));
        assert_eq!(game.phase, GamePhase::AwaitingLead);
        assert!(game.is_first_turn_of_game);
        assert_eq!(Some(game.turn), game.first_rh4_player);

        // Same seed, same deal
        let again = GameState::new(config, seats()).unwrap();
        assert_eq!(game.players, again.players);
    }

    #[test]
    fn test_wrong_seat_count() {
        let err = GameState::new(GameConfig::default(), seats()[..3].to_vec());
        assert_eq!(err.unwrap_err(), GameError::WrongSeatCount);
    }

    #[test]
    fn test_heart_four_holder_opens() {
        let game = deal(vec![
            vec![(Suit::Spade, Rank::Six)],
            vec![(Suit::Spade, Rank::Seven)],
            vec![(Suit::Heart, Rank::Four), (Suit::Club, Rank::Nine)],
            vec![(Suit::Diamond, Rank::Nine)],
        ]);
        assert_eq!(game.turn, 2);
        assert_eq!(game.first_rh4_player, Some(2));
        assert_eq!(game.double_rh4_player, None);
    }

    #[test]
    fn test_three_passes_close_trick_and_award_points() {
        let mut game = deal(vec![
            vec![(Suit::Diamond, Rank::Four), (Suit::Spade, Rank::Ten), (Suit::Spade, Rank::Three)],
            vec![(Suit::Club, Rank::Five), (Suit::Club, Rank::Three)],
            vec![(Suit::Club, Rank::King), (Suit::Diamond, Rank::Three)],
            vec![(Suit::Diamond, Rank::Six), (Suit::Heart, Rank::Three)],
        ]);
        assert_eq!(game.turn, 0);

        // Seat 0 leads a ten
        let ten = ids(&game, 0, &[Rank::Ten]);
        game.apply_action(0, GameAction::Play(ten)).unwrap();
        assert_eq!(game.phase, GamePhase::AwaitingFollow);
        assert_eq!(game.trick_points.len(), 1);

        // Seat 1 has nothing above a ten
        game.apply_action(1, GameAction::Pass).unwrap();
        assert_eq!(game.pass_count, 1);

        // Seat 2 beats with the king, resetting the pass counter
        let king = ids(&game, 2, &[Rank::King]);
        game.apply_action(2, GameAction::Play(king)).unwrap();
        assert_eq!(game.pass_count, 0);
        assert_eq!(game.trick_points.len(), 2);

        game.apply_action(3, GameAction::Pass).unwrap();
        game.apply_action(0, GameAction::Pass).unwrap();
        let events = game.apply_action(1, GameAction::Pass).unwrap();

        assert!(events.contains(&GameEvent::TrickWon {
            player: 2,
            team: 0,
            points: 20
        }));
        assert_eq!(game.phase, GamePhase::AwaitingLead);
        assert_eq!(game.turn, 2);
        assert_eq!(game.team_points(), [20, 0]);
        assert!(game.trick_points.is_empty());
        assert!(game.last_played_hand.is_none());
    }

    #[test]
    fn test_rejected_actions_leave_state_unchanged() {
        let mut game = deal(vec![
            vec![(Suit::Diamond, Rank::Four), (Suit::Spade, Rank::Nine), (Suit::Spade, Rank::Three)],
            vec![(Suit::Club, Rank::Eight), (Suit::Club, Rank::Seven)],
            vec![(Suit::Club, Rank::King)],
            vec![(Suit::Diamond, Rank::Six)],
        ]);
        let before = game.clone();

        // Out of turn
        let eight = ids(&game, 1, &[Rank::Eight]);
        assert_eq!(game.apply_action(1, GameAction::Play(eight)), Err(GameError::NotYourTurn));
        // Not a hand
        let junk = ids(&game, 0, &[Rank::Nine, Rank::Three]);
        assert_eq!(game.apply_action(0, GameAction::Play(junk)), Err(GameError::InvalidHand));
        // Not holding it
        assert_eq!(game.apply_action(0, GameAction::Play(vec![999])), Err(GameError::CardsNotInHand));
        // Cannot pass a lead while holding legal plays
        assert_eq!(game.apply_action(0, GameAction::Pass), Err(GameError::MustLead));
        assert_eq!(game, before);

        let nine = ids(&game, 0, &[Rank::Nine]);
        game.apply_action(0, GameAction::Play(nine)).unwrap();
        let mid = game.clone();
        let seven = ids(&game, 1, &[Rank::Seven]);
        assert_eq!(game.apply_action(1, GameAction::Play(seven)), Err(GameError::CannotBeat));
        assert_eq!(game, mid);
    }

    #[test]
    fn test_finish_ranks_and_round_over() {
        let mut game = deal(vec![
            vec![(Suit::Heart, Rank::Four)],
            vec![(Suit::Club, Rank::Five)],
            vec![(Suit::Club, Rank::Six)],
            vec![(Suit::Diamond, Rank::Seven), (Suit::Diamond, Rank::Three)],
        ]);

        let events = game.apply_action(0, GameAction::Play(ids(&game, 0, &[Rank::Four]))).unwrap();
        assert!(events.contains(&GameEvent::PlayerFinished { player: 0, rank: 1 }));
        assert_eq!(game.turn, 1);

        game.apply_action(1, GameAction::Play(ids(&game, 1, &[Rank::Five]))).unwrap();
        assert_eq!(game.players[1].finished_rank, Some(2));

        let events = game.apply_action(2, GameAction::Play(ids(&game, 2, &[Rank::Six]))).unwrap();
        assert_eq!(game.players[2].finished_rank, Some(3));
        assert!(game.is_round_over());
        assert_eq!(game.players[3].finished_rank, Some(4));
        assert_eq!(game.winners, vec![0, 1, 2, 3]);

        // The open trick's five went to seat 2, the last leader
        assert!(events.contains(&GameEvent::TrickWon {
            player: 2,
            team: 0,
            points: 5
        }));

        assert_eq!(
            game.apply_action(3, GameAction::Pass),
            Err(GameError::RoundOver)
        );
        let result = game.result().unwrap();
        assert_eq!(result.finish_order, vec![0, 1, 2, 3]);
        assert_eq!(result.team_points, [5, 0]);
    }

    #[test]
    fn test_lead_passes_on_when_leader_finished() {
        let mut game = deal(vec![
            vec![(Suit::Heart, Rank::Four), (Suit::Spade, Rank::Ace)],
            vec![(Suit::Club, Rank::Five), (Suit::Club, Rank::Three)],
            vec![(Suit::Club, Rank::Six), (Suit::Club, Rank::Eight)],
            vec![(Suit::Diamond, Rank::Seven), (Suit::Diamond, Rank::Three)],
        ]);

        game.apply_action(0, GameAction::Play(ids(&game, 0, &[Rank::Four]))).unwrap();
        for seat in 1..=3 {
            game.apply_action(seat, GameAction::Pass).unwrap();
        }
        assert_eq!(game.turn, 0);

        // Seat 0 goes out on the ace; three other holders must all pass
        game.apply_action(0, GameAction::Play(ids(&game, 0, &[Rank::Ace]))).unwrap();
        assert_eq!(game.players[0].finished_rank, Some(1));
        game.apply_action(1, GameAction::Pass).unwrap();
        game.apply_action(2, GameAction::Pass).unwrap();
        assert_eq!(game.phase, GamePhase::AwaitingFollow);
        game.apply_action(3, GameAction::Pass).unwrap();

        assert_eq!(game.phase, GamePhase::AwaitingLead);
        assert_eq!(game.turn, 1);
    }

    #[test]
    fn test_bomb_beats_single() {
        let mut game = deal(vec![
            vec![(Suit::Diamond, Rank::Four), (Suit::Spade, Rank::Two)],
            vec![
                (Suit::Spade, Rank::Six),
                (Suit::Heart, Rank::Six),
                (Suit::Club, Rank::Six),
                (Suit::Diamond, Rank::Six),
                (Suit::Club, Rank::Three),
            ],
            vec![(Suit::Club, Rank::Nine)],
            vec![(Suit::Diamond, Rank::Seven)],
        ]);
        game.apply_action(0, GameAction::Play(ids(&game, 0, &[Rank::Two]))).unwrap();
        let bomb = ids(&game, 1, &[Rank::Six, Rank::Six, Rank::Six, Rank::Six]);
        game.apply_action(1, GameAction::Play(bomb)).unwrap();

        let leading = game.last_played_hand.as_ref().unwrap();
        assert_eq!(leading.hand_type, HandType::Bomb4Plus);
        assert_eq!(leading.player_id, 1);
    }

    #[test]
    fn test_valid_actions() {
        let mut game = deal(vec![
            vec![(Suit::Diamond, Rank::Four), (Suit::Spade, Rank::Four), (Suit::Spade, Rank::Nine)],
            vec![(Suit::Club, Rank::Five), (Suit::Club, Rank::Three)],
            vec![(Suit::Club, Rank::Six)],
            vec![(Suit::Diamond, Rank::Seven)],
        ]);
        // Leader: single 4, pair 4s, single 9; no pass
        let actions = game.valid_actions(0);
        assert_eq!(actions.len(), 3);
        assert!(!actions.contains(&GameAction::Pass));
        assert!(game.valid_actions(1).is_empty());

        game.apply_action(0, GameAction::Play(ids(&game, 0, &[Rank::Nine]))).unwrap();
        assert_eq!(game.valid_actions(1), vec![GameAction::Pass]);
    }

    #[test]
    fn test_valid_plays_include_plain_triplet_beside_same_suit() {
        let game = deal(vec![
            vec![
                (Suit::Spade, Rank::Seven),
                (Suit::Spade, Rank::Seven),
                (Suit::Spade, Rank::Seven),
                (Suit::Club, Rank::Seven),
            ],
            vec![(Suit::Club, Rank::Five)],
            vec![(Suit::Club, Rank::Six)],
            vec![(Suit::Diamond, Rank::Eight)],
        ]);
        let types: Vec<HandType> = game.valid_plays(0).iter().map(|h| h.hand_type).collect();
        assert!(types.contains(&HandType::Triplet));
        assert!(types.contains(&HandType::Bomb3SameSuit));
        assert!(types.contains(&HandType::Bomb4Plus));
    }

    #[test]
    fn test_opener_can_lead_heart_four_sorted_after_other_fours() {
        let game = deal(vec![
            vec![
                (Suit::Spade, Rank::Four),
                (Suit::Heart, Rank::Four),
                (Suit::Spade, Rank::Nine),
            ],
            vec![(Suit::Club, Rank::Five)],
            vec![(Suit::Club, Rank::Six)],
            vec![(Suit::Diamond, Rank::Seven)],
        ]);
        assert_eq!(game.turn, 0);

        let plays = game.valid_plays(0);
        assert!(plays
            .iter()
            .any(|h| h.hand_type == HandType::Single && h.cards[0].is_heart_four()));
        assert!(plays.iter().any(|h| h.hand_type == HandType::Pair));
        assert!(plays.iter().all(|h| h.cards.iter().any(|c| c.is_heart_four())));
    }

    #[test]
    fn test_snapshot_field_names() {
        let game = GameState::new_standard_4player();
        let json = serde_json::to_value(&game).unwrap();
        assert!(json.get("gamePhase").is_some());
        assert!(json.get("passCount").is_some());
        assert!(json.get("firstRH4Player").is_some());
        assert!(json.get("stealTimer").is_some());
    }
}
