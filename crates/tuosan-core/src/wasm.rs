//! WebAssembly bindings for the Tuosan rules engine.
//!
//! This module exposes the round state machine to JavaScript through wasm-bindgen.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::GameAction;
#[cfg(feature = "wasm")]
use crate::bot::{Bot, BotDifficulty};
#[cfg(feature = "wasm")]
use crate::cards::Card;
#[cfg(feature = "wasm")]
use crate::game::{GameConfig, GameState};
#[cfg(feature = "wasm")]
use crate::hand::classify;
#[cfg(feature = "wasm")]
use crate::player::SeatInfo;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed round wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmGame {
    /// Deal a new round for four seats given as a JSON array of seat descriptions
    #[wasm_bindgen(constructor)]
    pub fn new(seats_json: &str) -> Result<WasmGame, JsValue> {
        let seats: Vec<SeatInfo> = serde_json::from_str(seats_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid seats: {}", e)))?;

        let state = GameState::new(GameConfig::default(), seats)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmGame { state })
    }

    /// Replace the local round with a received snapshot
    #[wasm_bindgen(js_name = loadState)]
    pub fn load_state(state_json: &str) -> Result<WasmGame, JsValue> {
        let state: GameState = serde_json::from_str(state_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid state: {}", e)))?;
        Ok(WasmGame { state })
    }

    /// Get the current round state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Seat to act
    #[wasm_bindgen(js_name = getTurn)]
    pub fn get_turn(&self) -> u8 {
        self.state.turn
    }

    /// Get valid actions for a seat as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self, seat: u8) -> String {
        let actions = self.state.valid_actions(seat);
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, seat: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        match self.state.apply_action(seat, action) {
            Ok(events) => serde_json::to_string(&events)
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e))),
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Advance the steal window clock, returns events JSON
    pub fn tick(&mut self, elapsed_secs: u32) -> String {
        let events = self.state.tick(elapsed_secs);
        serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())
    }

    /// Let a bot choose an action for a seat, returns action JSON or null
    #[wasm_bindgen(js_name = getBotAction)]
    pub fn get_bot_action(&self, seat: u8, difficulty: &str) -> String {
        let difficulty = match difficulty {
            "easy" => BotDifficulty::Easy,
            "hard" => BotDifficulty::Hard,
            _ => BotDifficulty::Medium,
        };
        let mut bot = Bot::new(seat, difficulty);
        match bot.choose_action(&self.state) {
            Some(action) => serde_json::to_string(&action).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }

    /// Classify a JSON array of cards, returns the played-hand JSON
    #[wasm_bindgen(js_name = classifyCards)]
    pub fn classify_cards(&self, seat: u8, cards_json: &str) -> Result<String, JsValue> {
        let cards: Vec<Card> = serde_json::from_str(cards_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid cards: {}", e)))?;
        serde_json::to_string(&classify(&cards, seat))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Check if the round is over
    #[wasm_bindgen(js_name = isRoundOver)]
    pub fn is_round_over(&self) -> bool {
        self.state.is_round_over()
    }
}
