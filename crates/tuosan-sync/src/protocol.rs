//! Lobby model and message envelopes exchanged between clients.
//!
//! Every message is a JSON envelope `{ type, payload?, senderId }`. Payloads
//! stay as raw JSON on the wire and are decoded into [`Inbound`] on receipt,
//! so a malformed payload is dropped without poisoning the receiver.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tuosan_core::{GameAction, GameStateSync, Seat, SeatInfo, TableId, SEATS};
use uuid::Uuid;

/// Identity of a logged-in client
pub type ClientId = Uuid;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0:?} message without payload")]
    MissingPayload(MessageType),

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A human occupying a seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub id: ClientId,
    pub name: String,
    pub table_id: Option<TableId>,
    pub seat_index: Option<usize>,
    /// Points accumulated over finished rounds
    #[serde(default)]
    pub total_score: u32,
}

impl LobbyPlayer {
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            table_id: None,
            seat_index: None,
            total_score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Waiting,
    Playing,
}

/// One lobby table with its four seats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTable {
    pub id: TableId,
    pub players: [Option<LobbyPlayer>; SEATS],
    pub host_id: Option<ClientId>,
    pub status: TableStatus,
    /// Seats filled by bots for the running round
    #[serde(default)]
    pub bots: Vec<usize>,
}

impl GameTable {
    pub fn new(id: TableId) -> Self {
        Self {
            id,
            players: Default::default(),
            host_id: None,
            status: TableStatus::Waiting,
            bots: Vec::new(),
        }
    }

    /// Fresh lobby of `count` empty tables
    pub fn fresh_lobby(count: u32) -> Vec<GameTable> {
        (0..count).map(GameTable::new).collect()
    }

    pub fn seat_of(&self, client: ClientId) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.as_ref().map(|p| p.id) == Some(client))
    }

    pub fn human_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_some()).count()
    }

    /// First seated human in seat order
    pub fn first_human(&self) -> Option<ClientId> {
        self.players.iter().flatten().map(|p| p.id).next()
    }

    pub fn is_bot(&self, seat: Seat) -> bool {
        self.bots.contains(&(seat as usize))
    }

    /// Seat descriptions for dealing a round; empty seats become bots
    pub fn seat_infos(&self) -> Vec<SeatInfo> {
        self.players
            .iter()
            .enumerate()
            .map(|(i, p)| match p {
                Some(p) => SeatInfo::human(p.name.clone(), p.id.to_string()),
                None => SeatInfo::bot(format!("Bot {}", i + 1)),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    LobbyUpdate,
    GameStateUpdate,
    PlayerAction,
    GameStart,
}

/// Action announcement; the authoritative snapshot follows separately
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerActionPayload {
    pub table_id: TableId,
    pub seat: Seat,
    pub action: GameAction,
}

/// Wire envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub sender_id: ClientId,
}

/// Decoded form of an envelope
#[derive(Debug, Clone)]
pub enum Inbound {
    /// `None` means "reload the table list from the store"
    Lobby(Option<Vec<GameTable>>),
    GameState(GameStateSync),
    Action(PlayerActionPayload),
    GameStart(GameStateSync),
}

impl NetworkMessage {
    fn with_payload<T: Serialize>(
        kind: MessageType,
        sender_id: ClientId,
        payload: &T,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind,
            payload: Some(serde_json::to_value(payload)?),
            sender_id,
        })
    }

    pub fn lobby_update(sender_id: ClientId, tables: &[GameTable]) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::LobbyUpdate, sender_id, &tables)
    }

    /// Lobby update without payload; receivers reload from the store
    pub fn lobby_refresh(sender_id: ClientId) -> Self {
        Self {
            kind: MessageType::LobbyUpdate,
            payload: None,
            sender_id,
        }
    }

    pub fn game_state(sender_id: ClientId, sync: &GameStateSync) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::GameStateUpdate, sender_id, sync)
    }

    pub fn game_start(sender_id: ClientId, sync: &GameStateSync) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::GameStart, sender_id, sync)
    }

    pub fn player_action(
        sender_id: ClientId,
        action: &PlayerActionPayload,
    ) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::PlayerAction, sender_id, action)
    }

    pub fn decode(&self) -> Result<Inbound, ProtocolError> {
        let payload = || {
            self.payload
                .clone()
                .ok_or(ProtocolError::MissingPayload(self.kind))
        };
        Ok(match self.kind {
            MessageType::LobbyUpdate => match &self.payload {
                None | Some(serde_json::Value::Null) => Inbound::Lobby(None),
                Some(value) => Inbound::Lobby(Some(serde_json::from_value(value.clone())?)),
            },
            MessageType::GameStateUpdate => Inbound::GameState(serde_json::from_value(payload()?)?),
            MessageType::PlayerAction => Inbound::Action(serde_json::from_value(payload()?)?),
            MessageType::GameStart => Inbound::GameStart(serde_json::from_value(payload()?)?),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuosan_core::GameState;

    #[test]
    fn test_envelope_wire_format() {
        let sender = Uuid::new_v4();
        let msg = NetworkMessage::lobby_update(sender, &GameTable::fresh_lobby(2)).unwrap();
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"LOBBY_UPDATE\""));
        assert!(json.contains("\"senderId\""));
        assert!(json.contains("\"status\":\"WAITING\""));
        assert!(json.contains("\"hostId\":null"));

        let back = NetworkMessage::from_json(&json).unwrap();
        match back.decode().unwrap() {
            Inbound::Lobby(Some(tables)) => assert_eq!(tables, GameTable::fresh_lobby(2)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lobby_update_without_payload() {
        let json = format!("{{\"type\":\"LOBBY_UPDATE\",\"senderId\":\"{}\"}}", Uuid::nil());
        let msg = NetworkMessage::from_json(&json).unwrap();
        assert!(matches!(msg.decode().unwrap(), Inbound::Lobby(None)));

        let refresh = NetworkMessage::lobby_refresh(Uuid::nil());
        assert!(!refresh.to_json().unwrap().contains("payload"));
    }

    #[test]
    fn test_game_state_requires_payload() {
        let msg = NetworkMessage {
            kind: MessageType::GameStateUpdate,
            payload: None,
            sender_id: Uuid::nil(),
        };
        assert!(matches!(
            msg.decode(),
            Err(ProtocolError::MissingPayload(MessageType::GameStateUpdate))
        ));

        let garbage = NetworkMessage {
            payload: Some(serde_json::json!({"tableId": "x"})),
            ..msg
        };
        assert!(matches!(garbage.decode(), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_game_state_payload_decodes() {
        let sync = GameStateSync::new(4, 2, GameState::new_standard_4player());
        let msg = NetworkMessage::game_state(Uuid::new_v4(), &sync).unwrap();
        match msg.decode().unwrap() {
            Inbound::GameState(decoded) => assert_eq!(decoded, sync),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_table_helpers() {
        let mut table = GameTable::new(0);
        let alice = LobbyPlayer::new(Uuid::new_v4(), "Alice");
        let bob = LobbyPlayer::new(Uuid::new_v4(), "Bob");
        table.players[2] = Some(alice.clone());
        table.players[1] = Some(bob.clone());

        assert_eq!(table.seat_of(alice.id), Some(2));
        assert_eq!(table.human_count(), 2);
        assert_eq!(table.first_human(), Some(bob.id));

        let seats = table.seat_infos();
        assert!(seats[0].is_bot);
        assert_eq!(seats[2].network_id, Some(alice.id.to_string()));
    }
}
