//! Table synchronization protocol.
//!
//! The table list lives in one shared record. Every mutation re-reads the
//! record, applies the change and writes it back with compare-and-swap,
//! retrying on conflict. The committed list is then broadcast so other
//! clients can replace their view without touching the store.

use crate::config::SyncConfig;
use crate::network::Publisher;
use crate::protocol::{
    ClientId, GameTable, LobbyPlayer, NetworkMessage, PlayerActionPayload, ProtocolError,
    TableStatus,
};
use crate::store::{load_json, SharedStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use tuosan_core::{GameAction, GameStateSync, RoundResult, Seat, TableId, SEATS};

/// Attempts at a compare-and-swap before giving up
const MAX_CAS_RETRIES: usize = 16;

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("Seat is already occupied")]
    SeatOccupied,

    #[error("Table is already playing")]
    TablePlaying,

    #[error("Already seated at table {0}")]
    AlreadySeated(TableId),

    #[error("No such table")]
    NoSuchTable,

    #[error("Invalid seat")]
    InvalidSeat,

    #[error("Not seated at a table")]
    NotSeated,

    #[error("Not the host")]
    NotHost,

    #[error("Table is not playing")]
    NotPlaying,

    #[error("Table record kept changing, gave up")]
    Contention,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One client's view of the lobby
pub struct Lobby {
    me: LobbyPlayer,
    store: Arc<dyn SharedStore>,
    key: String,
    table_count: u32,
    publisher: Publisher,
    tables: Vec<GameTable>,
    version: u64,
}

impl Lobby {
    /// Log in, creating the table record if nobody has yet
    pub fn join(
        name: impl Into<String>,
        store: Arc<dyn SharedStore>,
        publisher: Publisher,
        config: &SyncConfig,
    ) -> Result<Self, LobbyError> {
        let mut lobby = Self {
            me: LobbyPlayer::new(publisher.client_id(), name),
            store,
            key: config.store_key.clone(),
            table_count: config.tables,
            publisher,
            tables: Vec::new(),
            version: 0,
        };
        lobby.refresh()?;
        Ok(lobby)
    }

    pub fn id(&self) -> ClientId {
        self.me.id
    }

    pub fn name(&self) -> &str {
        &self.me.name
    }

    /// Points carried over from finished rounds
    pub fn total_score(&self) -> u32 {
        self.me.total_score
    }

    pub fn list_tables(&self) -> &[GameTable] {
        &self.tables
    }

    pub fn table(&self, table_id: TableId) -> Option<&GameTable> {
        self.tables.iter().find(|t| t.id == table_id)
    }

    /// Store version the local view was last read at
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Where this client sits according to the local view
    pub fn my_seat(&self) -> Option<(TableId, usize)> {
        self.tables
            .iter()
            .find_map(|t| t.seat_of(self.me.id).map(|seat| (t.id, seat)))
    }

    pub fn is_host(&self, table_id: TableId) -> bool {
        self.table(table_id).and_then(|t| t.host_id) == Some(self.me.id)
    }

    /// Reload the table list from the store
    pub fn refresh(&mut self) -> Result<(), LobbyError> {
        loop {
            if let Some(current) = load_json::<Vec<GameTable>>(&*self.store, &self.key)? {
                self.tables = current.value;
                self.version = current.version;
                return Ok(());
            }
            let fresh = GameTable::fresh_lobby(self.table_count);
            match self.store.compare_and_swap(&self.key, 0, encode(&fresh)?) {
                Ok(version) => {
                    info!("Created {} tables under {}", fresh.len(), self.key);
                    self.tables = fresh;
                    self.version = version;
                    return Ok(());
                }
                // Someone else created it first; read theirs
                Err(StoreError::Conflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read-modify-write the table record, then broadcast the result
    fn update<T>(
        &mut self,
        mut change: impl FnMut(&mut Vec<GameTable>) -> Result<T, LobbyError>,
    ) -> Result<T, LobbyError> {
        for attempt in 0..MAX_CAS_RETRIES {
            self.refresh()?;
            let mut tables = self.tables.clone();
            let out = change(&mut tables)?;

            match self.store.compare_and_swap(&self.key, self.version, encode(&tables)?) {
                Ok(version) => {
                    self.tables = tables;
                    self.version = version;
                    self.publish(NetworkMessage::lobby_update(self.me.id, &self.tables));
                    return Ok(out);
                }
                Err(StoreError::Conflict { expected, actual }) => {
                    debug!(
                        "Table record moved from {} to {}, retry {}",
                        expected, actual, attempt
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LobbyError::Contention)
    }

    pub fn sit_down(&mut self, table_id: TableId, seat: usize) -> Result<(), LobbyError> {
        if seat >= SEATS {
            return Err(LobbyError::InvalidSeat);
        }
        let me = self.me.clone();
        self.update(|tables| {
            if let Some(current) = tables.iter().find(|t| t.seat_of(me.id).is_some()) {
                return Err(LobbyError::AlreadySeated(current.id));
            }
            let table = tables
                .iter_mut()
                .find(|t| t.id == table_id)
                .ok_or(LobbyError::NoSuchTable)?;
            if table.status == TableStatus::Playing {
                return Err(LobbyError::TablePlaying);
            }
            if table.players[seat].is_some() {
                return Err(LobbyError::SeatOccupied);
            }
            table.players[seat] = Some(LobbyPlayer {
                table_id: Some(table_id),
                seat_index: Some(seat),
                ..me.clone()
            });
            if table.host_id.is_none() {
                table.host_id = Some(me.id);
            }
            Ok(())
        })?;
        info!("{} sat at table {} seat {}", self.me.name, table_id, seat);
        Ok(())
    }

    /// Release this client's seat, if any; returns the table left
    pub fn leave_table(&mut self) -> Result<Option<TableId>, LobbyError> {
        let id = self.me.id;
        let left = self.update(|tables| {
            let Some(table) = tables.iter_mut().find(|t| t.seat_of(id).is_some()) else {
                return Ok(None);
            };
            let seat = table.seat_of(id).ok_or(LobbyError::NotSeated)?;
            let player = table.players[seat].take();

            if table.host_id == Some(id) {
                table.host_id = table.first_human();
            }
            // A bot takes over the seat for the rest of the round
            if table.status == TableStatus::Playing {
                table.bots.push(seat);
                table.bots.sort_unstable();
            }
            if table.human_count() == 0 {
                table.status = TableStatus::Waiting;
                table.bots.clear();
                table.host_id = None;
            }
            Ok(Some((table.id, player)))
        })?;

        Ok(left.map(|(table_id, player)| {
            if let Some(player) = player {
                self.me.total_score = player.total_score;
            }
            info!("{} left table {}", self.me.name, table_id);
            table_id
        }))
    }

    /// Host only: fill empty seats with bots and mark the table playing
    pub fn start_game(&mut self, table_id: TableId) -> Result<GameTable, LobbyError> {
        let id = self.me.id;
        let table = self.update(|tables| {
            let table = tables
                .iter_mut()
                .find(|t| t.id == table_id)
                .ok_or(LobbyError::NoSuchTable)?;
            if table.host_id != Some(id) {
                return Err(LobbyError::NotHost);
            }
            if table.status == TableStatus::Playing {
                return Err(LobbyError::TablePlaying);
            }
            table.status = TableStatus::Playing;
            table.bots = (0..SEATS).filter(|&s| table.players[s].is_none()).collect();
            Ok(table.clone())
        })?;
        info!("Table {} started with {} bots", table_id, table.bots.len());
        Ok(table)
    }

    /// Credit round points to the seated humans and reopen the table
    pub fn finish_game(&mut self, table_id: TableId, result: &RoundResult) -> Result<(), LobbyError> {
        self.update(|tables| {
            let table = tables
                .iter_mut()
                .find(|t| t.id == table_id)
                .ok_or(LobbyError::NoSuchTable)?;
            if table.status != TableStatus::Playing {
                return Err(LobbyError::NotPlaying);
            }
            for (seat, player) in table.players.iter_mut().enumerate() {
                if let Some(player) = player {
                    player.total_score += result.seat_points[seat];
                }
            }
            table.status = TableStatus::Waiting;
            table.bots.clear();
            Ok(())
        })?;
        let seated = self
            .table(table_id)
            .and_then(|t| t.seat_of(self.me.id).and_then(|s| t.players[s].clone()));
        if let Some(me) = seated {
            self.me.total_score = me.total_score;
        }
        info!("Table {} finished, team points {:?}", table_id, result.team_points);
        Ok(())
    }

    /// Wipe every table. Callers are expected to have checked credentials.
    pub fn reset_system(&mut self) -> Result<(), LobbyError> {
        let fresh = GameTable::fresh_lobby(self.table_count);
        self.version = self.store.overwrite(&self.key, encode(&fresh)?)?;
        self.tables = fresh;
        warn!("Table data reset by {}", self.me.name);
        self.publish(NetworkMessage::lobby_update(self.me.id, &self.tables));
        Ok(())
    }

    /// Apply a LOBBY_UPDATE from another client
    pub fn handle_lobby_update(&mut self, payload: Option<Vec<GameTable>>) -> Result<(), LobbyError> {
        match payload {
            Some(tables) => {
                self.tables = tables;
                Ok(())
            }
            None => self.refresh(),
        }
    }

    /// Whether the local view still seats this client at `active_table`
    pub fn reconcile(&self, active_table: Option<TableId>) -> bool {
        match active_table {
            None => true,
            Some(table_id) => self
                .table(table_id)
                .map(|t| t.seat_of(self.me.id).is_some())
                .unwrap_or(false),
        }
    }

    pub fn broadcast_game_start(&self, sync: &GameStateSync) {
        self.publish(NetworkMessage::game_start(self.me.id, sync));
    }

    pub fn broadcast_game_state(&self, sync: &GameStateSync) {
        self.publish(NetworkMessage::game_state(self.me.id, sync));
    }

    pub fn broadcast_action(&self, table_id: TableId, seat: Seat, action: &GameAction) {
        let payload = PlayerActionPayload {
            table_id,
            seat,
            action: action.clone(),
        };
        self.publish(NetworkMessage::player_action(self.me.id, &payload));
    }

    fn publish(&self, msg: Result<NetworkMessage, ProtocolError>) {
        match msg {
            Ok(msg) => self.publisher.broadcast(msg),
            Err(e) => warn!("Could not encode message: {}", e),
        }
    }
}

fn encode(tables: &[GameTable]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(tables)?)
}
