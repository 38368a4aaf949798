//! Per-client session actor.
//!
//! A session is the single writer for one logged-in client. It owns the
//! client's [`Lobby`] view and its copy of the running round, and merges two
//! inputs in one loop:
//! - UI commands from the [`SessionHandle`], each answered over a oneshot
//! - Messages from other clients arriving on the broadcast bus
//!
//! Everything the UI needs to render comes back as [`SessionEvent`]s. The
//! table host also plays the bot seats after every change.

use crate::admin::AdminToken;
use crate::config::SyncConfig;
use crate::lobby::{Lobby, LobbyError};
use crate::network::{Network, Subscriber};
use crate::protocol::{ClientId, GameTable, Inbound, NetworkMessage, PlayerActionPayload, TableStatus};
use crate::store::SharedStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tuosan_core::{
    Bot, CardId, GameAction, GameError, GameEvent, GamePhase, GameState, GameStateSync, Seat,
    TableId,
};
use uuid::Uuid;

/// Upper bound on consecutive bot moves handled in one go
const MAX_BOT_MOVES: usize = 1_000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Nickname must not be empty")]
    EmptyName,

    #[error("Session has shut down")]
    Closed,

    #[error("Not seated at a table")]
    NotSeated,

    #[error("No round in progress")]
    NoGame,

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Conditions the UI must tell the user about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// Someone else took the seat first
    SeatOccupied,
    /// The shared tables no longer list this client; return to the lobby
    RemovedFromTable,
    /// This client wiped the table data
    SystemReset,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    LobbyChanged(Vec<GameTable>),
    GameChanged(GameStateSync),
    GameEvents(Vec<GameEvent>),
    ActionAnnounced(PlayerActionPayload),
    ActionRejected(String),
    Alert(Alert),
}

#[derive(Debug)]
pub enum SessionCommand {
    SitDown { table_id: TableId, seat: usize },
    LeaveTable,
    StartGame,
    PlayCards(Vec<CardId>),
    Pass,
    Steal(Vec<CardId>),
    DeclineSteal,
    /// Advance the steal window clock
    Tick(u32),
    ResetSystem(AdminToken),
    Shutdown,
}

#[derive(Debug)]
struct Request {
    command: SessionCommand,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Cloneable handle for driving a session from the UI
#[derive(Debug, Clone)]
pub struct SessionHandle {
    client_id: ClientId,
    requests: mpsc::UnboundedSender<Request>,
}

impl SessionHandle {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request { command, reply })
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn sit_down(&self, table_id: TableId, seat: usize) -> Result<(), SessionError> {
        self.send(SessionCommand::SitDown { table_id, seat }).await
    }

    pub async fn leave_table(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::LeaveTable).await
    }

    pub async fn start_game(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::StartGame).await
    }

    pub async fn play(&self, cards: Vec<CardId>) -> Result<(), SessionError> {
        self.send(SessionCommand::PlayCards(cards)).await
    }

    pub async fn pass(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Pass).await
    }

    /// Send any round action
    pub async fn act(&self, action: GameAction) -> Result<(), SessionError> {
        let command = match action {
            GameAction::Play(cards) => SessionCommand::PlayCards(cards),
            GameAction::Pass => SessionCommand::Pass,
            GameAction::Steal(cards) => SessionCommand::Steal(cards),
            GameAction::DeclineSteal => SessionCommand::DeclineSteal,
        };
        self.send(command).await
    }

    pub async fn tick(&self, elapsed_secs: u32) -> Result<(), SessionError> {
        self.send(SessionCommand::Tick(elapsed_secs)).await
    }

    pub async fn reset_system(&self, token: AdminToken) -> Result<(), SessionError> {
        self.send(SessionCommand::ResetSystem(token)).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }
}

/// The actor behind a [`SessionHandle`]
pub struct GameSession {
    lobby: Lobby,
    subscriber: Subscriber,
    requests: mpsc::UnboundedReceiver<Request>,
    events: mpsc::UnboundedSender<SessionEvent>,
    config: SyncConfig,
    active_table: Option<TableId>,
    game: Option<GameStateSync>,
    bots: HashMap<Seat, Bot>,
}

impl GameSession {
    /// Log in under `nickname` and attach to the network.
    ///
    /// The actor is returned unstarted; see [`GameSession::spawn`].
    pub fn new(
        nickname: &str,
        store: Arc<dyn SharedStore>,
        network: &Network,
        config: SyncConfig,
    ) -> Result<(Self, SessionHandle, SessionEvents), SessionError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(SessionError::EmptyName);
        }

        let client_id = Uuid::new_v4();
        // Subscribe before reading the store so no update is missed
        let (publisher, subscriber) = network.connect(client_id);
        let lobby = Lobby::join(nickname, store, publisher, &config)?;

        let (request_tx, requests) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();

        let session = Self {
            lobby,
            subscriber,
            requests,
            events,
            config,
            active_table: None,
            game: None,
            bots: HashMap::new(),
        };
        session.emit_lobby();

        let handle = SessionHandle {
            client_id,
            requests: request_tx,
        };
        Ok((session, handle, event_rx))
    }

    /// Log in and run the actor on the current tokio runtime
    pub fn spawn(
        nickname: &str,
        store: Arc<dyn SharedStore>,
        network: &Network,
        config: SyncConfig,
    ) -> Result<(SessionHandle, SessionEvents), SessionError> {
        let (session, handle, events) = Self::new(nickname, store, network, config)?;
        tokio::spawn(session.run());
        Ok((handle, events))
    }

    pub async fn run(mut self) {
        info!("Session for {} started", self.lobby.name());

        let mut clock = interval(Duration::from_secs(1));
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let auto_tick = self.config.auto_tick;

        loop {
            tokio::select! {
                request = self.requests.recv() => {
                    let Some(Request { command, reply }) = request else {
                        self.release_seat();
                        break;
                    };
                    if let SessionCommand::Shutdown = command {
                        self.release_seat();
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    let result = self.handle_command(command);
                    let _ = reply.send(result);
                }

                msg = self.subscriber.recv() => match msg {
                    Some(msg) => self.handle_message(msg),
                    None => break,
                },

                _ = clock.tick(), if auto_tick => {
                    if let Err(e) = self.tick(1) {
                        debug!("Clock tick ignored: {}", e);
                    }
                }
            }
        }

        info!("Session for {} closed", self.lobby.name());
    }

    fn handle_command(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::SitDown { table_id, seat } => self.sit_down(table_id, seat),
            SessionCommand::LeaveTable => {
                self.lobby.leave_table()?;
                self.clear_table();
                self.emit_lobby();
                Ok(())
            }
            SessionCommand::StartGame => self.start_game(),
            SessionCommand::PlayCards(cards) => self.act(GameAction::Play(cards)),
            SessionCommand::Pass => self.act(GameAction::Pass),
            SessionCommand::Steal(cards) => self.act(GameAction::Steal(cards)),
            SessionCommand::DeclineSteal => self.act(GameAction::DeclineSteal),
            SessionCommand::Tick(secs) => self.tick(secs),
            SessionCommand::ResetSystem(_token) => {
                self.lobby.reset_system()?;
                self.clear_table();
                self.emit(SessionEvent::Alert(Alert::SystemReset));
                self.emit_lobby();
                Ok(())
            }
            // Handled by the run loop
            SessionCommand::Shutdown => Ok(()),
        }
    }

    fn sit_down(&mut self, table_id: TableId, seat: usize) -> Result<(), SessionError> {
        let result = self.lobby.sit_down(table_id, seat);
        match &result {
            Ok(()) => {
                self.active_table = Some(table_id);
                self.game = None;
            }
            Err(LobbyError::SeatOccupied) => self.emit(SessionEvent::Alert(Alert::SeatOccupied)),
            Err(_) => {}
        }
        // The store was re-read either way
        self.emit_lobby();
        result.map_err(SessionError::from)
    }

    fn start_game(&mut self) -> Result<(), SessionError> {
        let table_id = self.active_table.ok_or(SessionError::NotSeated)?;
        let table = self.lobby.start_game(table_id)?;
        let state = GameState::new(self.config.game, table.seat_infos())?;

        // Keep versions increasing across rounds on the same table
        let version = self
            .game
            .as_ref()
            .filter(|g| g.table_id == table_id)
            .map_or(1, |g| g.version + 1);
        let sync = GameStateSync::new(table_id, version, state);

        self.bots.clear();
        self.lobby.broadcast_game_start(&sync);
        self.install(sync);
        self.emit_lobby();
        self.drive_bots();
        Ok(())
    }

    /// The seat this client plays in the current round
    fn my_game_seat(&self) -> Option<Seat> {
        let id = self.lobby.id().to_string();
        self.game
            .as_ref()?
            .state
            .players
            .iter()
            .find(|p| p.network_id.as_deref() == Some(id.as_str()))
            .map(|p| p.id)
    }

    fn act(&mut self, action: GameAction) -> Result<(), SessionError> {
        self.active_table.ok_or(SessionError::NotSeated)?;
        let seat = self.my_game_seat().ok_or(SessionError::NoGame)?;
        self.apply(seat, action)?;
        self.drive_bots();
        Ok(())
    }

    /// Validate and apply an action locally, then publish the new snapshot
    fn apply(&mut self, seat: Seat, action: GameAction) -> Result<(), SessionError> {
        let current = self.game.as_ref().ok_or(SessionError::NoGame)?;
        let mut state = current.state.clone();

        match state.apply_action(seat, action.clone()) {
            Ok(events) => {
                let next = current.next(state);
                self.lobby.broadcast_action(next.table_id, seat, &action);
                self.lobby.broadcast_game_state(&next);
                self.install(next);
                self.emit(SessionEvent::GameEvents(events));
                Ok(())
            }
            Err(e) => {
                debug!("Seat {} action {:?} rejected: {}", seat, action, e);
                self.emit(SessionEvent::ActionRejected(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Count down an open steal window.
    ///
    /// The clock runs on the client of the seat allowed to steal; the host
    /// runs it for bot seats.
    fn tick(&mut self, elapsed_secs: u32) -> Result<(), SessionError> {
        let Some(current) = &self.game else {
            return Ok(());
        };
        let GamePhase::StealWindow { seat } = current.state.phase else {
            return Ok(());
        };
        let table_id = current.table_id;
        let is_bot = self.lobby.table(table_id).map(|t| t.is_bot(seat)).unwrap_or(false);
        let responsible = if is_bot {
            self.lobby.is_host(table_id)
        } else {
            self.my_game_seat() == Some(seat)
        };
        if !responsible {
            return Ok(());
        }

        let mut state = current.state.clone();
        let events = state.tick(elapsed_secs);
        if events.is_empty() {
            // Only the local countdown moved
            if let Some(game) = self.game.as_mut() {
                game.state = state;
            }
            return Ok(());
        }

        let next = current.next(state);
        self.lobby.broadcast_game_state(&next);
        self.install(next);
        self.emit(SessionEvent::GameEvents(events));
        self.drive_bots();
        Ok(())
    }

    /// As host, play every bot seat that is due, and close finished rounds
    fn drive_bots(&mut self) {
        for _ in 0..MAX_BOT_MOVES {
            let Some(sync) = &self.game else {
                return;
            };
            let table_id = sync.table_id;
            if self.active_table != Some(table_id) || !self.lobby.is_host(table_id) {
                return;
            }

            if sync.state.is_round_over() {
                let playing = self
                    .lobby
                    .table(table_id)
                    .map(|t| t.status == TableStatus::Playing)
                    .unwrap_or(false);
                if let (true, Some(result)) = (playing, sync.state.result()) {
                    match self.lobby.finish_game(table_id, &result) {
                        Ok(()) => self.emit_lobby(),
                        Err(e) => warn!("Could not close table {}: {}", table_id, e),
                    }
                }
                return;
            }

            let seat = match sync.state.phase {
                GamePhase::StealWindow { seat } => seat,
                _ => sync.state.turn,
            };
            let is_bot = self.lobby.table(table_id).map(|t| t.is_bot(seat)).unwrap_or(false);
            if !is_bot {
                return;
            }

            let difficulty = self.config.bot_difficulty;
            let bot = self
                .bots
                .entry(seat)
                .or_insert_with(|| Bot::new(seat, difficulty));
            let Some(action) = bot.choose_action(&sync.state) else {
                return;
            };
            if let Err(e) = self.apply(seat, action) {
                warn!("Bot at seat {} made an illegal move: {}", seat, e);
                return;
            }
        }
        warn!("Stopped driving bots after {} moves", MAX_BOT_MOVES);
    }

    fn handle_message(&mut self, msg: NetworkMessage) {
        let inbound = match msg.decode() {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!("Dropping message from {}: {}", msg.sender_id, e);
                return;
            }
        };

        match inbound {
            Inbound::Lobby(payload) => {
                if let Err(e) = self.lobby.handle_lobby_update(payload) {
                    warn!("Could not apply lobby update: {}", e);
                    return;
                }
                self.check_seated();
                self.emit_lobby();
                self.drive_bots();
            }
            Inbound::GameStart(sync) => {
                if self.active_table == Some(sync.table_id) {
                    info!("Round started at table {}", sync.table_id);
                    self.install(sync);
                    self.check_in_game();
                    self.drive_bots();
                }
            }
            Inbound::GameState(sync) => {
                if self.active_table != Some(sync.table_id) {
                    return;
                }
                if !sync.supersedes(self.game.as_ref()) {
                    debug!("Ignoring stale snapshot v{} for table {}", sync.version, sync.table_id);
                    return;
                }
                self.install(sync);
                self.check_in_game();
                self.drive_bots();
            }
            Inbound::Action(payload) => {
                if self.active_table == Some(payload.table_id) {
                    self.emit(SessionEvent::ActionAnnounced(payload));
                }
            }
        }
    }

    /// Lobby-side desynchronization check
    fn check_seated(&mut self) {
        if self.lobby.reconcile(self.active_table) {
            return;
        }
        // Payloads may arrive out of order; the store has the final word
        if let Err(e) = self.lobby.refresh() {
            warn!("Could not confirm seat: {}", e);
        }
        if !self.lobby.reconcile(self.active_table) {
            self.removed();
        }
    }

    /// Snapshot-side desynchronization check
    fn check_in_game(&mut self) {
        if self.game.is_some() && self.my_game_seat().is_none() {
            self.removed();
        }
    }

    fn removed(&mut self) {
        warn!("{} is no longer seated, returning to lobby", self.lobby.name());
        self.clear_table();
        self.emit(SessionEvent::Alert(Alert::RemovedFromTable));
    }

    fn release_seat(&mut self) {
        if self.active_table.is_none() {
            return;
        }
        if let Err(e) = self.lobby.leave_table() {
            warn!("Could not release seat for {}: {}", self.lobby.name(), e);
        }
        self.clear_table();
    }

    fn clear_table(&mut self) {
        self.active_table = None;
        self.game = None;
        self.bots.clear();
    }

    fn install(&mut self, sync: GameStateSync) {
        self.emit(SessionEvent::GameChanged(sync.clone()));
        self.game = Some(sync);
    }

    fn emit_lobby(&self) {
        self.emit(SessionEvent::LobbyChanged(self.lobby.list_tables().to_vec()));
    }

    fn emit(&self, event: SessionEvent) {
        // The UI may have gone away; the session keeps syncing regardless
        let _ = self.events.send(event);
    }
}
