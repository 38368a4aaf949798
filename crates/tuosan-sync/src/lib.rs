//! Table synchronization for Tuosan.
//!
//! Clients share one versioned record of lobby tables and talk over a
//! best-effort broadcast bus. Each client runs a [`session::GameSession`]
//! actor that:
//! - claims seats with compare-and-swap on the shared store
//! - applies round actions locally through `tuosan-core`
//! - broadcasts whole snapshots and replaces its view with newer ones
//! - detects when it has been dropped from its table
//!
//! # Modules
//!
//! - [`store`]: `SharedStore` with in-memory and JSON file backends
//! - [`network`]: Simulated broadcast bus
//! - [`protocol`]: Lobby model and message envelopes
//! - [`lobby`]: Table list, seats and host handling
//! - [`session`]: Per-client actor
//! - [`admin`]: Credential gate for the system reset
//! - [`config`]: Environment configuration

pub mod admin;
pub mod config;
pub mod lobby;
pub mod network;
pub mod protocol;
pub mod session;
pub mod store;

pub use admin::{verify_credential, AdminError, AdminGate, AdminToken};
pub use config::SyncConfig;
pub use lobby::{Lobby, LobbyError};
pub use network::{Network, Publisher, Subscriber};
pub use protocol::{
    ClientId, GameTable, Inbound, LobbyPlayer, MessageType, NetworkMessage, PlayerActionPayload,
    ProtocolError, TableStatus,
};
pub use session::{
    Alert, GameSession, SessionCommand, SessionError, SessionEvent, SessionEvents, SessionHandle,
};
pub use store::{FileStore, MemoryStore, Record, SharedStore, StoreError, Versioned};
