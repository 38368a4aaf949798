//! Tuosan table simulation.
//!
//! Logs a few clients into a shared store over the simulated network, seats
//! them at the first table and lets them auto-play one round against bots.

use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuosan_core::{Bot, BotDifficulty, GameStateSync};
use tuosan_sync::{
    FileStore, GameSession, MemoryStore, Network, SessionEvent, SessionEvents, SessionHandle,
    SharedStore, SyncConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::from_env();
    let players: Vec<String> = std::env::var("TUOSAN_PLAYERS")
        .unwrap_or_else(|_| "Alice,Bob".into())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(4)
        .collect();

    info!("Starting Tuosan simulation with {:?}", players);

    let store: Arc<dyn SharedStore> = match &config.store_path {
        Some(path) => {
            info!("Using store file {}", path.display());
            Arc::new(FileStore::new(path))
        }
        None => Arc::new(MemoryStore::new()),
    };
    let network = Network::new(config.channel_capacity);

    let mut clients = Vec::new();
    for (seat, name) in players.iter().enumerate() {
        let (handle, events) = GameSession::spawn(name, store.clone(), &network, config.clone())?;
        handle.sit_down(0, seat).await?;
        clients.push((handle, events));
    }
    let Some((host, _)) = clients.first() else {
        anyhow::bail!("TUOSAN_PLAYERS names no players");
    };
    host.start_game().await?;

    let drivers: Vec<_> = clients
        .into_iter()
        .map(|(handle, events)| tokio::spawn(autoplay(handle, events, config.bot_difficulty)))
        .collect();

    for driver in drivers {
        let (handle, last) = driver.await??;
        if let Some(result) = last.and_then(|sync| sync.state.result()) {
            info!(
                "{} saw the round end: order {:?}, team points {:?}",
                handle.client_id(),
                result.finish_order,
                result.team_points
            );
        }
        handle.shutdown().await?;
    }

    Ok(())
}

/// Play this client's seat with a bot until the round is over
async fn autoplay(
    handle: SessionHandle,
    mut events: SessionEvents,
    difficulty: BotDifficulty,
) -> anyhow::Result<(SessionHandle, Option<GameStateSync>)> {
    let me = handle.client_id().to_string();
    let mut bot: Option<Bot> = None;
    let mut acted_on = 0;

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::GameChanged(sync) => {
                if sync.state.is_round_over() {
                    return Ok((handle, Some(sync)));
                }
                if sync.version <= acted_on {
                    continue;
                }
                let Some(seat) = sync
                    .state
                    .players
                    .iter()
                    .find(|p| p.network_id.as_deref() == Some(me.as_str()))
                    .map(|p| p.id)
                else {
                    continue;
                };
                let bot = bot.get_or_insert_with(|| Bot::new(seat, difficulty));
                if let Some(action) = bot.choose_action(&sync.state) {
                    acted_on = sync.version;
                    if let Err(e) = handle.act(action).await {
                        debug!("Action on v{} not taken: {}", sync.version, e);
                    }
                }
            }
            SessionEvent::ActionAnnounced(payload) => {
                debug!("Seat {} played {:?}", payload.seat, payload.action);
            }
            SessionEvent::Alert(alert) => warn!("{}: {:?}", me, alert),
            _ => {}
        }
    }
    Ok((handle, None))
}
