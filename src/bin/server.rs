//! Standalone chat hub server backed by in-memory storage.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin roomcast-server
//! cargo run --bin roomcast-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use roomcast::{
    common::logger::setup_logger,
    config::ServerConfig,
    domain::{RoomId, RoomProfile},
    hub::Hub,
    infrastructure::repository::{
        InMemoryMessageRepository, InMemoryRoomCatalog, InMemoryStatsRepository,
    },
    lifecycle::LifecycleService,
    ui::{AppState, run_server},
};

#[derive(Parser, Debug)]
#[command(name = "roomcast-server")]
#[command(about = "Room-based WebSocket chat hub", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to
    #[arg(short = 'p', long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // Storage: in-memory repositories behind the domain traits. A SQL
    // deployment swaps these out without touching the hub.
    let messages = Arc::new(InMemoryMessageRepository::new());
    let stats = Arc::new(InMemoryStatsRepository::new());
    let catalog = Arc::new(InMemoryRoomCatalog::new());

    // Seed a lobby so the server is usable out of the box.
    let lobby_id = match RoomId::new("lobby".to_string()) {
        Ok(id) => id,
        Err(error) => {
            tracing::error!(%error, "invalid seed room id");
            std::process::exit(1);
        }
    };
    let mut lobby = RoomProfile::new(lobby_id, "Lobby");
    lobby.pinned = true;
    catalog.set_pinned(vec![lobby]).await;

    let (hub, handle) = Hub::new(&config.hub, messages, stats);
    tokio::spawn(hub.run());

    let lifecycle = LifecycleService::new(handle.clone(), catalog);
    if let Err(error) = lifecycle.refresh_pinned_rooms().await {
        tracing::error!(%error, "initial pinned room refresh failed");
    }
    tokio::spawn(lifecycle.run(config.lifecycle_interval));

    let state = Arc::new(AppState {
        hub: handle,
        outbound_queue_capacity: config.hub.outbound_queue_capacity,
    });

    if let Err(error) = run_server(&config.host, config.port, state).await {
        tracing::error!("server error: {error}");
        std::process::exit(1);
    }
}
