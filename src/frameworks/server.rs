// Framework bootstrap for the room server runtime.

use crate::frameworks::config;
use crate::frameworks::runtime::init_runtime;
use crate::interface_adapters::net::{spawn_room_serializer, ws_handler};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::{RoomRegistry, RoomSettings};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state().await?;
    // Start the Web Server
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let clock = Arc::new(SystemClock);

    // Setup Room Registry
    // This owns the set of active room tasks.
    let room_registry = Arc::new(RoomRegistry::new(
        RoomSettings {
            input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
            broadcast_capacity: config::BROADCAST_CAPACITY,
        },
        clock.clone(),
    ));

    // Keep the default room pinned so it never gets deleted.
    let default_room = room_registry
        .create_room(config::DEFAULT_ROOM_ID.to_string(), true)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default room: {e}")))?;
    if let Some(updates_rx) = default_room.new_room_updates {
        spawn_room_serializer(&default_room.handle, updates_rx);
    }

    Ok(Arc::new(AppState {
        room_registry,
        default_room_id: Arc::from(config::DEFAULT_ROOM_ID),
        clock,
    }))
}
