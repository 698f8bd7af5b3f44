use super::types::{RoomEvent, RoomUpdate};
use crate::domain::EntityStore;
use crate::domain::ports::Clock;
use std::sync::Arc;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{debug, info, warn};

/// Single writer of a room's character table.
pub async fn room_task(
    room_id: Arc<str>,
    mut input_rx: mpsc::Receiver<RoomEvent>,
    updates_tx: broadcast::Sender<RoomUpdate>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<Notify>,
) {
    let mut characters = EntityStore::new();
    info!(room_id = %room_id, "room opened");

    loop {
        let ev = tokio::select! {
            _ = shutdown.notified() => break,
            ev = input_rx.recv() => match ev {
                Some(ev) => ev,
                None => break,
            },
        };

        if let Some(update) = apply_event(&mut characters, ev, clock.now_epoch_millis()) {
            // No receivers just means nobody is listening right now.
            let _ = updates_tx.send(update);
        }
    }

    info!(room_id = %room_id, remaining = characters.len(), "room closed");
}

/// Applies one event to the table and returns what should be broadcast.
pub fn apply_event(
    characters: &mut EntityStore,
    ev: RoomEvent,
    now_millis: f64,
) -> Option<RoomUpdate> {
    match ev {
        RoomEvent::Join { state } => {
            info!(identifier = %state.identifier, "character joined");
            characters.upsert(state);
            None
        }
        RoomEvent::Movement {
            identifier,
            mut state,
        } => {
            if state.identifier != identifier {
                // The session's identity is the key; payloads cannot move other squares.
                warn!(
                    identifier = %identifier,
                    claimed = %state.identifier,
                    "movement update re-keyed to session identifier"
                );
                state.identifier = identifier;
            }

            let previous = characters.get(&state.identifier).map(|c| c.last_update);
            state.last_update = next_timestamp(previous, now_millis);
            characters.upsert(state.clone());
            debug!(identifier = %state.identifier, "movement accepted");
            Some(RoomUpdate::Moved(state))
        }
        RoomEvent::Leave { identifier } => {
            let state = characters.remove(&identifier)?;
            info!(identifier = %identifier, "character left");
            Some(RoomUpdate::Left(state))
        }
    }
}

// Keeps per-entity timestamps strictly increasing when writes land in the same millisecond.
fn next_timestamp(previous: Option<f64>, now_millis: f64) -> f64 {
    match previous {
        Some(prev) if now_millis <= prev => prev + 1.0,
        _ => now_millis,
    }
}
