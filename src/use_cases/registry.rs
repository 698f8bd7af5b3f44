// Room orchestration for spawning and retiring room tasks.

use crate::domain::ports::Clock;
use crate::use_cases::room::room_task;
use crate::use_cases::{RoomEvent, RoomUpdate};
use axum::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock, broadcast, mpsc};
use tracing::info;

/// Shared configuration for spawning room tasks.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity for inbound room events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast room updates and encoded frames.
    pub broadcast_capacity: usize,
}

/// Errors returned by room registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} already exists")]
    AlreadyExists(String),
}

/// Per-room channels.
#[derive(Clone)]
pub struct RoomHandle {
    /// Identifier clients use to target this room.
    pub room_id: Arc<str>,
    /// Sender for events into the room task.
    pub input_tx: mpsc::Sender<RoomEvent>,
    /// Broadcast sender for encoded frames shared by every member.
    pub frames_tx: broadcast::Sender<Bytes>,
    shutdown: Arc<Notify>,
}

/// A room handed out by `join_room`.
pub struct JoinedRoom {
    pub handle: RoomHandle,
    /// Present only for the connection that created the room; subscribed before the task
    /// started so the frame serializer cannot miss the first update.
    pub new_room_updates: Option<broadcast::Receiver<RoomUpdate>>,
}

struct RoomEntry {
    handle: RoomHandle,
    connections: usize,
    // Pinned rooms survive their last disconnect.
    pinned: bool,
}

/// Thread-safe registry for active rooms.
pub struct RoomRegistry {
    settings: RoomSettings,
    clock: Arc<dyn Clock>,
    rooms: RwLock<HashMap<String, RoomEntry>>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a room explicitly and spawns its task.
    pub async fn create_room(
        &self,
        room_id: String,
        pinned: bool,
    ) -> Result<JoinedRoom, RoomError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room_id) {
            return Err(RoomError::AlreadyExists(room_id));
        }

        let (handle, updates_rx) = self.spawn_room(&room_id);
        rooms.insert(
            room_id,
            RoomEntry {
                handle: handle.clone(),
                connections: 0,
                pinned,
            },
        );
        Ok(JoinedRoom {
            handle,
            new_room_updates: Some(updates_rx),
        })
    }

    /// Registers a connection, creating the room on first use.
    pub async fn join_room(&self, room_id: &str) -> JoinedRoom {
        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.get_mut(room_id) {
            entry.connections += 1;
            return JoinedRoom {
                handle: entry.handle.clone(),
                new_room_updates: None,
            };
        }

        let (handle, updates_rx) = self.spawn_room(room_id);
        rooms.insert(
            room_id.to_string(),
            RoomEntry {
                handle: handle.clone(),
                connections: 1,
                pinned: false,
            },
        );
        JoinedRoom {
            handle,
            new_room_updates: Some(updates_rx),
        }
    }

    /// Releases a connection; unpinned rooms close when the last one leaves.
    pub async fn leave_room(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        let Some(entry) = rooms.get_mut(room_id) else {
            return;
        };

        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections == 0 && !entry.pinned {
            if let Some(entry) = rooms.remove(room_id) {
                entry.handle.shutdown.notify_one();
                info!(room_id, "room removed after last disconnect");
            }
        }
    }

    fn spawn_room(&self, room_id: &str) -> (RoomHandle, broadcast::Receiver<RoomUpdate>) {
        // Channel wiring for the room task.
        let (input_tx, input_rx) = mpsc::channel::<RoomEvent>(self.settings.input_channel_capacity);
        let (updates_tx, updates_rx) =
            broadcast::channel::<RoomUpdate>(self.settings.broadcast_capacity);
        let (frames_tx, _frames_rx) = broadcast::channel::<Bytes>(self.settings.broadcast_capacity);
        let shutdown = Arc::new(Notify::new());
        let room_id: Arc<str> = Arc::from(room_id);

        tokio::spawn(room_task(
            room_id.clone(),
            input_rx,
            updates_tx,
            self.clock.clone(),
            shutdown.clone(),
        ));

        let handle = RoomHandle {
            room_id,
            input_tx,
            frames_tx,
            shutdown,
        };
        (handle, updates_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_epoch_millis(&self) -> f64 {
            0.0
        }
    }

    async fn connections(registry: &RoomRegistry, room_id: &str) -> Option<usize> {
        let rooms = registry.rooms.read().await;
        rooms.get(room_id).map(|entry| entry.connections)
    }

    fn registry() -> RoomRegistry {
        RoomRegistry::new(
            RoomSettings {
                input_channel_capacity: 8,
                broadcast_capacity: 8,
            },
            Arc::new(FixedClock),
        )
    }

    #[tokio::test]
    async fn join_creates_room_once_and_counts_connections() {
        let registry = registry();
        let first = registry.join_room("alpha").await;
        assert!(first.new_room_updates.is_some());

        let second = registry.join_room("alpha").await;
        assert!(second.new_room_updates.is_none());
        assert_eq!(connections(&registry, "alpha").await, Some(2));
    }

    #[tokio::test]
    async fn unpinned_room_is_removed_after_last_leave() {
        let registry = registry();
        registry.join_room("alpha").await;
        registry.join_room("alpha").await;

        registry.leave_room("alpha").await;
        assert_eq!(connections(&registry, "alpha").await, Some(1));

        registry.leave_room("alpha").await;
        assert_eq!(connections(&registry, "alpha").await, None);
    }

    #[tokio::test]
    async fn pinned_room_survives_last_leave() {
        let registry = registry();
        registry
            .create_room("lobby".to_string(), true)
            .await
            .expect("create pinned room");
        assert!(matches!(
            registry.create_room("lobby".to_string(), true).await,
            Err(RoomError::AlreadyExists(id)) if id == "lobby"
        ));

        registry.join_room("lobby").await;
        registry.leave_room("lobby").await;
        assert_eq!(connections(&registry, "lobby").await, Some(0));
    }
}
