// Use-case level inputs/outputs for a room task.

use crate::domain::EntityState;

#[derive(Debug, Clone)]
pub enum RoomEvent {
    // A connection's freshly spawned character.
    Join { state: EntityState },
    // Movement upload from the connection owning `identifier`.
    Movement {
        identifier: String,
        state: EntityState,
    },
    Leave { identifier: String },
}

/// Authoritative changes the room broadcasts to every member.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomUpdate {
    Moved(EntityState),
    Left(EntityState),
}
