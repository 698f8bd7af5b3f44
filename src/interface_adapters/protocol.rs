// Wire envelope for websocket binary messages: one event tag byte, then an entity payload.

use crate::domain::EntityState;
use crate::interface_adapters::codec::{self, CodecError};
use thiserror::Error;

/// Event a payload is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    // Initial full-state push to a newly connected peer only.
    Joined = 1,
    // Periodic local-state upload from a peer.
    MovementUpdate = 2,
    // Authoritative rebroadcast of an accepted movement update to the whole room.
    UpdatedMovement = 3,
    // Departure notice carrying the leaving peer's last known state.
    Left = 4,
}

impl EventKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Joined),
            2 => Some(Self::MovementUpdate),
            3 => Some(Self::UpdatedMovement),
            4 => Some(Self::Left),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::MovementUpdate => "movementUpdate",
            Self::UpdatedMovement => "updatedMovement",
            Self::Left => "left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown event tag {0}")]
    UnknownEvent(u8),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// One decoded websocket message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: EventKind,
    pub state: EntityState,
}

impl Frame {
    pub fn new(event: EventKind, state: EntityState) -> Self {
        Self { event, state }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_event(self.event, &self.state)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, payload) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        let event = EventKind::from_tag(tag).ok_or(ProtocolError::UnknownEvent(tag))?;
        let state = codec::decode(payload)?;
        Ok(Self { event, state })
    }
}

/// Encodes without taking ownership of the state.
pub fn encode_event(event: EventKind, state: &EntityState) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(1 + codec::encoded_len(state));
    out.push(event as u8);
    out.extend_from_slice(&codec::encode(state)?);
    Ok(out)
}
