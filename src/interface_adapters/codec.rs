// Fixed-layout binary codec for entity state payloads.
//
// Every field is listed once in `LAYOUT`; encode and decode both walk that table so the
// two sides cannot drift apart. Integers use a two-byte base-256 split (quotient, remainder),
// floats are big-endian IEEE-754, booleans are single 0/1 bytes.

use crate::domain::{Direction, EntityState};
use thiserror::Error;

/// Length written in front of the timestamp; the value is always a 64-bit float.
pub const TIMESTAMP_LEN: u8 = 8;

/// Errors produced while encoding or decoding an entity state payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("identifier is {0} bytes; the length prefix holds at most 255")]
    IdentifierTooLong(usize),
    #[error("buffer truncated reading {field}: need {needed} bytes, {remaining} remain")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("timestamp length must be 8, got {0}")]
    TimestampLength(u8),
    #[error("identifier is not valid UTF-8")]
    InvalidIdentifier,
    #[error("direction byte {0} is outside 0..=7")]
    InvalidDirection(u8),
    #[error("{field} flag byte must be 0 or 1, got {value}")]
    InvalidFlag { field: &'static str, value: u8 },
    #[error("{0} trailing bytes after the last field")]
    TrailingBytes(usize),
    #[error("timestamp {0} is not a finite number")]
    NonFiniteTimestamp(String),
}

/// How many bytes a field occupies on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// One length byte followed by that many bytes; `Some(n)` pins the length.
    LengthPrefixed(Option<u8>),
    Fixed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Identifier,
    LastUpdate,
    X,
    Y,
    PrevX,
    PrevY,
    DestX,
    DestY,
    Height,
    Width,
    Frame,
    FrameCount,
    Alpha,
    Direction,
    MoveLeft,
    MoveRight,
    MoveDown,
    MoveUp,
}

/// Wire order of an entity state payload.
pub const LAYOUT: [Field; 18] = [
    Field::Identifier,
    Field::LastUpdate,
    Field::X,
    Field::Y,
    Field::PrevX,
    Field::PrevY,
    Field::DestX,
    Field::DestY,
    Field::Height,
    Field::Width,
    Field::Frame,
    Field::FrameCount,
    Field::Alpha,
    Field::Direction,
    Field::MoveLeft,
    Field::MoveRight,
    Field::MoveDown,
    Field::MoveUp,
];

impl Field {
    pub const fn width(self) -> Width {
        match self {
            Field::Identifier => Width::LengthPrefixed(None),
            Field::LastUpdate => Width::LengthPrefixed(Some(TIMESTAMP_LEN)),
            Field::X
            | Field::Y
            | Field::PrevX
            | Field::PrevY
            | Field::DestX
            | Field::DestY
            | Field::Height
            | Field::Width
            | Field::Frame
            | Field::FrameCount => Width::Fixed(2),
            Field::Alpha => Width::Fixed(4),
            Field::Direction
            | Field::MoveLeft
            | Field::MoveRight
            | Field::MoveDown
            | Field::MoveUp => Width::Fixed(1),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Field::Identifier => "identifier",
            Field::LastUpdate => "lastUpdate",
            Field::X => "x",
            Field::Y => "y",
            Field::PrevX => "prevX",
            Field::PrevY => "prevY",
            Field::DestX => "destX",
            Field::DestY => "destY",
            Field::Height => "height",
            Field::Width => "width",
            Field::Frame => "frame",
            Field::FrameCount => "frameCount",
            Field::Alpha => "alpha",
            Field::Direction => "direction",
            Field::MoveLeft => "moveLeft",
            Field::MoveRight => "moveRight",
            Field::MoveDown => "moveDown",
            Field::MoveUp => "moveUp",
        }
    }

    fn int(self, state: &EntityState) -> Option<u16> {
        let value = match self {
            Field::X => state.x,
            Field::Y => state.y,
            Field::PrevX => state.prev_x,
            Field::PrevY => state.prev_y,
            Field::DestX => state.dest_x,
            Field::DestY => state.dest_y,
            Field::Height => state.height,
            Field::Width => state.width,
            Field::Frame => state.frame,
            Field::FrameCount => state.frame_count,
            _ => return None,
        };
        Some(value)
    }

    fn int_mut(self, state: &mut EntityState) -> Option<&mut u16> {
        let slot = match self {
            Field::X => &mut state.x,
            Field::Y => &mut state.y,
            Field::PrevX => &mut state.prev_x,
            Field::PrevY => &mut state.prev_y,
            Field::DestX => &mut state.dest_x,
            Field::DestY => &mut state.dest_y,
            Field::Height => &mut state.height,
            Field::Width => &mut state.width,
            Field::Frame => &mut state.frame,
            Field::FrameCount => &mut state.frame_count,
            _ => return None,
        };
        Some(slot)
    }

    fn flag(self, state: &EntityState) -> Option<bool> {
        let value = match self {
            Field::MoveLeft => state.movement.left,
            Field::MoveRight => state.movement.right,
            Field::MoveDown => state.movement.down,
            Field::MoveUp => state.movement.up,
            _ => return None,
        };
        Some(value)
    }

    fn flag_mut(self, state: &mut EntityState) -> Option<&mut bool> {
        let slot = match self {
            Field::MoveLeft => &mut state.movement.left,
            Field::MoveRight => &mut state.movement.right,
            Field::MoveDown => &mut state.movement.down,
            Field::MoveUp => &mut state.movement.up,
            _ => return None,
        };
        Some(slot)
    }
}

/// Splits a value into `[v / 256, v % 256]`.
pub fn split_u16(value: u16) -> [u8; 2] {
    [(value / 256) as u8, (value % 256) as u8]
}

/// Reassembles `hi * 256 + lo`.
pub fn join_u16(bytes: [u8; 2]) -> u16 {
    u16::from(bytes[0]) * 256 + u16::from(bytes[1])
}

/// Exact payload size for `state`.
pub fn encoded_len(state: &EntityState) -> usize {
    LAYOUT
        .iter()
        .map(|field| match field.width() {
            Width::LengthPrefixed(Some(n)) => 1 + usize::from(n),
            Width::LengthPrefixed(None) => 1 + state.identifier.len(),
            Width::Fixed(n) => n,
        })
        .sum()
}

pub fn encode(state: &EntityState) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(encoded_len(state));
    for field in LAYOUT {
        write_field(&mut out, field, state)?;
    }
    Ok(out)
}

fn write_field(out: &mut Vec<u8>, field: Field, state: &EntityState) -> Result<(), CodecError> {
    match field {
        Field::Identifier => {
            let bytes = state.identifier.as_bytes();
            let len =
                u8::try_from(bytes.len()).map_err(|_| CodecError::IdentifierTooLong(bytes.len()))?;
            out.push(len);
            out.extend_from_slice(bytes);
        }
        Field::LastUpdate => {
            out.push(TIMESTAMP_LEN);
            out.extend_from_slice(&state.last_update.to_be_bytes());
        }
        Field::Alpha => out.extend_from_slice(&state.alpha.to_be_bytes()),
        Field::Direction => out.push(state.direction.to_wire()),
        other => {
            if let Some(value) = other.int(state) {
                out.extend_from_slice(&split_u16(value));
            } else if let Some(flag) = other.flag(state) {
                out.push(u8::from(flag));
            }
        }
    }
    Ok(())
}

pub fn decode(buf: &[u8]) -> Result<EntityState, CodecError> {
    let mut reader = Reader { buf, pos: 0 };
    let mut state = EntityState::default();
    for field in LAYOUT {
        read_field(&mut reader, field, &mut state)?;
    }

    let remaining = reader.remaining();
    if remaining > 0 {
        return Err(CodecError::TrailingBytes(remaining));
    }
    Ok(state)
}

fn read_field(
    reader: &mut Reader<'_>,
    field: Field,
    state: &mut EntityState,
) -> Result<(), CodecError> {
    match field {
        Field::Identifier => {
            let len = reader.byte(field)?;
            let bytes = reader.take(field, usize::from(len))?;
            let identifier =
                std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidIdentifier)?;
            state.identifier = identifier.to_owned();
        }
        Field::LastUpdate => {
            let len = reader.byte(field)?;
            if len != TIMESTAMP_LEN {
                return Err(CodecError::TimestampLength(len));
            }
            let last_update = f64::from_be_bytes(reader.array(field)?);
            if !last_update.is_finite() {
                return Err(CodecError::NonFiniteTimestamp(last_update.to_string()));
            }
            state.last_update = last_update;
        }
        Field::Alpha => state.alpha = f32::from_be_bytes(reader.array(field)?),
        Field::Direction => {
            let value = reader.byte(field)?;
            state.direction =
                Direction::from_wire(value).ok_or(CodecError::InvalidDirection(value))?;
        }
        other => {
            if let Some(slot) = other.int_mut(state) {
                *slot = join_u16(reader.array(other)?);
            } else if let Some(slot) = other.flag_mut(state) {
                *slot = match reader.byte(other)? {
                    0 => false,
                    1 => true,
                    value => {
                        return Err(CodecError::InvalidFlag {
                            field: other.name(),
                            value,
                        });
                    }
                };
            }
        }
    }
    Ok(())
}

// Bounds-checked cursor over the inbound buffer.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, field: Field, needed: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(CodecError::Truncated {
                field: field.name(),
                needed,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    fn byte(&mut self, field: Field) -> Result<u8, CodecError> {
        Ok(self.take(field, 1)?[0])
    }

    fn array<const N: usize>(&mut self, field: Field) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }
}
