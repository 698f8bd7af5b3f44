// Domain-level entity state and movement input types.

/// 8-way facing of a square. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    DownLeft = 0,
    Down = 1,
    DownRight = 2,
    Left = 3,
    UpLeft = 4,
    Right = 5,
    UpRight = 6,
    Up = 7,
}

impl Direction {
    /// Maps a wire byte back to a facing; `None` outside 0..=7.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::DownLeft),
            1 => Some(Self::Down),
            2 => Some(Self::DownRight),
            3 => Some(Self::Left),
            4 => Some(Self::UpLeft),
            5 => Some(Self::Right),
            6 => Some(Self::UpRight),
            7 => Some(Self::Up),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

/// Control flags set by input capture; several may be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementFlags {
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub up: bool,
}

impl MovementFlags {
    pub fn is_idle(&self) -> bool {
        !(self.left || self.right || self.down || self.up)
    }
}

/// Positional and animation record for one player-controlled square.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityState {
    // Stable per-session id, at most 255 UTF-8 bytes on the wire.
    pub identifier: String,
    // Epoch millis of the last authoritative write.
    pub last_update: f64,
    pub x: u16,
    pub y: u16,
    pub prev_x: u16,
    pub prev_y: u16,
    pub dest_x: u16,
    pub dest_y: u16,
    pub width: u16,
    pub height: u16,
    pub frame: u16,
    pub frame_count: u16,
    pub alpha: f32,
    pub direction: Direction,
    pub movement: MovementFlags,
}

impl EntityState {
    /// A freshly joined character with the server's spawn defaults.
    pub fn spawn(identifier: impl Into<String>, last_update: f64) -> Self {
        Self {
            identifier: identifier.into(),
            last_update,
            x: 1,
            y: 2,
            prev_x: 3,
            prev_y: 4,
            dest_x: 5,
            dest_y: 6,
            width: 100,
            height: 100,
            frame: 0,
            frame_count: 0,
            alpha: 0.0,
            direction: Direction::DownLeft,
            movement: MovementFlags::default(),
        }
    }
}
