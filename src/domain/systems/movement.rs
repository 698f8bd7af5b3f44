use crate::domain::state::{Direction, EntityState, MovementFlags};
use crate::domain::tuning::movement::MovementTuning;

/// Runs one local tick: snapshot position, step destination, face, pulse.
pub fn tick_entity(e: &mut EntityState, cfg: &MovementTuning) {
    e.prev_x = e.x;
    e.prev_y = e.y;

    step_destination(e, cfg);

    if let Some(direction) = derive_direction(e.movement) {
        e.direction = direction;
    }

    e.alpha = cfg.pulse_alpha;
}

/// Moves the destination by `cfg.step` per active flag, clamped per axis.
pub fn step_destination(e: &mut EntityState, cfg: &MovementTuning) {
    let flags = e.movement;

    if flags.up && e.dest_y > cfg.min {
        e.dest_y = e.dest_y.saturating_sub(cfg.step).max(cfg.min);
    }
    if flags.down && e.dest_y < cfg.max {
        e.dest_y = e.dest_y.saturating_add(cfg.step).min(cfg.max);
    }
    if flags.left && e.dest_x > cfg.min {
        e.dest_x = e.dest_x.saturating_sub(cfg.step).max(cfg.min);
    }
    if flags.right && e.dest_x < cfg.max {
        e.dest_x = e.dest_x.saturating_add(cfg.step).min(cfg.max);
    }
}

/// Facing for a flag combination; diagonals win over single axes, first match wins.
/// `None` means no flag matched and the previous facing should be kept.
pub fn derive_direction(flags: MovementFlags) -> Option<Direction> {
    let MovementFlags {
        left,
        right,
        down,
        up,
    } = flags;

    if up && left {
        Some(Direction::UpLeft)
    } else if up && right {
        Some(Direction::UpRight)
    } else if down && left {
        Some(Direction::DownLeft)
    } else if down && right {
        Some(Direction::DownRight)
    } else if down && !(right || left) {
        Some(Direction::Down)
    } else if up && !(right || left) {
        Some(Direction::Up)
    } else if left && !(up || down) {
        Some(Direction::Left)
    } else if right && !(up || down) {
        Some(Direction::Right)
    } else {
        None
    }
}

/// Advances the render blend and places x, y between prev and dest.
pub fn interpolate(e: &mut EntityState, cfg: &MovementTuning) {
    if e.alpha < 1.0 {
        e.alpha = (e.alpha + cfg.interpolation_step).min(1.0);
    }

    e.x = lerp(e.prev_x, e.dest_x, e.alpha);
    e.y = lerp(e.prev_y, e.dest_y, e.alpha);
}

fn lerp(from: u16, to: u16, ratio: f32) -> u16 {
    let ratio = ratio.clamp(0.0, 1.0);
    let value = (1.0 - ratio) * f32::from(from) + ratio * f32::from(to);
    // Stays between `from` and `to`, so the cast cannot leave u16.
    value.round() as u16
}
