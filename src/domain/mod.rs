// Domain layer: entity state model and movement rules.

pub mod ports;
pub mod state;
pub mod store;
pub mod systems;
pub mod tuning;

pub use state::{Direction, EntityState, MovementFlags};
pub use store::EntityStore;
