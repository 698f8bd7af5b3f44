// Use cases layer: reconciliation on peers and room workflows on the server.

pub mod reconciler;
pub mod registry;
pub mod room;
pub mod types;

pub use reconciler::{MergeOutcome, Reconciler};
pub use registry::{JoinedRoom, RoomError, RoomHandle, RoomRegistry, RoomSettings};
pub use types::{RoomEvent, RoomUpdate};
