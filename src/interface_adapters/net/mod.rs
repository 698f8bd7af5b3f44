// Network adapter modules split by server-side sockets vs the peer driver.

pub mod client;
pub mod peer;

pub use client::{spawn_room_serializer, ws_handler};
pub use peer::{PeerError, PeerSocket, WorldView, connect, run_peer};
