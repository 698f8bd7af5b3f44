use std::{env, time::Duration};

// Runtime constants (not movement tuning).

pub fn http_port() -> u16 {
    env::var("SQUARE_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub fn server_url() -> String {
    env::var("SQUARE_SERVER_URL").unwrap_or_else(|_| "ws://127.0.0.1:3000/ws".to_string())
}

pub fn room_id() -> String {
    env::var("SQUARE_ROOM_ID").unwrap_or_else(|_| DEFAULT_ROOM_ID.to_string())
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const BROADCAST_CAPACITY: usize = 128;
pub const DEFAULT_ROOM_ID: &str = "room1";

// One movement step per rendered frame.
pub const CLIENT_TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
pub const INPUT_QUEUE_CAPACITY: usize = 32;
