use crate::domain::ports::Clock;
use crate::use_cases::RoomRegistry;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct AppState {
    // Active rooms and their tasks.
    pub room_registry: Arc<RoomRegistry>,
    // Room used when a client does not ask for one.
    pub default_room_id: Arc<str>,
    // Time source for join timestamps.
    pub clock: Arc<dyn Clock>,
}

// System clock adapter used by the room tasks.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as f64
    }
}
