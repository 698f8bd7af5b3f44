use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// Seed for the session identity hash.
const IDENTITY_SEED: u32 = 0xCAFE_BABE;

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns a process-unique, monotonically increasing connection id.
pub fn connection_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

/// Entity identifier for a new session: lowercase hex of a seeded 32-bit hash over
/// the connection id followed by the join time in epoch millis.
pub fn session_identifier(connection_id: u64, now_millis: u64) -> String {
    let mut hasher = crc32fast::Hasher::new_with_initial(IDENTITY_SEED);
    hasher.update(format!("{connection_id}{now_millis}").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        let a = connection_id();
        let b = connection_id();
        assert!(b > a);
    }

    #[test]
    fn session_identifier_is_stable_short_hex() {
        let id = session_identifier(7, 1_700_000_000_000);
        assert_eq!(id, session_identifier(7, 1_700_000_000_000));
        assert!(id.len() <= 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn session_identifier_depends_on_both_inputs() {
        let base = session_identifier(7, 1_000);
        assert_ne!(base, session_identifier(8, 1_000));
        assert_ne!(base, session_identifier(7, 1_001));
    }
}
