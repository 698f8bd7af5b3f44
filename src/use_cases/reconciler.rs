// Client-side reconciliation of decoded entity updates into the local world view.

use crate::domain::systems::movement;
use crate::domain::tuning::movement::MovementTuning;
use crate::domain::{EntityState, EntityStore, MovementFlags};

/// Result of classifying one inbound update against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First sighting of the identifier; stored verbatim.
    Inserted,
    /// Broadcast of our own state coming back; local input stays authoritative.
    SelfEcho,
    /// Stored timestamp is newer or equal; dropped.
    Stale,
    /// Newer remote state copied onto the stored record.
    Applied,
}

/// Owns the entity store and the single identity this peer controls.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: EntityStore,
    local_identity: Option<String>,
    tuning: MovementTuning,
}

impl Reconciler {
    pub fn new(store: EntityStore, tuning: MovementTuning) -> Self {
        Self {
            store,
            local_identity: None,
            tuning,
        }
    }

    pub fn local_identity(&self) -> Option<&str> {
        self.local_identity.as_deref()
    }

    pub fn get(&self, identifier: &str) -> Option<&EntityState> {
        self.store.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn snapshot(&self) -> Vec<EntityState> {
        self.store.snapshot()
    }

    /// Decides what `merge` would do with `incoming` without touching the store.
    pub fn classify(&self, incoming: &EntityState) -> MergeOutcome {
        // A timestamp that compares false against everything can never be ordered.
        if !incoming.last_update.is_finite() {
            return MergeOutcome::Stale;
        }
        let Some(stored) = self.store.get(&incoming.identifier) else {
            return MergeOutcome::Inserted;
        };
        if self.local_identity.as_deref() == Some(incoming.identifier.as_str()) {
            return MergeOutcome::SelfEcho;
        }
        if stored.last_update >= incoming.last_update {
            return MergeOutcome::Stale;
        }
        MergeOutcome::Applied
    }

    /// Applies an inbound update under last-write-wins with self-echo suppression.
    pub fn merge(&mut self, incoming: EntityState) -> MergeOutcome {
        let outcome = self.classify(&incoming);
        match outcome {
            MergeOutcome::Inserted => self.store.upsert(incoming),
            MergeOutcome::SelfEcho | MergeOutcome::Stale => {}
            MergeOutcome::Applied => {
                if let Some(stored) = self.store.get_mut(&incoming.identifier) {
                    stored.prev_x = incoming.prev_x;
                    stored.prev_y = incoming.prev_y;
                    stored.dest_x = incoming.dest_x;
                    stored.dest_y = incoming.dest_y;
                    stored.direction = incoming.direction;
                    stored.movement = incoming.movement;
                    stored.alpha = self.tuning.pulse_alpha;
                    stored.last_update = incoming.last_update;
                }
            }
        }
        outcome
    }

    /// Drops an entity after a departure notice; unknown identifiers are a no-op.
    pub fn remove(&mut self, identifier: &str) -> bool {
        self.store.remove(identifier).is_some()
    }

    /// Installs the state this peer controls, bypassing merge rules.
    pub fn set_local_identity(&mut self, state: EntityState) {
        self.local_identity = Some(state.identifier.clone());
        self.store.upsert(state);
    }

    /// Input capture path for the local entity.
    pub fn set_local_movement(&mut self, flags: MovementFlags) {
        if let Some(local) = self.local_mut() {
            local.movement = flags;
        }
    }

    /// Runs one frame of local movement and returns the state to broadcast.
    pub fn advance_local_tick(&mut self) -> Option<EntityState> {
        let tuning = self.tuning;
        let local = self.local_mut()?;
        movement::tick_entity(local, &tuning);
        Some(local.clone())
    }

    /// Moves every square's rendered position toward its destination by one frame.
    pub fn advance_interpolation(&mut self) {
        for e in self.store.iter_mut() {
            movement::interpolate(e, &self.tuning);
        }
    }

    fn local_mut(&mut self) -> Option<&mut EntityState> {
        let identifier = self.local_identity.as_deref()?;
        self.store.get_mut(identifier)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(EntityStore::new(), MovementTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn remote(identifier: &str, last_update: f64) -> EntityState {
        EntityState::spawn(identifier, last_update)
    }

    #[test]
    fn first_sighting_inserts_verbatim() {
        let mut reconciler = Reconciler::default();
        let mut state = remote("peer", 100.0);
        state.x = 77;
        state.alpha = 0.9;

        assert_eq!(reconciler.merge(state.clone()), MergeOutcome::Inserted);
        assert_eq!(reconciler.get("peer"), Some(&state));
    }

    #[test]
    fn non_finite_timestamps_never_win() {
        let mut reconciler = Reconciler::default();
        reconciler.merge(remote("peer", 100.0));
        let before = reconciler.get("peer").cloned();

        let mut poisoned = remote("peer", f64::NAN);
        poisoned.dest_x = 111;
        assert_eq!(reconciler.merge(poisoned), MergeOutcome::Stale);
        assert_eq!(reconciler.merge(remote("ghost", f64::INFINITY)), MergeOutcome::Stale);
        assert!(reconciler.get("ghost").is_none());

        let mut older = remote("peer", 50.0);
        older.dest_x = 222;
        assert_eq!(reconciler.merge(older), MergeOutcome::Stale);
        assert_eq!(reconciler.get("peer").cloned(), before);
    }

    #[test]
    fn stale_updates_are_rejected_and_newer_applied() {
        let mut reconciler = Reconciler::default();
        reconciler.merge(remote("peer", 100.0));
        let before = reconciler.get("peer").cloned();

        let mut older = remote("peer", 50.0);
        older.dest_x = 200;
        assert_eq!(reconciler.merge(older), MergeOutcome::Stale);
        assert_eq!(reconciler.get("peer").cloned(), before);

        let mut tie = remote("peer", 100.0);
        tie.dest_x = 201;
        assert_eq!(reconciler.merge(tie), MergeOutcome::Stale);
        assert_eq!(reconciler.get("peer").cloned(), before);

        let mut newer = remote("peer", 150.0);
        newer.dest_x = 202;
        assert_eq!(reconciler.merge(newer), MergeOutcome::Applied);
        let stored = reconciler.get("peer").expect("stored");
        assert_eq!(stored.dest_x, 202);
        assert_eq!(stored.last_update, 150.0);
    }

    #[test]
    fn applied_merge_copies_only_movement_fields() {
        let mut reconciler = Reconciler::default();
        let mut first = remote("peer", 1.0);
        first.x = 10;
        first.y = 11;
        first.width = 30;
        first.frame = 2;
        reconciler.merge(first);

        let mut update = remote("peer", 2.0);
        update.x = 300;
        update.y = 301;
        update.width = 1;
        update.frame = 9;
        update.prev_x = 20;
        update.prev_y = 21;
        update.dest_x = 22;
        update.dest_y = 23;
        update.direction = Direction::Up;
        update.movement.up = true;
        update.alpha = 0.7;

        assert_eq!(reconciler.merge(update), MergeOutcome::Applied);
        let stored = reconciler.get("peer").expect("stored");
        assert_eq!((stored.x, stored.y, stored.width, stored.frame), (10, 11, 30, 2));
        assert_eq!(
            (stored.prev_x, stored.prev_y, stored.dest_x, stored.dest_y),
            (20, 21, 22, 23)
        );
        assert_eq!(stored.direction, Direction::Up);
        assert!(stored.movement.up);
        assert_eq!(stored.alpha, MovementTuning::default().pulse_alpha);
    }

    #[test]
    fn merging_twice_matches_merging_once() {
        let mut once = Reconciler::default();
        let mut twice = Reconciler::default();
        once.merge(remote("peer", 1.0));
        twice.merge(remote("peer", 1.0));

        let mut update = remote("peer", 5.0);
        update.dest_y = 99;
        once.merge(update.clone());
        twice.merge(update.clone());
        assert_eq!(twice.merge(update), MergeOutcome::Stale);

        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn self_echo_never_mutates_local_state() {
        let mut reconciler = Reconciler::default();
        reconciler.set_local_identity(remote("me", 1.0));
        let before = reconciler.get("me").cloned();

        let mut echo = remote("me", 1_000.0);
        echo.dest_x = 399;
        assert_eq!(reconciler.merge(echo), MergeOutcome::SelfEcho);
        assert_eq!(reconciler.get("me").cloned(), before);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reconciler = Reconciler::default();
        reconciler.merge(remote("peer", 1.0));
        assert!(reconciler.remove("peer"));
        assert!(!reconciler.remove("peer"));
        assert!(!reconciler.remove("never-seen"));
        assert!(reconciler.is_empty());
    }

    #[test]
    fn set_local_identity_overwrites_existing_record() {
        let mut reconciler = Reconciler::default();
        let mut seen = remote("me", 500.0);
        seen.x = 1;
        reconciler.merge(seen);

        let mut joined = remote("me", 10.0);
        joined.x = 42;
        reconciler.set_local_identity(joined.clone());

        assert_eq!(reconciler.local_identity(), Some("me"));
        assert_eq!(reconciler.get("me"), Some(&joined));
    }

    #[test]
    fn local_tick_moves_destination_and_emits_state() {
        let mut reconciler = Reconciler::default();
        assert_eq!(reconciler.advance_local_tick(), None);

        reconciler.set_local_identity(remote("ab12", 1.0));
        reconciler.set_local_movement(MovementFlags {
            right: true,
            ..MovementFlags::default()
        });

        let emitted = reconciler.advance_local_tick().expect("local state");
        assert_eq!(emitted.dest_x, 7);
        assert_eq!(emitted.direction, Direction::Right);
        assert_eq!((emitted.prev_x, emitted.prev_y), (1, 2));
        assert_eq!(reconciler.get("ab12"), Some(&emitted));
    }

    #[test]
    fn interpolation_touches_every_entity() {
        let mut reconciler = Reconciler::default();
        let mut peer = remote("peer", 1.0);
        peer.prev_x = 0;
        peer.dest_x = 100;
        peer.alpha = 0.99;
        reconciler.merge(peer);

        reconciler.advance_interpolation();
        let stored = reconciler.get("peer").expect("stored");
        assert_eq!(stored.alpha, 1.0);
        assert_eq!(stored.x, 100);
        assert_eq!(stored.last_update, 1.0);
    }
}
