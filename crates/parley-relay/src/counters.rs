//! Monitoring counters, updated at slot-table state transitions and
//! surfaced both as `tracing` events and as a plain snapshot for tests.
//!
//! `active_slots` has exactly one writer for each direction: allocation
//! increments it, and removing an entry from the slot table (whether by
//! a joiner claiming it or by [`crate::slot::SlotTable::forget`])
//! decrements it. The event-specific counters (`rendezvous`,
//! `timeouts`, ...) are bumped alongside but never touch `active_slots`
//! themselves, so a slot is never double-counted on exit.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing counts of the events §4.4 asks to be
/// exposed for monitoring.
#[derive(Default)]
pub struct Counters {
    allocations: AtomicU64,
    rendezvous: AtomicU64,
    timeouts: AtomicU64,
    no_slot: AtomicU64,
    bad_proto: AtomicU64,
    active_slots: AtomicU64,
}

/// Point-in-time read of [`Counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub allocations: u64,
    pub rendezvous: u64,
    pub timeouts: u64,
    pub no_slot: u64,
    pub bad_proto: u64,
    pub active_slots: u64,
}

impl Counters {
    pub fn record_allocation(&self) {
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.active_slots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rendezvous(&self) {
        self.rendezvous.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_slot(&self) {
        self.no_slot.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bad_proto(&self) {
        self.bad_proto.fetch_add(1, Ordering::Relaxed);
    }

    /// A slot entry left the table, for any reason.
    pub fn record_slot_removed(&self) {
        self.active_slots.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            allocations: self.allocations.load(Ordering::Relaxed),
            rendezvous: self.rendezvous.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            no_slot: self.no_slot.load(Ordering::Relaxed),
            bad_proto: self.bad_proto.load(Ordering::Relaxed),
            active_slots: self.active_slots.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_then_removal_nets_to_zero_active() {
        let counters = Counters::default();
        counters.record_allocation();
        counters.record_rendezvous();
        counters.record_slot_removed();
        let snap = counters.snapshot();
        assert_eq!(snap.allocations, 1);
        assert_eq!(snap.rendezvous, 1);
        assert_eq!(snap.active_slots, 0);
    }

    #[test]
    fn timeout_and_removal_are_independent_counters() {
        let counters = Counters::default();
        counters.record_allocation();
        counters.record_timeout();
        counters.record_slot_removed();
        assert_eq!(counters.snapshot().active_slots, 0);
        assert_eq!(counters.snapshot().timeouts, 1);
    }
}
