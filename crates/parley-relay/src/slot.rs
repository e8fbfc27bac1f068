//! Slot table: allocation, lookup-and-remove, and the one-shot
//! rendezvous hand-off between the two per-peer connection tasks.
//!
//! A single reader-writer mutex guards the table; every mutation
//! (allocate-and-register, lookup-and-remove) takes the writer lock for
//! the shortest possible critical section, per the donor's own design
//! note that per-slot locks are unnecessary at this scale.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::counters::Counters;
use crate::error::RelayError;

/// One opaque application frame forwarded verbatim between paired peers.
pub type RelayFrame = String;

/// The half of a paired connection handed to the other side: where to
/// send frames addressed to me, and where to send my own sender back
/// (the "read-then-write" one-shot hand-off of the design notes).
pub struct PeerLink {
    pub to_me: mpsc::Sender<RelayFrame>,
    pub reply: oneshot::Sender<mpsc::Sender<RelayFrame>>,
}

struct SlotEntry {
    deliver: oneshot::Sender<PeerLink>,
}

/// Process-wide shared slot table.
#[derive(Clone)]
pub struct SlotTable {
    inner: Arc<RwLock<HashMap<String, SlotEntry>>>,
    counters: Arc<Counters>,
}

/// A freshly booked slot, waiting for its partner.
pub struct Booking {
    pub slot: String,
    deliver_rx: oneshot::Receiver<PeerLink>,
}

impl SlotTable {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            counters,
        }
    }

    /// START -> BOOKED: allocate a fresh slot id from the progressively
    /// widening ranges of the data model and register its rendezvous
    /// channel. Fails with [`RelayError::NoMoreSlots`] if every range is
    /// exhausted.
    pub async fn allocate(&self) -> Result<Booking, RelayError> {
        let (deliver_tx, deliver_rx) = oneshot::channel();
        let mut table = self.inner.write().await;

        let slot = allocate_id(&table).ok_or_else(|| {
            self.counters.record_no_slot();
            RelayError::NoMoreSlots
        })?;

        table.insert(slot.clone(), SlotEntry { deliver: deliver_tx });
        drop(table);

        self.counters.record_allocation();
        Ok(Booking { slot, deliver_rx })
    }

    /// START -> JOINED: look up and atomically remove a slot entry so no
    /// third peer may join. Fails with [`RelayError::NoSuchSlot`] if
    /// absent.
    pub async fn take(&self, slot: &str) -> Result<oneshot::Sender<PeerLink>, RelayError> {
        let mut table = self.inner.write().await;
        match table.remove(slot) {
            Some(entry) => {
                self.counters.record_slot_removed();
                Ok(entry.deliver)
            }
            None => {
                self.counters.record_no_slot();
                Err(RelayError::NoSuchSlot)
            }
        }
    }

    /// Remove a slot entry without a peer ever having claimed it
    /// (timeout or early disconnect of the booking side).
    pub async fn forget(&self, slot: &str) {
        let mut table = self.inner.write().await;
        if table.remove(slot).is_some() {
            self.counters.record_slot_removed();
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

impl Booking {
    /// Wait for a joiner to claim this slot, or until `timeout` elapses.
    /// On arrival, completes the read-then-write hand-off and returns
    /// the joiner's forwarding endpoint plus our own inbound receiver.
    pub async fn await_peer(
        self,
        timeout: std::time::Duration,
        counters: &Counters,
    ) -> Result<(mpsc::Sender<RelayFrame>, mpsc::Receiver<RelayFrame>), RelayError> {
        let link = tokio::time::timeout(timeout, self.deliver_rx)
            .await
            .map_err(|_| {
                counters.record_timeout();
                RelayError::SlotTimedOut
            })?
            .map_err(|_| RelayError::PeerHungUp)?;

        let (my_tx, my_rx) = mpsc::channel(32);
        link.reply
            .send(my_tx)
            .map_err(|_| RelayError::PeerHungUp)?;

        Ok((link.to_me, my_rx))
    }
}

/// Join the other half of a pairing: deliver our endpoint through the
/// booking side's deliver channel, then wait for its reply.
pub async fn join_peer(
    deliver: oneshot::Sender<PeerLink>,
) -> Result<(mpsc::Sender<RelayFrame>, mpsc::Receiver<RelayFrame>), RelayError> {
    let (my_tx, my_rx) = mpsc::channel(32);
    let (reply_tx, reply_rx) = oneshot::channel();

    deliver
        .send(PeerLink {
            to_me: my_tx,
            reply: reply_tx,
        })
        .map_err(|_| RelayError::NoSuchSlot)?;

    let booking_tx = reply_rx.await.map_err(|_| RelayError::PeerHungUp)?;
    Ok((booking_tx, my_rx))
}

/// §3's progressively widening allocation strategy: 3 attempts in
/// [0,10), 64 in [0,256), 1024 in [0,65536), 1024 in [0,16777216).
const ALLOCATION_RANGES: [(u32, u32); 4] = [(10, 3), (256, 64), (65536, 1024), (16_777_216, 1024)];

fn allocate_id(table: &HashMap<String, SlotEntry>) -> Option<String> {
    allocate_id_within(table, &ALLOCATION_RANGES)
}

fn allocate_id_within(table: &HashMap<String, SlotEntry>, ranges: &[(u32, u32)]) -> Option<String> {
    let mut rng = rand::thread_rng();
    for &(bound, attempts) in ranges {
        for _ in 0..attempts {
            let candidate = rng.gen_range(0..bound).to_string();
            if !table.contains_key(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SlotTable {
        SlotTable::new(Arc::new(Counters::default()))
    }

    #[tokio::test]
    async fn allocate_never_returns_a_slot_already_in_the_table() {
        let table = table();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let booking = table.allocate().await.unwrap();
            assert!(seen.insert(booking.slot.clone()));
        }
    }

    #[tokio::test]
    async fn take_on_unknown_slot_is_no_such_slot() {
        let table = table();
        let err = table.take("nonexistent").await.unwrap_err();
        assert!(matches!(err, RelayError::NoSuchSlot));
    }

    #[tokio::test]
    async fn take_removes_the_entry_so_a_third_peer_cannot_join() {
        let table = table();
        let booking = table.allocate().await.unwrap();
        table.take(&booking.slot).await.unwrap();
        let err = table.take(&booking.slot).await.unwrap_err();
        assert!(matches!(err, RelayError::NoSuchSlot));
    }

    #[tokio::test]
    async fn allocate_then_join_pair_and_exchange_a_frame() {
        let table = table();
        let booking = table.allocate().await.unwrap();
        let slot = booking.slot.clone();
        let deliver = table.take(&slot).await.unwrap();

        let booking_side = tokio::spawn(async move {
            booking
                .await_peer(std::time::Duration::from_secs(5), &Counters::default())
                .await
        });
        let joiner_side = tokio::spawn(async move { join_peer(deliver).await });

        let (to_joiner, mut from_joiner) = booking_side.await.unwrap().unwrap();
        let (to_booker, mut from_booker) = joiner_side.await.unwrap().unwrap();

        to_joiner.send("hello from booker".to_string()).await.unwrap();
        assert_eq!(from_booker.recv().await.unwrap(), "hello from booker");

        to_booker.send("hello from joiner".to_string()).await.unwrap();
        assert_eq!(from_joiner.recv().await.unwrap(), "hello from joiner");
    }

    #[tokio::test]
    async fn await_peer_times_out_when_nobody_joins() {
        let table = table();
        let counters = Counters::default();
        let booking = table.allocate().await.unwrap();
        let err = booking
            .await_peer(std::time::Duration::from_millis(10), &counters)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::SlotTimedOut));
        assert_eq!(counters.snapshot().timeouts, 1);
    }

    #[test]
    fn exhausting_every_range_reports_no_more_slots() {
        // A table with "0" already taken and a single one-attempt range
        // over [0,1) has exactly one possible id, already occupied.
        let (tx, _rx) = oneshot::channel();
        let mut saturated = HashMap::new();
        saturated.insert("0".to_string(), SlotEntry { deliver: tx });

        assert!(allocate_id_within(&saturated, &[(1, 1)]).is_none());
    }
}
