// Pending Registry (spec.md §4.2): token -> one-shot completion slot.
// Grounded on `other_examples/a15836e1_Masorubka1-iscsi-client-rs__src-client-client.rs.rs`,
// which keys a `DashMap<u32, mpsc::Sender<RawPdu>>` by ITT so its reader loop
// can look up and complete the right in-flight request without a global
// lock; and on `other_examples/f201ac1a_MohammadEfhamiCc-penguin-rs__src-mux-inner.rs.rs`'s
// `FlowSlot` enum, which uses a `oneshot::Sender` as the one-shot completion
// primitive matching this spec's "PendingSlot" model.

use crate::proto::Response;
use dashmap::DashMap;
use tokio::sync::oneshot;

/// What a `PendingSlot` was ultimately completed with. Kept distinct from
/// `Response` (rather than synthesizing a fake `Response` for the closed
/// case) so the submitter can map `Closed` straight to `Error::ConnectionClosed`
/// without guessing at a sentinel token or response shape.
pub enum SlotOutcome {
    Delivered(Response),
    Closed,
}

/// The armed half of a pending slot: installed by a submitter, taken by
/// whichever of {the submitter on cancel, the Reader Demultiplexer on
/// delivery} acts first.
pub struct PendingSlot {
    sender: oneshot::Sender<SlotOutcome>,
}

/// The waiting half, held by the submitter that installed the slot.
pub struct PendingWaiter {
    receiver: oneshot::Receiver<SlotOutcome>,
}

/// Creates a newly armed slot and its paired waiter.
pub fn armed() -> (PendingSlot, PendingWaiter) {
    let (sender, receiver) = oneshot::channel();
    (PendingSlot { sender }, PendingWaiter { receiver })
}

impl PendingSlot {
    /// Delivers `response` to the waiting submitter. Consumes the slot;
    /// if the submitter already gave up (receiver dropped) the response is
    /// silently discarded, matching the "orphan responses" design note
    /// (spec.md §9): the registry entry is gone by the time delivery is
    /// attempted only in the cancel race, which is handled at the registry
    /// level (see `PendingRegistry::take`), not here.
    pub fn deliver(self, response: Response) {
        let _ = self.sender.send(SlotOutcome::Delivered(response));
    }

    /// Completes the slot with `ConnectionClosed`, used by the Reader
    /// Demultiplexer when draining on shutdown.
    pub fn deliver_closed(self) {
        let _ = self.sender.send(SlotOutcome::Closed);
    }
}

impl PendingWaiter {
    /// Awaits the slot's completion. `None` only if the slot was dropped
    /// without either `deliver` or `deliver_closed` being called, which
    /// should not happen in practice but is not treated as a panic.
    pub async fn wait(self) -> Option<SlotOutcome> {
        self.receiver.await.ok()
    }
}

/// Mapping from token to armed `PendingSlot`, accessed concurrently by
/// submitters (install + take-on-cancel) and by the Reader Demultiplexer
/// (take-on-deliver). `DashMap` gives per-entry atomicity without a global
/// registry lock, matching spec.md §4.2's contract.
#[derive(Default)]
pub struct PendingRegistry {
    slots: DashMap<u64, PendingSlot>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        PendingRegistry { slots: DashMap::new() }
    }

    /// Associates an armed slot with `token`. Panics if the token is already
    /// present — per spec.md §4.2 this indicates a programmer error (token
    /// reuse while still live), not a runtime condition callers should
    /// handle.
    pub fn install(&self, token: u64, slot: PendingSlot) {
        if self.slots.insert(token, slot).is_some() {
            panic!("docql: token {token} installed while already armed");
        }
    }

    /// Atomically removes and returns the slot if present.
    pub fn take(&self, token: u64) -> Option<PendingSlot> {
        self.slots.remove(&token).map(|(_, slot)| slot)
    }

    /// Empties the map and returns the removed slots so the caller (the
    /// Reader Demultiplexer on shutdown) can complete each one with
    /// `ConnectionClosed`. Iteration order is unspecified.
    pub fn drain(&self) -> Vec<PendingSlot> {
        let tokens: Vec<u64> = self.slots.iter().map(|entry| *entry.key()).collect();
        tokens
            .into_iter()
            .filter_map(|token| self.take(token))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
