use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use ahash::AHashSet;
use codec::{GossipRecord, LogicalAddress};
use parking_lot::Mutex;

/// Outbound delivery for one session's socket.
///
/// This crate never touches a socket itself; the binary crate plugs in
/// an implementation that hands the record to the owning session's
/// task, which is the only task ever allowed to write to that socket
/// (this is what keeps a single destination's writes from
/// interleaving with each other).
pub trait Outbox: Send + Sync {
    /// Queue a record for delivery. Must not block. A session that has
    /// already torn down simply drops the record.
    fn deliver(&self, record: GossipRecord);

    /// Force the owning session closed, as if its socket had failed.
    fn shutdown(&self);
}

/// Shared, session-side state visible to the routing table, address
/// mapping, and relay/failure-notification logic.
///
/// A `PeerHandle` is the non-owning handle the routing table stores;
/// the owning `Session` task (in the binary crate) holds the matching
/// strong reference to the socket and drops it on close.
pub struct PeerHandle {
    pub id: u64,
    logical_addresses: Mutex<Vec<LogicalAddress>>,
    known_groups: Mutex<AHashSet<String>>,
    logical_name: Mutex<Option<String>>,
    timestamp_ms: AtomicU64,
    active: AtomicBool,
    outbox: Box<dyn Outbox>,
}

impl PeerHandle {
    pub fn new(id: u64, outbox: Box<dyn Outbox>, now_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            logical_addresses: Mutex::new(Vec::new()),
            known_groups: Mutex::new(AHashSet::default()),
            logical_name: Mutex::new(None),
            timestamp_ms: AtomicU64::new(now_ms),
            active: AtomicBool::new(true),
            outbox,
        })
    }

    pub fn set_logical_name(&self, name: Option<String>) {
        *self.logical_name.lock() = name;
    }

    pub fn logical_name(&self) -> Option<String> {
        self.logical_name.lock().clone()
    }

    pub fn touch(&self, now_ms: u64) {
        self.timestamp_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms.load(Ordering::Relaxed))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Idempotent transition to inactive. Returns `true` only for the
    /// caller that actually performed the flip, so `close()` runs
    /// exactly once.
    pub fn deactivate(&self) -> bool {
        self.active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn note_group(&self, group: &str) {
        if !self.known_groups.lock().contains(group) {
            self.known_groups.lock().insert(group.to_string());
        }
    }

    pub fn known_groups(&self) -> Vec<String> {
        self.known_groups.lock().iter().cloned().collect()
    }

    pub fn add_logical_address(&self, addr: LogicalAddress) {
        let mut addrs = self.logical_addresses.lock();
        if !addrs.contains(&addr) {
            addrs.push(addr);
        }
    }

    pub fn logical_addresses(&self) -> Vec<LogicalAddress> {
        self.logical_addresses.lock().clone()
    }

    pub fn send(&self, record: GossipRecord) {
        if self.is_active() {
            self.outbox.deliver(record);
        }
    }

    pub fn shutdown(&self) {
        self.outbox.shutdown();
    }
}

impl std::fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Returns the set of distinct peers in `handles`, deduplicated by
/// identity rather than by any address they happen to hold.
pub fn dedup_by_identity(handles: Vec<Arc<PeerHandle>>) -> Vec<Arc<PeerHandle>> {
    let mut seen = HashSet::with_capacity(handles.len());
    handles
        .into_iter()
        .filter(|handle| seen.insert(handle.id))
        .collect()
}
