use std::sync::Arc;

use ahash::AHashMap;
use codec::LogicalAddress;
use parking_lot::{Mutex, RwLock};

use crate::peer::PeerHandle;

/// Two-level `group -> logical address -> session` index.
///
/// The outer map is keyed by group name and guarded by its own lock so
/// that lookups for unrelated groups never contend with each other.
/// Each inner map is wrapped in its own `Mutex` rather than sharing the
/// outer lock, mirroring the per-bucket locking the teacher uses for
/// its session table.
///
/// Invariant: a group present in the outer map always has a non-empty
/// inner map. `remove` double-checks emptiness under the outer write
/// lock before dropping a group entry, so a concurrent `add` racing
/// with the last `remove` of a group can never be lost.
#[derive(Default)]
pub struct RoutingTable {
    groups: RwLock<AHashMap<String, Arc<Mutex<AHashMap<LogicalAddress, Arc<PeerHandle>>>>>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn group_bucket(&self, group: &str) -> Arc<Mutex<AHashMap<LogicalAddress, Arc<PeerHandle>>>> {
        if let Some(bucket) = self.groups.read().get(group) {
            return bucket.clone();
        }

        self.groups
            .write()
            .entry(group.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(AHashMap::default())))
            .clone()
    }

    /// Registers `peer` under `(group, addr)`, replacing any previous
    /// occupant of that slot.
    pub fn add(&self, group: &str, addr: LogicalAddress, peer: Arc<PeerHandle>) {
        let bucket = self.group_bucket(group);
        bucket.lock().insert(addr, peer);
    }

    /// Removes the `(group, addr)` entry. A no-op if it is not present,
    /// and a no-op on `group` entirely if it was never created or has
    /// already been cleaned up.
    pub fn remove(&self, group: &str, addr: &LogicalAddress) {
        let bucket = match self.groups.read().get(group) {
            Some(bucket) => bucket.clone(),
            None => return,
        };

        let empty = {
            let mut locked = bucket.lock();
            locked.remove(addr);
            locked.is_empty()
        };

        if empty {
            let mut groups = self.groups.write();
            if let Some(bucket) = groups.get(group) {
                if bucket.lock().is_empty() {
                    groups.remove(group);
                }
            }
        }
    }

    /// Removes every `(group, addr)` entry pointing at `peer`,
    /// regardless of which groups the caller remembers the peer
    /// having joined. Used for teardown when the session's own
    /// bookkeeping might have raced with a concurrent disconnect.
    pub fn remove_peer_everywhere(&self, peer: &Arc<PeerHandle>) {
        let groups: Vec<String> = self.groups.read().keys().cloned().collect();
        for group in groups {
            let bucket = match self.groups.read().get(&group) {
                Some(bucket) => bucket.clone(),
                None => continue,
            };

            let empty = {
                let mut locked = bucket.lock();
                locked.retain(|_, p| !Arc::ptr_eq(p, peer));
                locked.is_empty()
            };

            if empty {
                let mut groups_guard = self.groups.write();
                if let Some(bucket) = groups_guard.get(&group) {
                    if bucket.lock().is_empty() {
                        groups_guard.remove(&group);
                    }
                }
            }
        }
    }

    pub fn find(&self, group: &str, addr: &LogicalAddress) -> Option<Arc<PeerHandle>> {
        self.groups.read().get(group)?.lock().get(addr).cloned()
    }

    /// Every session currently registered in `group`, in unspecified
    /// order.
    pub fn members_of(&self, group: &str) -> Vec<Arc<PeerHandle>> {
        match self.groups.read().get(group) {
            Some(bucket) => bucket.lock().values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Every `(address, session)` pair currently registered in
    /// `group`, for replying to a membership query.
    pub fn members_with_addr(&self, group: &str) -> Vec<(LogicalAddress, Arc<PeerHandle>)> {
        match self.groups.read().get(group) {
            Some(bucket) => bucket
                .lock()
                .iter()
                .map(|(addr, peer)| (*addr, peer.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every distinct session reachable from any group, for the
    /// sweeper's idle scan.
    pub fn all_sessions(&self) -> Vec<Arc<PeerHandle>> {
        let groups: Vec<_> = self.groups.read().values().cloned().collect();
        let mut seen = ahash::AHashSet::default();
        let mut out = Vec::new();
        for bucket in groups {
            for peer in bucket.lock().values() {
                if seen.insert(peer.id) {
                    out.push(peer.clone());
                }
            }
        }
        out
    }

    pub fn group_count(&self) -> usize {
        self.groups.read().len()
    }
}
