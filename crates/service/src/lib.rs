//! Core routing state for the gossip router: the group membership
//! table, address/name lookups, relay fan-out, and the
//! failure-notification hook.
//!
//! This crate is synchronous and holds no socket of its own — every
//! lock here is a `parking_lot` lock whose critical section never
//! crosses an `.await`, so the binary crate's tokio tasks can call
//! into it freely without risking a held lock across a suspend point.

pub mod failure;
pub mod mapping;
pub mod peer;
pub mod relay;
pub mod routing;

use std::sync::Arc;

pub use failure::{DefaultSuspectListener, FailureListener, FailureListeners};
pub use mapping::{AddressMapping, NameRegistry};
pub use peer::{Outbox, PeerHandle, dedup_by_identity};
pub use routing::RoutingTable;

/// The full set of shared indices a session needs to serve requests:
/// group membership, the logical/physical address map, the
/// name-to-address registry, and the failure-notification hook.
///
/// Cloning is cheap — every field is already an `Arc`-backed
/// collection internally, but `Router` itself groups them so the
/// binary crate's acceptor can hand one value to each session rather
/// than threading four separate references through.
#[derive(Clone)]
pub struct Router {
    pub routing: Arc<RoutingTable>,
    pub addresses: Arc<AddressMapping>,
    pub names: Arc<NameRegistry>,
    pub failures: Arc<FailureListeners>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routing: Arc::new(RoutingTable::new()),
            addresses: Arc::new(AddressMapping::new()),
            names: Arc::new(NameRegistry::new()),
            failures: Arc::new(FailureListeners::new()),
        }
    }

    /// Teardown for an abnormal session end: a socket or framing
    /// error, idle sweep, or a forced eviction of a squatting peer.
    /// Removes the peer from every group it is registered under,
    /// clears its address and name mappings, and fans out a suspect
    /// notification before forgetting it entirely.
    ///
    /// Idempotent: `PeerHandle::deactivate` guarantees only the first
    /// caller (whichever of the read loop, the sweeper, or an error
    /// path gets there first) runs the teardown body.
    pub fn close(&self, peer: &Arc<PeerHandle>) {
        self.close_internal(peer, true);
    }

    /// Teardown for a graceful session end: an explicit `CLOSE`
    /// command or a clean EOF. Same bookkeeping as [`Self::close`]
    /// but never fans out a suspect notification.
    pub fn close_gracefully(&self, peer: &Arc<PeerHandle>) {
        self.close_internal(peer, false);
    }

    fn close_internal(&self, peer: &Arc<PeerHandle>, notify: bool) {
        if !peer.deactivate() {
            return;
        }

        if notify {
            self.failures.notify(&self.routing, peer);
        }

        self.routing.remove_peer_everywhere(peer);
        for addr in peer.logical_addresses() {
            self.addresses.remove(&addr);
            self.names.remove_value(&addr);
        }

        peer.shutdown();
    }
}
