use std::sync::Arc;

use codec::{Command, GossipRecord};
use parking_lot::RwLock;

use crate::{peer::PeerHandle, routing::RoutingTable};

/// Notified when a session is torn down abnormally (socket error,
/// idle eviction, or a forced close), so it can fan out a `SUSPECT`
/// record to the groups that session belonged to.
///
/// Matches the teacher's `ServiceHandler` callback pattern: a trait
/// with a default no-op body, invoked by the core on state
/// transitions the handler itself never triggers.
pub trait FailureListener: Send + Sync {
    fn on_suspect(&self, routing: &RoutingTable, peer: &Arc<PeerHandle>) {
        let _ = (routing, peer);
    }
}

/// The router's own baseline listener: tells every other member of
/// every group `peer` belonged to that `peer` is gone.
pub struct DefaultSuspectListener;

impl FailureListener for DefaultSuspectListener {
    fn on_suspect(&self, routing: &RoutingTable, peer: &Arc<PeerHandle>) {
        let addrs = peer.logical_addresses();
        for group in peer.known_groups() {
            for addr in &addrs {
                let mut record = GossipRecord::new(Command::Suspect);
                record.group = Some(group.clone());
                record.addr = Some(*addr);

                crate::relay::multicast(routing, &group, Some(peer), &record);
            }
        }
    }
}

/// Copy-on-write registry of failure listeners. Reads (the common
/// case, one dispatch per closed session) never block on a writer;
/// registration is rare enough that a full clone-and-replace on write
/// is the right tradeoff, the same one the teacher makes for its own
/// rarely-mutated, frequently-read tables.
#[derive(Default)]
pub struct FailureListeners {
    listeners: RwLock<Vec<Arc<dyn FailureListener>>>,
}

impl FailureListeners {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(vec![Arc::new(DefaultSuspectListener) as Arc<dyn FailureListener>]),
        }
    }

    pub fn register(&self, listener: Arc<dyn FailureListener>) {
        let mut next = self.listeners.read().clone();
        next.push(listener);
        *self.listeners.write() = next;
    }

    pub fn notify(&self, routing: &RoutingTable, peer: &Arc<PeerHandle>) {
        for listener in self.listeners.read().iter() {
            listener.on_suspect(routing, peer);
        }
    }
}
