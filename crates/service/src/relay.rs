use std::sync::Arc;

use codec::{GossipRecord, LogicalAddress};

use crate::{peer::PeerHandle, routing::RoutingTable};

/// Delivers `record` to the single session registered under
/// `(group, addr)`. A miss (unknown group, unknown address, or a
/// session that has already gone inactive) is silently dropped — the
/// sender is not the intended recipient's keeper.
pub fn unicast(routing: &RoutingTable, group: &str, addr: &LogicalAddress, record: GossipRecord) {
    if let Some(peer) = routing.find(group, addr) {
        peer.send(record);
    }
}

/// Delivers `record` to every session registered in `group` except
/// `exclude` (identity comparison, not address comparison — a
/// broadcast carries no `addr` field to compare against).
pub fn multicast(
    routing: &RoutingTable,
    group: &str,
    exclude: Option<&Arc<PeerHandle>>,
    record: &GossipRecord,
) {
    for peer in routing.members_of(group) {
        if let Some(sender) = exclude {
            if Arc::ptr_eq(&peer, sender) {
                continue;
            }
        }
        peer.send(record.clone());
    }
}
