use ahash::AHashMap;
use codec::{LogicalAddress, PhysicalAddress};
use parking_lot::RwLock;

/// Flat `logical address -> physical address` table, independent of
/// group membership (a session keeps one physical mapping regardless
/// of how many groups it has joined).
#[derive(Default)]
pub struct AddressMapping {
    table: RwLock<AHashMap<LogicalAddress, PhysicalAddress>>,
}

impl AddressMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, addr: LogicalAddress, physical: PhysicalAddress) {
        self.table.write().insert(addr, physical);
    }

    pub fn get(&self, addr: &LogicalAddress) -> Option<PhysicalAddress> {
        self.table.read().get(addr).copied()
    }

    /// Removes `addr`'s mapping if present. A no-op otherwise — a
    /// session that never advertised a physical address, or whose
    /// mapping was already cleared by a prior teardown, leaves this
    /// call with nothing to do.
    pub fn remove(&self, addr: &LogicalAddress) {
        self.table.write().remove(addr);
    }
}

/// Flat `logical name -> logical address` registry, used to resolve
/// `GOSSIP_GET` lookups by friendly name rather than raw address.
#[derive(Default)]
pub struct NameRegistry {
    table: RwLock<AHashMap<String, LogicalAddress>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, addr: LogicalAddress) {
        self.table.write().insert(name.to_string(), addr);
    }

    pub fn get(&self, name: &str) -> Option<LogicalAddress> {
        self.table.read().get(name).copied()
    }

    pub fn remove_value(&self, addr: &LogicalAddress) {
        self.table.write().retain(|_, v| v != addr);
    }
}
