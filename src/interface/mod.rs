//! Network interfaces as seen by Neighbor Discovery.
//!
//! The engine does not own the interface table. It reads and mutates it
//! through [`InterfaceTable`], so any interface store can be plugged in.

use std::net::Ipv6Addr;

use fxhash::{FxBuildHasher, FxHashMap};
use inet_types::{
    iface::MacAddress,
    ip::{Ipv6AddrExt, Ipv6Prefix},
};

mod id;
pub use self::id::*;

mod flags;
pub use self::flags::*;

mod addrs;
pub use self::addrs::*;

/// A network interface, mapping a link-layer device to its IPv6 addresses.
#[derive(Debug, Clone)]
pub struct Interface {
    /// The name of the interface.
    ///
    /// A name uniquely identifies an interface, either directly or through the
    /// interface-id derived from the name.
    pub name: String,
    /// The link-layer address of the underlying device.
    pub mac: MacAddress,
    /// Flags indicating the state and capabilities of the associated device.
    pub flags: InterfaceFlags,
    /// A list of addresses bound to this interface.
    pub addrs: Vec<InterfaceAddr>,
}

impl Interface {
    #[must_use]
    pub fn new(name: impl Into<String>, mac: MacAddress, flags: InterfaceFlags) -> Self {
        Self {
            name: name.into(),
            mac,
            flags,
            addrs: Vec::new(),
        }
    }

    /// A multicast capable ethernet interface without addresses.
    #[must_use]
    pub fn ethernet(name: impl Into<String>, mac: MacAddress) -> Self {
        Self::new(name, mac, InterfaceFlags::en0())
    }

    #[must_use]
    pub fn ifid(&self) -> IfId {
        IfId::new(&self.name)
    }

    #[must_use]
    pub fn addr(&self, addr: Ipv6Addr) -> Option<&InterfaceAddr> {
        self.addrs.iter().find(|a| a.addr == addr)
    }

    /// Whether `addr` is assigned, in whatever state.
    #[must_use]
    pub fn has_addr(&self, addr: Ipv6Addr) -> bool {
        self.addr(addr).is_some()
    }

    #[must_use]
    pub fn is_tentative(&self, addr: Ipv6Addr) -> bool {
        self.addr(addr).is_some_and(InterfaceAddr::is_tentative)
    }

    /// Whether `addr` is assigned and usable as a source address.
    #[must_use]
    pub fn is_preferred(&self, addr: Ipv6Addr) -> bool {
        self.addr(addr).is_some_and(InterfaceAddr::is_preferred)
    }

    /// The first usable address, in order of assignment.
    #[must_use]
    pub fn preferred_addr(&self) -> Option<Ipv6Addr> {
        self.addrs
            .iter()
            .find(|a| a.is_preferred())
            .map(|a| a.addr)
    }

    /// The link-local address, in whatever state.
    #[must_use]
    pub fn link_local(&self) -> Option<&InterfaceAddr> {
        self.addrs.iter().find(|a| a.addr.is_link_local())
    }

    /// Whether any address within `prefix` is assigned.
    #[must_use]
    pub fn has_addr_in(&self, prefix: Ipv6Prefix) -> bool {
        self.addrs.iter().any(|a| prefix.contains(a.addr))
    }

    /// Assigns an address, replacing an existing assignment of the same address.
    pub fn assign(&mut self, addr: InterfaceAddr) {
        if let Some(existing) = self.addrs.iter_mut().find(|a| a.addr == addr.addr) {
            *existing = addr;
        } else {
            self.addrs.push(addr);
        }
    }

    /// Sets the state of an assigned address, returning whether it was assigned.
    pub fn set_state(&mut self, addr: Ipv6Addr, state: AddrState) -> bool {
        match self.addrs.iter_mut().find(|a| a.addr == addr) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }
}

/// Access to the interfaces of a node.
pub trait InterfaceTable {
    /// All interface ids, in a stable order.
    fn ids(&self) -> Vec<IfId>;

    fn get(&self, ifid: IfId) -> Option<&Interface>;

    fn get_mut(&mut self, ifid: IfId) -> Option<&mut Interface>;
}

impl<T: InterfaceTable + ?Sized> InterfaceTable for &mut T {
    fn ids(&self) -> Vec<IfId> {
        (**self).ids()
    }

    fn get(&self, ifid: IfId) -> Option<&Interface> {
        (**self).get(ifid)
    }

    fn get_mut(&mut self, ifid: IfId) -> Option<&mut Interface> {
        (**self).get_mut(ifid)
    }
}

/// An in-memory interface table.
#[derive(Debug, Clone)]
pub struct Interfaces {
    ifaces: FxHashMap<IfId, Interface>,
}

impl Interfaces {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ifaces: FxHashMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Adds an interface, replacing any interface with the same name.
    pub fn add(&mut self, iface: Interface) -> IfId {
        let ifid = iface.ifid();
        self.ifaces.insert(ifid, iface);
        ifid
    }

    pub fn remove(&mut self, ifid: IfId) -> Option<Interface> {
        self.ifaces.remove(&ifid)
    }
}

impl Default for Interfaces {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceTable for Interfaces {
    fn ids(&self) -> Vec<IfId> {
        let mut ids = self.ifaces.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    fn get(&self, ifid: IfId) -> Option<&Interface> {
        self.ifaces.get(&ifid)
    }

    fn get_mut(&mut self, ifid: IfId) -> Option<&mut Interface> {
        self.ifaces.get_mut(&ifid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface() -> Interface {
        let mut iface = Interface::ethernet("en0", MacAddress::from([2, 0, 0, 0, 0, 1]));
        iface.assign(InterfaceAddr::tentative(
            Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0xff, 0xfe00, 1),
            64,
        ));
        iface.assign(InterfaceAddr::preferred(
            Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
            64,
        ));
        iface
    }

    #[test]
    fn address_states() {
        let mut iface = iface();
        let ll = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0xff, 0xfe00, 1);

        assert!(iface.is_tentative(ll));
        assert_eq!(
            iface.preferred_addr(),
            Some(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1))
        );
        assert_eq!(iface.link_local().map(|a| a.addr), Some(ll));

        assert!(iface.set_state(ll, AddrState::Preferred));
        assert_eq!(iface.preferred_addr(), Some(ll));
        assert!(!iface.set_state(Ipv6Addr::LOCALHOST, AddrState::Preferred));
    }

    #[test]
    fn assign_replaces() {
        let mut iface = iface();
        let global = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
        iface.assign(InterfaceAddr::tentative(global, 64));
        assert_eq!(iface.addrs.len(), 2);
        assert!(iface.is_tentative(global));
        assert!(iface.has_addr_in("2001:db8::/64".parse().unwrap()));
        assert!(!iface.has_addr_in("2001:db8:1::/64".parse().unwrap()));
        assert_eq!(
            iface.addrs[1].to_string(),
            "inet6 2001:db8::1 prefixlen 64 (tentative)"
        );
    }

    #[test]
    fn table_ids_are_sorted() {
        let mut table = Interfaces::new();
        let b = table.add(Interface::ethernet("en1", MacAddress::NULL));
        let a = table.add(Interface::ethernet("en0", MacAddress::NULL));
        assert_eq!(table.ids(), vec![a, b]);
        assert!(table.get(a).is_some());
        assert!(table.remove(a).is_some());
        assert_eq!(table.ids(), vec![b]);
    }
}
