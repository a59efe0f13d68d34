//! The neighbour cache and the default router ring.
//!
//! Entries live in a slot arena. Slots are stable for the lifetime of an entry,
//! which lets the default router ring link entries by slot index. Lookups go
//! through an ordered index keyed by [`NeighborKey`].

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    net::Ipv6Addr,
};

use des::time::SimTime;
use inet_types::{iface::MacAddress, ip::Ipv6Packet};

use super::timer::{TimerCtrl, TimerToken};
use crate::{
    error::{NdpError, Result},
    interface::IfId,
};

mod ring;
use self::ring::RingLink;
pub use self::ring::DefaultRouterRing;

/// Identifies a neighbour. Ordered by interface first, then address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeighborKey {
    pub ifid: IfId,
    pub addr: Ipv6Addr,
}

impl NeighborKey {
    #[must_use]
    pub fn new(addr: Ipv6Addr, ifid: IfId) -> Self {
        Self { ifid, addr }
    }

    pub(crate) fn ar_timer(&self) -> TimerToken {
        TimerToken::AddressResolution {
            target: self.addr,
            ifid: self.ifid,
        }
    }

    pub(crate) fn nud_timer(&self) -> TimerToken {
        TimerToken::NeighborUnreachability {
            target: self.addr,
            ifid: self.ifid,
        }
    }
}

impl fmt::Display for NeighborKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%{}", self.addr, self.ifid)
    }
}

/// Reachability states of RFC 4861 §7.3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborState {
    Incomplete,
    Reachable,
    Stale,
    Delay,
    Probe,
}

/// An outbound datagram waiting for address resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPacket {
    pub pkt: Ipv6Packet,
    pub enqueued: SimTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    key: NeighborKey,
    pub(crate) mac: MacAddress,
    pub(crate) is_router: bool,
    pub(crate) is_home_agent: bool,
    pub(crate) state: NeighborState,
    pub(crate) reachability_expiry: SimTime,
    pub(crate) probes_sent: usize,
    pub(crate) router_expiry: SimTime,
    pending: VecDeque<PendingPacket>,
    ring: Option<RingLink>,
}

impl NeighborEntry {
    fn new(key: NeighborKey, mac: MacAddress, state: NeighborState) -> Self {
        Self {
            key,
            mac,
            is_router: false,
            is_home_agent: false,
            state,
            reachability_expiry: SimTime::ZERO,
            probes_sent: 0,
            router_expiry: SimTime::ZERO,
            pending: VecDeque::new(),
            ring: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> NeighborKey {
        self.key
    }

    #[must_use]
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    #[must_use]
    pub fn state(&self) -> NeighborState {
        self.state
    }

    #[must_use]
    pub fn is_router(&self) -> bool {
        self.is_router
    }

    #[must_use]
    pub fn is_home_agent(&self) -> bool {
        self.is_home_agent
    }

    #[must_use]
    pub fn probes_sent(&self) -> usize {
        self.probes_sent
    }

    #[must_use]
    pub fn reachability_expiry(&self) -> SimTime {
        self.reachability_expiry
    }

    #[must_use]
    pub fn router_expiry(&self) -> SimTime {
        self.router_expiry
    }

    /// Whether this entry is linked into the default router ring.
    #[must_use]
    pub fn is_default_router(&self) -> bool {
        self.ring.is_some()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queues a packet, returning the oldest one if the queue exceeds `limit`.
    ///
    /// Only INCOMPLETE entries hold packets. In any other state the
    /// packet is handed back.
    pub(crate) fn enqueue(&mut self, pkt: PendingPacket, limit: usize) -> Option<PendingPacket> {
        if self.state != NeighborState::Incomplete {
            return Some(pkt);
        }
        self.pending.push_back(pkt);
        if self.pending.len() > limit {
            self.pending.pop_front()
        } else {
            None
        }
    }

    pub(crate) fn take_pending(&mut self) -> VecDeque<PendingPacket> {
        std::mem::take(&mut self.pending)
    }
}

impl fmt::Display for NeighborEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}on {} ({:?})",
            self.mac,
            if self.is_router { "#router " } else { "" },
            if self.is_default_router() {
                "#default "
            } else {
                ""
            },
            self.key.ifid,
            self.state
        )
    }
}

#[derive(Debug, Default)]
pub struct NeighborCache {
    slots: Vec<Option<NeighborEntry>>,
    free: Vec<usize>,
    index: BTreeMap<NeighborKey, usize>,
    ring: DefaultRouterRing,
}

impl NeighborCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn lookup(&self, key: NeighborKey) -> Option<&NeighborEntry> {
        let slot = *self.index.get(&key)?;
        self.slots[slot].as_ref()
    }

    pub fn lookup_mut(&mut self, key: NeighborKey) -> Option<&mut NeighborEntry> {
        let slot = *self.index.get(&key)?;
        self.slots[slot].as_mut()
    }

    /// All entries, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &NeighborEntry> {
        self.index
            .values()
            .filter_map(|slot| self.slots[*slot].as_ref())
    }

    /// The keys of all entries on `ifid`.
    pub fn keys_on(&self, ifid: IfId) -> Vec<NeighborKey> {
        self.index
            .range(NeighborKey::new(Ipv6Addr::UNSPECIFIED, ifid)..)
            .take_while(|(key, _)| key.ifid == ifid)
            .map(|(key, _)| *key)
            .collect()
    }

    fn insert(&mut self, entry: NeighborEntry) -> Result<&mut NeighborEntry> {
        let key = entry.key;
        if self.index.contains_key(&key) {
            return Err(NdpError::NeighborExists {
                addr: key.addr,
                ifid: key.ifid,
            });
        }

        let slot = if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(entry);
            slot
        } else {
            self.slots.push(Some(entry));
            self.slots.len() - 1
        };
        self.index.insert(key, slot);
        tracing::trace!(IFACE = %key.ifid, "created neighbor entry {}", key.addr);

        self.slots[slot]
            .as_mut()
            .ok_or(NdpError::UnknownNeighbor {
                addr: key.addr,
                ifid: key.ifid,
            })
    }

    /// Creates an INCOMPLETE entry, awaiting address resolution.
    pub fn add_incomplete(&mut self, key: NeighborKey) -> Result<&mut NeighborEntry> {
        self.insert(NeighborEntry::new(
            key,
            MacAddress::NULL,
            NeighborState::Incomplete,
        ))
    }

    /// Creates a STALE entry with a known link-layer address.
    pub fn add_stale(&mut self, key: NeighborKey, mac: MacAddress) -> Result<&mut NeighborEntry> {
        self.insert(NeighborEntry::new(key, mac, NeighborState::Stale))
    }

    /// Creates a router entry and links it into the default router ring.
    ///
    /// Without a link-layer address the entry starts INCOMPLETE.
    pub fn add_router(
        &mut self,
        key: NeighborKey,
        mac: Option<MacAddress>,
        expiry: SimTime,
        is_home_agent: bool,
    ) -> Result<&mut NeighborEntry> {
        let mut entry = match mac {
            Some(mac) => NeighborEntry::new(key, mac, NeighborState::Stale),
            None => NeighborEntry::new(key, MacAddress::NULL, NeighborState::Incomplete),
        };
        entry.is_router = true;
        entry.is_home_agent = is_home_agent;
        entry.router_expiry = expiry;
        self.insert(entry)?;
        self.link_router(key);
        self.lookup_mut(key).ok_or(NdpError::UnknownNeighbor {
            addr: key.addr,
            ifid: key.ifid,
        })
    }

    /// Removes an entry, cancelling its timers and unlinking it from the
    /// default router ring.
    ///
    /// The returned entry still holds its pending packets.
    pub fn remove(&mut self, key: NeighborKey, timers: &mut TimerCtrl) -> Option<NeighborEntry> {
        timers.cancel(key.ar_timer());
        timers.cancel(key.nud_timer());
        self.unlink_router(key);

        let slot = self.index.remove(&key)?;
        let entry = self.slots[slot].take();
        self.free.push(slot);
        tracing::trace!(IFACE = %key.ifid, "removed neighbor entry {}", key.addr);
        entry
    }

    /// Forces every resolved entry on `ifid` into PROBE.
    ///
    /// INCOMPLETE entries are untouched. Returns the keys of the affected entries,
    /// which need a probe timer to be armed.
    pub fn invalidate_interface(&mut self, ifid: IfId) -> Vec<NeighborKey> {
        let mut probed = Vec::new();
        for key in self.keys_on(ifid) {
            let Some(entry) = self.lookup_mut(key) else {
                continue;
            };
            if entry.state == NeighborState::Incomplete {
                continue;
            }
            entry.state = NeighborState::Probe;
            entry.probes_sent = 0;
            probed.push(key);
        }
        probed
    }
}
