//! The Neighbor Discovery engine.
//!
//! One [`NeighborDiscovery`] value holds all protocol state of a node: the
//! neighbour cache with its default router ring, the duplicate address
//! detection, router discovery and router advertisement entries, and the
//! pending timers. Every entry point runs to completion. Nothing is sent
//! directly. Transmissions are queued as [`NdpOutput`] for the link layer.

use std::{collections::VecDeque, net::Ipv6Addr, time::Duration};

use des::time::SimTime;
use fxhash::{FxBuildHasher, FxHashMap};
use inet_types::{
    icmpv6::{IcmpV6DestinationUnreachableCode, NdpMessage, NDP_HOP_LIMIT},
    iface::MacAddress,
    ip::{Ipv6AddrExt, Ipv6Packet, Ipv6Prefix},
};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    error::{NdpError, Result},
    interface::{IfId, Interface, InterfaceTable},
    routing::RouteTable,
};

use self::{
    ndp::NeighborCache,
    state::{AdvertisingInterfaceEntry, DadEntry, InterfaceState, RouterDiscoveryEntry},
    timer::{TimerCtrl, TimerToken},
};

pub mod cfg;
mod dad;
mod icmp;
pub mod ndp;
mod nexthop;
mod nud;
mod resolution;
mod router;
pub mod state;
pub mod timer;

pub use self::cfg::*;
pub use self::ndp::{NeighborEntry, NeighborKey, NeighborState};
pub use self::resolution::Resolution;

/// A decoded Neighbor Discovery message with the IPv6 header fields
/// relevant for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdpPacket {
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    pub hop_limit: u8,
    pub msg: NdpMessage,
}

/// Something the engine wants the link layer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdpOutput {
    /// Send a Neighbor Discovery message.
    ///
    /// `link_dst` is `None` if the link-layer destination is unknown.
    Control {
        ifid: IfId,
        link_dst: Option<MacAddress>,
        pkt: NdpPacket,
    },
    /// Send a resolved datagram.
    Datagram {
        ifid: IfId,
        mac: MacAddress,
        pkt: Ipv6Packet,
    },
    /// Report a datagram as undeliverable to its originator.
    Unreachable {
        code: IcmpV6DestinationUnreachableCode,
        pkt: Ipv6Packet,
    },
}

pub struct NeighborDiscovery<I, R> {
    ifaces: I,
    routing: R,
    cfg: HostConfiguration,

    neighbors: NeighborCache,
    timers: TimerCtrl,

    iface_state: FxHashMap<IfId, InterfaceState>,
    router_cfg: FxHashMap<IfId, RouterInterfaceConfiguration>,
    dad: FxHashMap<(IfId, Ipv6Addr), DadEntry>,
    discovery: FxHashMap<IfId, RouterDiscoveryEntry>,
    advertising: FxHashMap<IfId, AdvertisingInterfaceEntry>,

    rng: StdRng,
    outputs: VecDeque<NdpOutput>,
}

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    pub fn new(ifaces: I, routing: R, cfg: HostConfiguration) -> Self {
        Self {
            ifaces,
            routing,
            rng: StdRng::seed_from_u64(cfg.seed),
            cfg,
            neighbors: NeighborCache::new(),
            timers: TimerCtrl::new(),
            iface_state: FxHashMap::with_hasher(FxBuildHasher::default()),
            router_cfg: FxHashMap::with_hasher(FxBuildHasher::default()),
            dad: FxHashMap::with_hasher(FxBuildHasher::default()),
            discovery: FxHashMap::with_hasher(FxBuildHasher::default()),
            advertising: FxHashMap::with_hasher(FxBuildHasher::default()),
            outputs: VecDeque::new(),
        }
    }

    pub fn ifaces(&self) -> &I {
        &self.ifaces
    }

    pub fn ifaces_mut(&mut self) -> &mut I {
        &mut self.ifaces
    }

    pub fn routing(&self) -> &R {
        &self.routing
    }

    pub fn routing_mut(&mut self) -> &mut R {
        &mut self.routing
    }

    pub fn cfg(&self) -> &HostConfiguration {
        &self.cfg
    }

    pub fn neighbors(&self) -> &NeighborCache {
        &self.neighbors
    }

    pub fn neighbor(&self, addr: Ipv6Addr, ifid: IfId) -> Option<&NeighborEntry> {
        self.neighbors.lookup(NeighborKey::new(addr, ifid))
    }

    pub fn interface_state(&self, ifid: IfId) -> Option<&InterfaceState> {
        self.iface_state.get(&ifid)
    }

    pub fn dad_entry(&self, addr: Ipv6Addr, ifid: IfId) -> Option<&DadEntry> {
        self.dad.get(&(ifid, addr))
    }

    pub fn router_discovery(&self, ifid: IfId) -> Option<&RouterDiscoveryEntry> {
        self.discovery.get(&ifid)
    }

    pub fn advertising_interface(&self, ifid: IfId) -> Option<&AdvertisingInterfaceEntry> {
        self.advertising.get(&ifid)
    }

    pub fn is_advertising(&self, ifid: IfId) -> bool {
        self.advertising.contains_key(&ifid)
    }

    /// Whether any timer of the engine is pending.
    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    /// The time the earliest pending timer expires.
    pub fn next_wakeup(&self) -> Option<SimTime> {
        self.timers.next()
    }

    pub fn pop_output(&mut self) -> Option<NdpOutput> {
        self.outputs.pop_front()
    }

    pub fn drain_outputs(&mut self) -> Vec<NdpOutput> {
        self.outputs.drain(..).collect()
    }

    /// Registers an interface of a host.
    ///
    /// Creates the interface variables, forms the link-local address if none is
    /// assigned and starts duplicate address detection for all tentative addresses.
    /// Router discovery starts once the link-local address becomes preferred.
    pub fn register_host_interface(&mut self, now: SimTime, ifid: IfId) -> Result<()> {
        let iface = self.iface(ifid)?;
        if iface.flags.loopback {
            tracing::trace!(IFACE = %ifid, "skipping loopback interface");
            return Ok(());
        }

        let mac = iface.mac;
        let link_local = iface.link_local().copied();
        let tentative = iface
            .addrs
            .iter()
            .filter(|addr| addr.is_tentative())
            .map(|addr| (addr.addr, addr.prefix_len))
            .collect::<Vec<_>>();

        let state = InterfaceState::new(&self.cfg, &mut self.rng);
        tracing::debug!(
            IFACE = %ifid,
            "registered interface with reachable time {:?}",
            state.reachable_time
        );
        self.iface_state.insert(ifid, state);

        // link-local destinations are always on-link
        self.routing.add_or_update_prefix(
            Ipv6Prefix::new(Ipv6Addr::LINK_LOCAL, 64),
            ifid,
            SimTime::MAX,
        );

        match link_local {
            None => self.assign_tentative(now, ifid, mac.embed_into(Ipv6Addr::LINK_LOCAL), 64)?,
            Some(addr) if addr.is_preferred() => self.address_preferred(now, ifid, addr.addr),
            Some(_) => {}
        }

        for (addr, prefix_len) in tentative {
            if !self.dad.contains_key(&(ifid, addr)) {
                self.assign_tentative(now, ifid, addr, prefix_len)?;
            }
        }
        Ok(())
    }

    /// Registers an interface with router parameters.
    ///
    /// If advertisements are enabled and the node is a router, the interface
    /// starts advertising once its link-local address is preferred. The advertised
    /// on-link prefixes are installed locally.
    pub fn register_router_interface(
        &mut self,
        now: SimTime,
        ifid: IfId,
        cfg: RouterInterfaceConfiguration,
    ) -> Result<()> {
        self.iface(ifid)?;

        for prefix in cfg.adv_prefix_list.iter().filter(|p| p.on_link) {
            self.routing
                .add_or_update_prefix(prefix.prefix, ifid, SimTime::MAX);
        }

        if cfg.adv_send_advertisements && self.routing.is_router() {
            self.advertising.insert(
                ifid,
                AdvertisingInterfaceEntry {
                    ifid,
                    advertisements_sent: 0,
                    next_advertisement: SimTime::MAX,
                },
            );
        }
        self.router_cfg.insert(ifid, cfg);
        self.register_host_interface(now, ifid)
    }

    /// Removes all state of an interface.
    ///
    /// Neighbour entries go first, then the duplicate address detection,
    /// router discovery and advertising entries. Queued packets are reported
    /// as unreachable. No timer of the interface survives.
    pub fn teardown_interface(&mut self, ifid: IfId) {
        for key in self.neighbors.keys_on(ifid) {
            self.remove_neighbor(key);
        }

        let dad = self
            .dad
            .keys()
            .filter(|(id, _)| *id == ifid)
            .copied()
            .collect::<Vec<_>>();
        for (ifid, addr) in dad {
            self.dad.remove(&(ifid, addr));
            self.timers
                .cancel(TimerToken::DuplicateAddressDetection { addr, ifid });
        }

        self.cancel_router_discovery(ifid);

        self.advertising.remove(&ifid);
        self.timers.cancel(TimerToken::PeriodicAdvertisement { ifid });
        self.timers.cancel(TimerToken::SolicitedAdvertisement { ifid });

        let stray = self.timers.cancel_interface(ifid);
        if stray > 0 {
            tracing::warn!(IFACE = %ifid, "cancelled {stray} unowned timers");
        }

        self.routing.remove_interface(ifid);
        self.iface_state.remove(&ifid);
        self.router_cfg.remove(&ifid);
        tracing::debug!(IFACE = %ifid, "interface torn down");
    }

    /// Tears down every interface known to the engine.
    pub fn shutdown(&mut self) {
        let mut ids = self
            .iface_state
            .keys()
            .copied()
            .chain(self.neighbors.iter().map(|entry| entry.key().ifid))
            .collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        for ifid in ids {
            self.teardown_interface(ifid);
        }
    }

    /// Processes all timers due at `now`.
    pub fn poll(&mut self, now: SimTime) {
        while let Some(token) = self.timers.pop_expired(now) {
            let result = match token {
                TimerToken::AddressResolution { target, ifid } => {
                    self.address_resolution_timeout(now, NeighborKey::new(target, ifid))
                }
                TimerToken::NeighborUnreachability { target, ifid } => {
                    self.nud_timeout(now, NeighborKey::new(target, ifid))
                }
                TimerToken::DuplicateAddressDetection { addr, ifid } => {
                    self.dad_timeout(now, addr, ifid)
                }
                TimerToken::RouterDiscoveryStart { ifid } => self.router_discovery_start(now, ifid),
                TimerToken::RouterDiscovery { ifid } => self.router_discovery_timeout(now, ifid),
                TimerToken::PeriodicAdvertisement { ifid }
                | TimerToken::SolicitedAdvertisement { ifid } => {
                    self.advertisement_timeout(now, ifid)
                }
            };
            if let Err(e) = result {
                tracing::warn!(IFACE = %token.ifid(), "timer {token:?} failed: {e}");
            }
        }
    }

    /// Logs the neighbour cache, default routers and interface variables.
    pub fn dump(&self) {
        tracing::info!("[ Neighbor cache ]");
        for entry in self.neighbors.iter() {
            tracing::info!("{} @ {entry}", entry.key().addr);
        }

        tracing::info!("[ Default routers ]");
        for key in self.neighbors.default_routers() {
            tracing::info!("{key}");
        }

        tracing::info!("[ Interfaces ]");
        let mut ids = self.iface_state.keys().copied().collect::<Vec<_>>();
        ids.sort();
        for ifid in ids {
            let Some(state) = self.iface_state.get(&ifid) else {
                continue;
            };
            tracing::info!(
                "{ifid} mtu {} hop limit {} reachable {:?} retrans {:?}{}",
                state.link_mtu,
                state.cur_hop_limit,
                state.reachable_time,
                state.retrans_timer,
                if self.is_advertising(ifid) {
                    " #advertising"
                } else {
                    ""
                }
            );
        }
    }

    /// Removes a neighbour entry as one step.
    ///
    /// Cancels its timers, unlinks it from the default router ring, drops its
    /// default route and every destination using it, and reports its queued
    /// packets as unreachable. Returns whether the entry existed.
    pub fn remove_neighbor(&mut self, key: NeighborKey) -> bool {
        let Some(mut entry) = self.neighbors.remove(key, &mut self.timers) else {
            return false;
        };

        if entry.is_router() {
            self.routing.remove_default_route(key.addr, key.ifid);
        }
        self.routing.purge_destinations_via(key.addr, key.ifid);

        for pending in entry.take_pending() {
            self.emit(NdpOutput::Unreachable {
                code: IcmpV6DestinationUnreachableCode::AddressUnreachable,
                pkt: pending.pkt,
            });
        }
        true
    }

    fn iface(&self, ifid: IfId) -> Result<&Interface> {
        self.ifaces
            .get(ifid)
            .ok_or(NdpError::UnknownInterface(ifid))
    }

    fn retrans_timer(&self, ifid: IfId) -> Duration {
        self.iface_state
            .get(&ifid)
            .map_or(self.cfg.retrans_timer, |state| state.retrans_timer)
    }

    fn reachable_time(&self, ifid: IfId) -> Duration {
        self.iface_state
            .get(&ifid)
            .map_or(self.cfg.base_reachable_time, |state| state.reachable_time)
    }

    fn emit(&mut self, output: NdpOutput) {
        self.outputs.push_back(output);
    }

    fn send_ndp(
        &mut self,
        ifid: IfId,
        link_dst: Option<MacAddress>,
        src: Ipv6Addr,
        dst: Ipv6Addr,
        msg: NdpMessage,
    ) {
        let link_dst = link_dst.or_else(|| {
            if dst.is_multicast() {
                Some(MacAddress::ipv6_multicast(dst))
            } else {
                None
            }
        });
        tracing::trace!(
            IFACE = %ifid,
            "sending {:?} ({} bytes) {src} -> {dst}",
            msg.typ(),
            msg.byte_len()
        );
        self.emit(NdpOutput::Control {
            ifid,
            link_dst,
            pkt: NdpPacket {
                src,
                dst,
                hop_limit: NDP_HOP_LIMIT,
                msg,
            },
        });
    }
}
