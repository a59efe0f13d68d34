use std::net::Ipv6Addr;

use des::time::SimTime;
use inet_types::{
    icmpv6::{
        IcmpV6DestinationUnreachableCode, IcmpV6NDPOption, IcmpV6NeighborSolicitation, NdpMessage,
    },
    iface::MacAddress,
    ip::{Ipv6AddrExt, Ipv6Packet},
};

use super::{
    ndp::{NeighborKey, NeighborState, PendingPacket},
    NdpOutput, NeighborDiscovery,
};
use crate::{
    error::{NdpError, Result},
    interface::{IfId, InterfaceTable},
    routing::RouteTable,
};

/// The outcome of resolving a neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The link-layer address is known.
    Resolved(MacAddress),
    /// Address resolution is in progress.
    Pending,
}

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Sends an IPv6 datagram.
    ///
    /// Multicast datagrams leave through the interface owning the source
    /// address, and so do unicast datagrams to link-local destinations.
    /// Unicast datagrams are sent to the resolved next hop, or queued while
    /// the next hop is being resolved. A datagram without a route is reported
    /// as unreachable.
    pub fn send_datagram(&mut self, now: SimTime, pkt: Ipv6Packet) -> Result<()> {
        let dst = pkt.dst;
        if dst.is_multicast() {
            match self.owner_of(pkt.src) {
                Some(ifid) => self.emit(NdpOutput::Datagram {
                    ifid,
                    mac: MacAddress::ipv6_multicast(dst),
                    pkt,
                }),
                None => {
                    tracing::warn!("no interface owns source {} of multicast to {dst}", pkt.src);
                    self.emit(NdpOutput::Unreachable {
                        code: IcmpV6DestinationUnreachableCode::NoRoute,
                        pkt,
                    });
                }
            }
            return Ok(());
        }

        let scope = if dst.is_link_local() {
            self.owner_of(pkt.src)
        } else {
            None
        };
        let hop = match (scope, self.routing.destination(dst, now)) {
            (Some(ifid), _) => Some((dst, ifid)),
            (None, Some(dest)) => Some((dest.next_hop, dest.ifid)),
            (None, None) => self.determine_next_hop(now, dst),
        };
        let Some((next_hop, ifid)) = hop else {
            tracing::warn!("no route to {dst}");
            self.emit(NdpOutput::Unreachable {
                code: IcmpV6DestinationUnreachableCode::NoRoute,
                pkt,
            });
            return Ok(());
        };

        let key = NeighborKey::new(next_hop, ifid);
        match self.resolve(now, key, Some(pkt.src))? {
            Resolution::Resolved(mac) => self.emit(NdpOutput::Datagram { ifid, mac, pkt }),
            Resolution::Pending => self.enqueue(now, key, pkt),
        }
        Ok(())
    }

    /// Resolves the link-layer address of `addr` on `ifid`, starting address
    /// resolution or unreachability detection as needed.
    pub fn resolve_neighbour(
        &mut self,
        now: SimTime,
        addr: Ipv6Addr,
        ifid: IfId,
    ) -> Result<Resolution> {
        self.resolve(now, NeighborKey::new(addr, ifid), None)
    }

    /// Upper-layer proof that a neighbour is reachable.
    pub fn reachability_confirmed(
        &mut self,
        now: SimTime,
        addr: Ipv6Addr,
        ifid: IfId,
    ) -> Result<()> {
        let key = NeighborKey::new(addr, ifid);
        let reachable_time = self.reachable_time(ifid);
        let Some(entry) = self.neighbors.lookup_mut(key) else {
            return Err(NdpError::UnknownNeighbor { addr, ifid });
        };
        if entry.state == NeighborState::Incomplete {
            tracing::trace!(IFACE = %ifid, "ignoring confirmation for unresolved {addr}");
            return Ok(());
        }

        entry.state = NeighborState::Reachable;
        entry.reachability_expiry = now + reachable_time;
        entry.probes_sent = 0;
        self.timers.cancel(key.nud_timer());
        tracing::trace!(IFACE = %ifid, "{addr} confirmed reachable");
        Ok(())
    }

    pub(super) fn resolve(
        &mut self,
        now: SimTime,
        key: NeighborKey,
        src_hint: Option<Ipv6Addr>,
    ) -> Result<Resolution> {
        let flags = self.iface(key.ifid)?.flags;

        let Some(entry) = self.neighbors.lookup(key) else {
            if flags.p2p || !flags.multicast {
                // no address resolution on this link
                self.neighbors.add_stale(key, MacAddress::NULL)?;
                self.start_nud(now, key);
                return Ok(Resolution::Resolved(MacAddress::NULL));
            }

            self.neighbors.add_incomplete(key)?;
            self.start_address_resolution(now, key, src_hint)?;
            return Ok(Resolution::Pending);
        };

        let (mac, state, expiry) = (entry.mac, entry.state, entry.reachability_expiry);
        match state {
            NeighborState::Incomplete => {
                if !self.timers.active(key.ar_timer()) {
                    self.start_address_resolution(now, key, src_hint)?;
                }
                Ok(Resolution::Pending)
            }
            NeighborState::Reachable if expiry > now => Ok(Resolution::Resolved(mac)),
            NeighborState::Reachable | NeighborState::Stale => {
                self.start_nud(now, key);
                Ok(Resolution::Resolved(mac))
            }
            NeighborState::Delay | NeighborState::Probe => Ok(Resolution::Resolved(mac)),
        }
    }

    fn start_address_resolution(
        &mut self,
        now: SimTime,
        key: NeighborKey,
        src_hint: Option<Ipv6Addr>,
    ) -> Result<()> {
        self.send_address_resolution(key, src_hint)?;
        if let Some(entry) = self.neighbors.lookup_mut(key) {
            entry.probes_sent = 1;
        }
        let retrans = self.retrans_timer(key.ifid);
        self.timers.schedule(key.ar_timer(), now + retrans);
        tracing::trace!(IFACE = %key.ifid, "started address resolution for {}", key.addr);
        Ok(())
    }

    pub(super) fn address_resolution_timeout(
        &mut self,
        now: SimTime,
        key: NeighborKey,
    ) -> Result<()> {
        let Some(entry) = self.neighbors.lookup(key) else {
            return Ok(());
        };
        if entry.state != NeighborState::Incomplete {
            return Ok(());
        }

        let sent = entry.probes_sent;
        if sent >= self.cfg.max_multicast_solicit {
            tracing::warn!(
                IFACE = %key.ifid,
                "address resolution for {} failed after {sent} solicitations",
                key.addr
            );
            self.remove_neighbor(key);
            return Ok(());
        }

        self.send_address_resolution(key, None)?;
        if let Some(entry) = self.neighbors.lookup_mut(key) {
            entry.probes_sent = sent + 1;
        }
        let retrans = self.retrans_timer(key.ifid);
        self.timers.schedule(key.ar_timer(), now + retrans);
        Ok(())
    }

    /// Multicasts a solicitation for `key` to its solicited-node address.
    ///
    /// Without a usable source address nothing is sent, but the caller still
    /// counts the attempt.
    fn send_address_resolution(
        &mut self,
        key: NeighborKey,
        src_hint: Option<Ipv6Addr>,
    ) -> Result<()> {
        let iface = self.iface(key.ifid)?;
        let mac = iface.mac;
        let src = src_hint
            .filter(|addr| iface.is_preferred(*addr))
            .or_else(|| iface.preferred_addr());
        let Some(src) = src else {
            tracing::warn!(
                IFACE = %key.ifid,
                "no usable source address to resolve {}",
                key.addr
            );
            return Ok(());
        };

        self.send_ndp(
            key.ifid,
            None,
            src,
            Ipv6Addr::solicited_node_multicast(key.addr),
            NdpMessage::NeighborSolicitation(IcmpV6NeighborSolicitation {
                target: key.addr,
                options: vec![IcmpV6NDPOption::SourceLinkLayerAddress(mac)],
            }),
        );
        Ok(())
    }

    /// The interface `addr` is assigned to.
    fn owner_of(&self, addr: Ipv6Addr) -> Option<IfId> {
        self.ifaces.ids().into_iter().find(|ifid| {
            self.ifaces
                .get(*ifid)
                .is_some_and(|iface| iface.has_addr(addr))
        })
    }

    fn enqueue(&mut self, now: SimTime, key: NeighborKey, pkt: Ipv6Packet) {
        let limit = self.cfg.max_pending_packets;
        let dropped = match self.neighbors.lookup_mut(key) {
            Some(entry) => entry.enqueue(PendingPacket { pkt, enqueued: now }, limit),
            None => Some(PendingPacket { pkt, enqueued: now }),
        };
        if let Some(dropped) = dropped {
            tracing::warn!(
                IFACE = %key.ifid,
                "pending queue for {} overflowed, dropping datagram to {}",
                key.addr,
                dropped.pkt.dst
            );
            self.emit(NdpOutput::Unreachable {
                code: IcmpV6DestinationUnreachableCode::AddressUnreachable,
                pkt: dropped.pkt,
            });
        }
    }

    /// Transmits all datagrams queued on a freshly resolved entry.
    pub(super) fn flush_pending(&mut self, now: SimTime, key: NeighborKey) {
        let Some(entry) = self.neighbors.lookup_mut(key) else {
            return;
        };
        let mac = entry.mac;
        let state = entry.state;
        let pending = entry.take_pending();
        if pending.is_empty() {
            return;
        }

        tracing::trace!(
            IFACE = %key.ifid,
            "sending {} queued datagrams to {}",
            pending.len(),
            key.addr
        );
        for pending in pending {
            self.emit(NdpOutput::Datagram {
                ifid: key.ifid,
                mac,
                pkt: pending.pkt,
            });
        }
        if state == NeighborState::Stale {
            self.start_nud(now, key);
        }
    }
}
