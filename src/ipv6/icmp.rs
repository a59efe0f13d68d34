//! Processing of inbound Neighbor Discovery messages.

use std::{net::Ipv6Addr, time::Duration};

use des::time::SimTime;
use inet_types::{
    icmpv6::{
        IcmpV6NDPOption, IcmpV6NeighborAdvertisement, IcmpV6NeighborSolicitation,
        IcmpV6PrefixInformation, IcmpV6RouterAdvertisement, NdpMessage, IPV6_MIN_MTU,
        NDP_HOP_LIMIT, NDP_INFINITE_LIFETIME,
    },
    iface::MacAddress,
    ip::{Ipv6AddrExt, Ipv6Prefix},
};

use super::{
    ndp::{NeighborEntry, NeighborKey, NeighborState},
    state::random_reachable_time,
    NdpPacket, NeighborDiscovery,
};
use crate::{
    error::Result,
    interface::{AddrState, IfId, InterfaceTable},
    routing::RouteTable,
};

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Processes a Neighbor Discovery message received on `ifid`.
    ///
    /// Invalid messages are dropped. A message proving that a tentative
    /// address is already in use fails with
    /// [`NdpError::DuplicateAddress`](crate::error::NdpError::DuplicateAddress).
    pub fn recv(&mut self, now: SimTime, ifid: IfId, pkt: NdpPacket) -> Result<()> {
        self.iface(ifid)?;
        if pkt.hop_limit != NDP_HOP_LIMIT {
            tracing::warn!(
                IFACE = %ifid,
                "dropping {:?} from {} with hop limit {}",
                pkt.msg.typ(),
                pkt.src,
                pkt.hop_limit
            );
            return Ok(());
        }

        tracing::trace!(
            IFACE = %ifid,
            "received {:?} {} -> {} with options {:?}",
            pkt.msg.typ(),
            pkt.src,
            pkt.dst,
            pkt.msg
                .options()
                .iter()
                .map(IcmpV6NDPOption::typ)
                .collect::<Vec<_>>()
        );
        match pkt.msg {
            NdpMessage::RouterSolicitation(msg) => {
                self.recv_router_solicitation(now, ifid, pkt.src, &msg)
            }
            NdpMessage::RouterAdvertisement(msg) => {
                self.recv_router_advertisement(now, ifid, pkt.src, &msg)
            }
            NdpMessage::NeighborSolicitation(msg) => {
                self.recv_neighbor_solicitation(now, ifid, pkt.src, pkt.dst, &msg)
            }
            NdpMessage::NeighborAdvertisement(msg) => {
                self.recv_neighbor_advertisement(now, ifid, pkt.dst, &msg)
            }
            NdpMessage::Redirect(msg) => {
                tracing::trace!(
                    IFACE = %ifid,
                    "ignoring redirect of {} to {}",
                    msg.destination,
                    msg.target
                );
                Ok(())
            }
        }
    }

    /// Records a link-layer address learned from a source link-layer
    /// address option.
    ///
    /// Unknown senders become STALE entries. INCOMPLETE entries become STALE
    /// and release their queued packets. A changed address moves the entry to STALE.
    pub(crate) fn update_link_layer_address(
        &mut self,
        now: SimTime,
        key: NeighborKey,
        mac: MacAddress,
    ) -> Result<()> {
        let Some(entry) = self.neighbors.lookup_mut(key) else {
            self.neighbors.add_stale(key, mac)?;
            return Ok(());
        };

        match entry.state {
            NeighborState::Incomplete => {
                entry.mac = mac;
                entry.state = NeighborState::Stale;
                entry.probes_sent = 0;
                self.timers.cancel(key.ar_timer());
                self.flush_pending(now, key);
            }
            _ if entry.mac != mac => {
                tracing::debug!(
                    IFACE = %key.ifid,
                    "{} moved from {} to {mac}",
                    key.addr,
                    entry.mac
                );
                entry.mac = mac;
                entry.state = NeighborState::Stale;
                entry.probes_sent = 0;
                self.timers.cancel(key.nud_timer());
            }
            _ => {}
        }
        Ok(())
    }

    fn recv_neighbor_solicitation(
        &mut self,
        now: SimTime,
        ifid: IfId,
        src: Ipv6Addr,
        dst: Ipv6Addr,
        msg: &IcmpV6NeighborSolicitation,
    ) -> Result<()> {
        if msg.target.is_multicast() {
            tracing::warn!(IFACE = %ifid, "dropping solicitation for multicast {}", msg.target);
            return Ok(());
        }

        let slla = msg.source_link_layer_address();
        if src.is_unspecified() && (!dst.is_solicited_node_multicast() || slla.is_some()) {
            tracing::warn!(IFACE = %ifid, "dropping malformed solicitation from ::");
            return Ok(());
        }

        let iface = self.iface(ifid)?;
        let Some(target) = iface.addr(msg.target).copied() else {
            tracing::trace!(IFACE = %ifid, "ignoring solicitation for foreign {}", msg.target);
            return Ok(());
        };
        let own = iface.mac;

        match target.state {
            AddrState::Tentative if src.is_unspecified() => {
                Err(self.duplicate_address(ifid, msg.target))
            }
            AddrState::Tentative | AddrState::Duplicated => {
                tracing::trace!(IFACE = %ifid, "ignoring solicitation for unusable {}", msg.target);
                Ok(())
            }
            AddrState::Preferred => {
                let (dst, solicited, link_dst) = if src.is_unspecified() {
                    (Ipv6Addr::MULTICAST_ALL_NODES, false, None)
                } else {
                    let key = NeighborKey::new(src, ifid);
                    if let Some(mac) = slla {
                        self.update_link_layer_address(now, key, mac)?;
                    }
                    let link_dst = slla
                        .or_else(|| self.neighbors.lookup(key).map(NeighborEntry::mac))
                        .filter(|mac| !mac.is_unspecified());
                    (src, true, link_dst)
                };

                let adv = IcmpV6NeighborAdvertisement {
                    target: msg.target,
                    router: self.routing.is_router(),
                    solicited,
                    override_flag: true,
                    options: vec![IcmpV6NDPOption::TargetLinkLayerAddress(own)],
                };
                self.send_ndp(
                    ifid,
                    link_dst,
                    msg.target,
                    dst,
                    NdpMessage::NeighborAdvertisement(adv),
                );
                Ok(())
            }
        }
    }

    fn recv_neighbor_advertisement(
        &mut self,
        now: SimTime,
        ifid: IfId,
        dst: Ipv6Addr,
        msg: &IcmpV6NeighborAdvertisement,
    ) -> Result<()> {
        if msg.target.is_multicast() {
            tracing::warn!(IFACE = %ifid, "dropping advertisement for multicast {}", msg.target);
            return Ok(());
        }
        if dst.is_multicast() && msg.solicited {
            tracing::warn!(IFACE = %ifid, "dropping solicited advertisement sent to {dst}");
            return Ok(());
        }

        let iface = self.iface(ifid)?;
        if iface.is_tentative(msg.target) {
            return Err(self.duplicate_address(ifid, msg.target));
        }

        let key = NeighborKey::new(msg.target, ifid);
        let tlla = msg.target_link_layer_address();
        let reachable_time = self.reachable_time(ifid);
        let Some(entry) = self.neighbors.lookup_mut(key) else {
            tracing::trace!(IFACE = %ifid, "ignoring advertisement for unknown {}", msg.target);
            return Ok(());
        };
        let was_router = entry.is_router;

        if entry.state == NeighborState::Incomplete {
            let Some(tlla) = tlla else {
                tracing::trace!(IFACE = %ifid, "ignoring advertisement without link-layer address");
                return Ok(());
            };

            entry.mac = tlla;
            entry.is_router = msg.router;
            entry.probes_sent = 0;
            if msg.solicited {
                entry.state = NeighborState::Reachable;
                entry.reachability_expiry = now + reachable_time;
            } else {
                entry.state = NeighborState::Stale;
            }
            tracing::trace!(IFACE = %ifid, "resolved {} to {tlla} ({:?})", msg.target, entry.state);

            self.timers.cancel(key.ar_timer());
            self.flush_pending(now, key);
        } else {
            let changed = tlla.is_some_and(|mac| mac != entry.mac);
            if !msg.override_flag && changed {
                if entry.state == NeighborState::Reachable {
                    entry.state = NeighborState::Stale;
                    self.timers.cancel(key.nud_timer());
                }
                return Ok(());
            }

            if let Some(tlla) = tlla {
                entry.mac = tlla;
            }
            if msg.solicited {
                entry.state = NeighborState::Reachable;
                entry.reachability_expiry = now + reachable_time;
                entry.probes_sent = 0;
                self.timers.cancel(key.nud_timer());
            } else if changed {
                entry.state = NeighborState::Stale;
                entry.probes_sent = 0;
                self.timers.cancel(key.nud_timer());
            }
            entry.is_router = msg.router;
        }

        if was_router && !msg.router {
            self.router_became_host(key);
        }
        Ok(())
    }

    /// Stops using a neighbour as default router once it advertises itself
    /// as a host.
    fn router_became_host(&mut self, key: NeighborKey) {
        tracing::debug!(IFACE = %key.ifid, "{} is no longer a router", key.addr);
        self.neighbors.unlink_router(key);
        self.routing.remove_default_route(key.addr, key.ifid);
        self.routing.purge_destinations_via(key.addr, key.ifid);
    }

    fn recv_router_advertisement(
        &mut self,
        now: SimTime,
        ifid: IfId,
        src: Ipv6Addr,
        msg: &IcmpV6RouterAdvertisement,
    ) -> Result<()> {
        if self.advertising.contains_key(&ifid) {
            tracing::trace!(IFACE = %ifid, "ignoring advertisement on advertising interface");
            return Ok(());
        }
        if !src.is_link_local() {
            tracing::warn!(IFACE = %ifid, "dropping advertisement from non link-local {src}");
            return Ok(());
        }

        self.cancel_router_discovery(ifid);
        self.update_router(now, ifid, src, msg)?;
        self.update_interface_variables(ifid, msg);
        for info in msg.prefixes() {
            self.update_prefix(now, ifid, info)?;
        }
        Ok(())
    }

    fn update_router(
        &mut self,
        now: SimTime,
        ifid: IfId,
        src: Ipv6Addr,
        msg: &IcmpV6RouterAdvertisement,
    ) -> Result<()> {
        let key = NeighborKey::new(src, ifid);
        let lifetime = Duration::from_secs(msg.router_lifetime.into());
        let slla = msg.source_link_layer_address();

        if self.neighbors.lookup(key).is_none() {
            if !lifetime.is_zero() {
                self.neighbors
                    .add_router(key, slla, now + lifetime, msg.home_agent)?;
                self.routing.add_default_route(src, ifid, now + lifetime);
                tracing::debug!(IFACE = %ifid, "new default router {src} for {lifetime:?}");
            } else if let Some(mac) = slla {
                let entry = self.neighbors.add_stale(key, mac)?;
                entry.is_router = true;
                entry.is_home_agent = msg.home_agent;
            }
            return Ok(());
        }

        if let Some(mac) = slla {
            self.update_link_layer_address(now, key, mac)?;
        }

        if lifetime.is_zero() {
            if self
                .neighbors
                .lookup(key)
                .is_some_and(NeighborEntry::is_default_router)
            {
                tracing::debug!(IFACE = %ifid, "{src} withdrew as default router");
                self.remove_neighbor(key);
            } else if let Some(entry) = self.neighbors.lookup_mut(key) {
                entry.is_router = true;
                entry.is_home_agent = msg.home_agent;
            }
            return Ok(());
        }

        if let Some(entry) = self.neighbors.lookup_mut(key) {
            entry.is_router = true;
            entry.is_home_agent = msg.home_agent;
            entry.router_expiry = now + lifetime;
        }
        if self.neighbors.link_router(key) {
            tracing::debug!(IFACE = %ifid, "{src} became a default router");
        }
        self.routing.add_default_route(src, ifid, now + lifetime);
        Ok(())
    }

    fn update_interface_variables(&mut self, ifid: IfId, msg: &IcmpV6RouterAdvertisement) {
        let Some(state) = self.iface_state.get_mut(&ifid) else {
            return;
        };

        if msg.current_hop_limit != 0 {
            state.cur_hop_limit = msg.current_hop_limit;
        }

        if msg.reachable_time != 0 {
            let base = Duration::from_millis(msg.reachable_time.into());
            if base != state.base_reachable_time {
                state.base_reachable_time = base;
                state.reachable_time = random_reachable_time(base, &mut self.rng);
                tracing::trace!(IFACE = %ifid, "reachable time is now {:?}", state.reachable_time);
            }
        }

        if msg.retransmit_time != 0 {
            state.retrans_timer = Duration::from_millis(msg.retransmit_time.into());
        }

        if let Some(mtu) = msg.mtu() {
            if (IPV6_MIN_MTU..=state.max_link_mtu).contains(&mtu) {
                state.link_mtu = mtu;
            } else {
                tracing::warn!(IFACE = %ifid, "ignoring advertised mtu {mtu}");
            }
        }
    }

    fn update_prefix(
        &mut self,
        now: SimTime,
        ifid: IfId,
        info: &IcmpV6PrefixInformation,
    ) -> Result<()> {
        let Some(prefix) = info.prefix() else {
            tracing::warn!(IFACE = %ifid, "ignoring prefix with length {}", info.prefix_len);
            return Ok(());
        };
        if prefix.addr().is_link_local() {
            return Ok(());
        }

        if info.on_link {
            if info.valid_lifetime == 0 {
                if self.routing.has_prefix(prefix, ifid) {
                    tracing::debug!(IFACE = %ifid, "prefix {prefix} timed out");
                    self.routing.remove_prefix(prefix, ifid);
                }
            } else {
                self.routing
                    .add_or_update_prefix(prefix, ifid, deadline(now, info.valid_lifetime));
            }
        }

        if info.autonomous_address_configuration {
            self.autoconfigure(now, ifid, prefix, info)?;
        }
        Ok(())
    }

    /// Forms an address within an advertised prefix.
    fn autoconfigure(
        &mut self,
        now: SimTime,
        ifid: IfId,
        prefix: Ipv6Prefix,
        info: &IcmpV6PrefixInformation,
    ) -> Result<()> {
        if info.valid_lifetime == 0
            || info.preferred_lifetime > info.valid_lifetime
            || prefix.len() != 64
        {
            return Ok(());
        }

        let iface = self.iface(ifid)?;
        if iface.has_addr_in(prefix) {
            return Ok(());
        }
        let addr = iface.mac.embed_into(prefix.addr());
        tracing::debug!(IFACE = %ifid, "autoconfigured {addr} from {prefix}");
        self.assign_tentative(now, ifid, addr, prefix.len())
    }
}

fn deadline(now: SimTime, lifetime: u32) -> SimTime {
    if lifetime == NDP_INFINITE_LIFETIME {
        SimTime::MAX
    } else {
        now + Duration::from_secs(lifetime.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_lifetime_never_expires() {
        assert_eq!(deadline(SimTime::ZERO, NDP_INFINITE_LIFETIME), SimTime::MAX);
        assert_eq!(
            deadline(SimTime::ZERO, 30),
            SimTime::ZERO + Duration::from_secs(30)
        );
    }
}
