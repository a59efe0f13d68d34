use std::{net::Ipv6Addr, time::Duration};

use des::time::SimTime;
use inet_types::{
    icmpv6::{IcmpV6NDPOption, IcmpV6RouterSolicitation, NdpMessage},
    ip::Ipv6AddrExt,
};

use crate::{
    error::Result,
    interface::{IfId, InterfaceTable},
    ipv6::{
        state::{uniform, RouterDiscoveryEntry},
        timer::TimerToken,
        NeighborDiscovery,
    },
    routing::RouteTable,
};

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Starts router discovery after a random delay, unless the interface
    /// advertises itself or discovery already runs.
    pub(crate) fn schedule_router_discovery(&mut self, now: SimTime, ifid: IfId) {
        if self.advertising.contains_key(&ifid) || self.discovery.contains_key(&ifid) {
            return;
        }

        let delay = uniform(
            Duration::ZERO,
            self.cfg.max_rtr_solicitation_delay,
            &mut self.rng,
        );
        self.discovery.insert(
            ifid,
            RouterDiscoveryEntry {
                ifid,
                solicitations_sent: 0,
            },
        );
        self.timers
            .schedule(TimerToken::RouterDiscoveryStart { ifid }, now + delay);
        tracing::trace!(IFACE = %ifid, "router discovery starts in {delay:?}");
    }

    pub(crate) fn router_discovery_start(&mut self, now: SimTime, ifid: IfId) -> Result<()> {
        if !self.discovery.contains_key(&ifid) {
            return Ok(());
        }
        self.send_router_solicitation(now, ifid)
    }

    pub(crate) fn router_discovery_timeout(&mut self, now: SimTime, ifid: IfId) -> Result<()> {
        let Some(entry) = self.discovery.get(&ifid) else {
            return Ok(());
        };
        if entry.solicitations_sent < self.cfg.max_rtr_solicitations {
            return self.send_router_solicitation(now, ifid);
        }

        self.discovery.remove(&ifid);
        tracing::debug!(IFACE = %ifid, "router discovery finished without advertisement");
        Ok(())
    }

    /// Stops router discovery, once an advertisement arrived.
    pub(crate) fn cancel_router_discovery(&mut self, ifid: IfId) {
        if self.discovery.remove(&ifid).is_some() {
            tracing::trace!(IFACE = %ifid, "router discovery complete");
        }
        self.timers.cancel(TimerToken::RouterDiscoveryStart { ifid });
        self.timers.cancel(TimerToken::RouterDiscovery { ifid });
    }

    fn send_router_solicitation(&mut self, now: SimTime, ifid: IfId) -> Result<()> {
        let iface = self.iface(ifid)?;
        let (src, options) = match iface.preferred_addr() {
            Some(src) => (src, vec![IcmpV6NDPOption::SourceLinkLayerAddress(iface.mac)]),
            // an unspecified source must not carry a link-layer address
            None => (Ipv6Addr::UNSPECIFIED, Vec::new()),
        };

        let max = self.cfg.max_rtr_solicitations;
        let Some(entry) = self.discovery.get_mut(&ifid) else {
            return Ok(());
        };
        entry.solicitations_sent += 1;
        let sent = entry.solicitations_sent;

        self.send_ndp(
            ifid,
            None,
            src,
            Ipv6Addr::MULTICAST_ALL_ROUTERS,
            NdpMessage::RouterSolicitation(IcmpV6RouterSolicitation { options }),
        );

        let delay = if sent >= max {
            self.cfg.max_rtr_solicitation_delay
        } else {
            self.cfg.rtr_solicitation_interval
        };
        self.timers
            .schedule(TimerToken::RouterDiscovery { ifid }, now + delay);
        Ok(())
    }
}
