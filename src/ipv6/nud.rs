use des::time::SimTime;
use inet_types::{
    icmpv6::{IcmpV6NDPOption, IcmpV6NeighborSolicitation, NdpMessage},
    iface::MacAddress,
};

use super::{
    ndp::{NeighborKey, NeighborState},
    NeighborDiscovery,
};
use crate::{
    error::Result,
    interface::{IfId, InterfaceTable},
    routing::RouteTable,
};

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Forces every resolved neighbour on `ifid` into PROBE, probing
    /// each one immediately.
    pub fn invalidate_interface(&mut self, now: SimTime, ifid: IfId) {
        let probed = self.neighbors.invalidate_interface(ifid);
        tracing::debug!(IFACE = %ifid, "probing {} neighbors", probed.len());
        for key in probed {
            self.timers.schedule(key.nud_timer(), now);
        }
    }

    /// Moves an entry into DELAY, giving upper layers a chance to confirm
    /// reachability before probing starts.
    pub(super) fn start_nud(&mut self, now: SimTime, key: NeighborKey) {
        let Some(entry) = self.neighbors.lookup_mut(key) else {
            return;
        };
        entry.state = NeighborState::Delay;
        entry.probes_sent = 0;
        self.timers
            .schedule(key.nud_timer(), now + self.cfg.delay_first_probe_time);
        tracing::trace!(IFACE = %key.ifid, "{} entered DELAY", key.addr);
    }

    pub(super) fn nud_timeout(&mut self, now: SimTime, key: NeighborKey) -> Result<()> {
        let max = self.cfg.max_unicast_solicit;
        let retrans = self.retrans_timer(key.ifid);
        let Some(entry) = self.neighbors.lookup_mut(key) else {
            return Ok(());
        };

        match entry.state {
            NeighborState::Delay => {
                entry.state = NeighborState::Probe;
                entry.probes_sent = 0;
                tracing::trace!(IFACE = %key.ifid, "{} entered PROBE", key.addr);
            }
            NeighborState::Probe => {}
            _ => return Ok(()),
        }

        if entry.probes_sent >= max {
            tracing::warn!(
                IFACE = %key.ifid,
                "neighbor {} unreachable after {} probes",
                key.addr,
                entry.probes_sent
            );
            self.remove_neighbor(key);
            return Ok(());
        }

        entry.probes_sent += 1;
        let mac = entry.mac;
        self.send_probe(key, mac)?;
        self.timers.schedule(key.nud_timer(), now + retrans);
        Ok(())
    }

    /// Unicasts a solicitation to the cached link-layer address.
    fn send_probe(&mut self, key: NeighborKey, mac: MacAddress) -> Result<()> {
        let iface = self.iface(key.ifid)?;
        let own = iface.mac;
        let Some(src) = iface.preferred_addr() else {
            tracing::warn!(IFACE = %key.ifid, "no usable source address to probe {}", key.addr);
            return Ok(());
        };

        self.send_ndp(
            key.ifid,
            Some(mac),
            src,
            key.addr,
            NdpMessage::NeighborSolicitation(IcmpV6NeighborSolicitation {
                target: key.addr,
                options: vec![IcmpV6NDPOption::SourceLinkLayerAddress(own)],
            }),
        );
        Ok(())
    }
}
