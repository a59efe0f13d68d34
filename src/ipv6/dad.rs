use std::net::Ipv6Addr;

use des::time::SimTime;
use inet_types::{
    icmpv6::{IcmpV6NeighborSolicitation, NdpMessage},
    ip::Ipv6AddrExt,
};

use super::{state::DadEntry, timer::TimerToken, NeighborDiscovery};
use crate::{
    error::{NdpError, Result},
    interface::{AddrState, IfId, InterfaceAddr, InterfaceTable},
    routing::RouteTable,
};

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Assigns `addr` to an interface and runs duplicate address detection on it.
    ///
    /// The address stays tentative until enough solicitations went unanswered.
    /// With detection disabled the address is preferred immediately.
    pub fn assign_tentative(
        &mut self,
        now: SimTime,
        ifid: IfId,
        addr: Ipv6Addr,
        prefix_len: u8,
    ) -> Result<()> {
        let transmits = self.cfg.dup_addr_detect_transmits;
        let iface = self
            .ifaces
            .get_mut(ifid)
            .ok_or(NdpError::UnknownInterface(ifid))?;

        if transmits == 0 {
            iface.assign(InterfaceAddr::preferred(addr, prefix_len));
            tracing::debug!(IFACE = %ifid, "assigned {addr} without duplicate address detection");
            self.address_preferred(now, ifid, addr);
            return Ok(());
        }

        iface.assign(InterfaceAddr::tentative(addr, prefix_len));
        tracing::debug!(IFACE = %ifid, "assigned tentative {addr}");
        self.dad.insert(
            (ifid, addr),
            DadEntry {
                ifid,
                addr,
                solicitations_sent: 0,
            },
        );
        self.send_dad_solicitation(now, ifid, addr);
        Ok(())
    }

    fn send_dad_solicitation(&mut self, now: SimTime, ifid: IfId, addr: Ipv6Addr) {
        let retrans = self.retrans_timer(ifid);
        let Some(entry) = self.dad.get_mut(&(ifid, addr)) else {
            return;
        };
        entry.solicitations_sent += 1;

        self.send_ndp(
            ifid,
            None,
            Ipv6Addr::UNSPECIFIED,
            Ipv6Addr::solicited_node_multicast(addr),
            NdpMessage::NeighborSolicitation(IcmpV6NeighborSolicitation {
                target: addr,
                options: Vec::new(),
            }),
        );
        self.timers
            .schedule(TimerToken::DuplicateAddressDetection { addr, ifid }, now + retrans);
    }

    pub(super) fn dad_timeout(&mut self, now: SimTime, addr: Ipv6Addr, ifid: IfId) -> Result<()> {
        let Some(entry) = self.dad.get(&(ifid, addr)) else {
            return Ok(());
        };
        if entry.solicitations_sent < self.cfg.dup_addr_detect_transmits {
            self.send_dad_solicitation(now, ifid, addr);
            return Ok(());
        }

        self.dad.remove(&(ifid, addr));
        let iface = self
            .ifaces
            .get_mut(ifid)
            .ok_or(NdpError::UnknownInterface(ifid))?;
        if !iface.set_state(addr, AddrState::Preferred) {
            return Ok(());
        }
        tracing::debug!(IFACE = %ifid, "address {addr} is now preferred");
        self.address_preferred(now, ifid, addr);
        Ok(())
    }

    /// Disables a tentative address that another node already uses.
    pub(super) fn duplicate_address(&mut self, ifid: IfId, addr: Ipv6Addr) -> NdpError {
        self.dad.remove(&(ifid, addr));
        self.timers
            .cancel(TimerToken::DuplicateAddressDetection { addr, ifid });
        if let Some(iface) = self.ifaces.get_mut(ifid) {
            iface.set_state(addr, AddrState::Duplicated);
        }
        tracing::error!(IFACE = %ifid, "duplicate address {addr} detected, address disabled");
        NdpError::DuplicateAddress { addr, ifid }
    }

    /// Hooks run once an address becomes usable.
    ///
    /// A preferred link-local address starts advertising on advertising
    /// interfaces and router discovery on all others.
    pub(super) fn address_preferred(&mut self, now: SimTime, ifid: IfId, addr: Ipv6Addr) {
        if !addr.is_link_local() {
            return;
        }

        if let Some(entry) = self.advertising.get_mut(&ifid) {
            entry.next_advertisement = now;
            self.timers
                .schedule(TimerToken::PeriodicAdvertisement { ifid }, now);
        } else {
            self.schedule_router_discovery(now, ifid);
        }
    }
}
