use std::{net::Ipv6Addr, time::Duration};

use des::time::SimTime;
use inet_types::{
    icmpv6::{
        IcmpV6MtuOption, IcmpV6NDPOption, IcmpV6RouterAdvertisement, IcmpV6RouterSolicitation,
        NdpMessage,
    },
    ip::Ipv6AddrExt,
};

use crate::{
    error::{NdpError, Result},
    interface::{IfId, InterfaceTable},
    ipv6::{ndp::NeighborKey, state::uniform, timer::TimerToken, NeighborDiscovery},
    routing::RouteTable,
};

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Sends a multicast advertisement and schedules the next one.
    ///
    /// The first advertisements use shorter intervals, so that hosts learn
    /// about a new router quickly.
    pub(crate) fn advertisement_timeout(&mut self, now: SimTime, ifid: IfId) -> Result<()> {
        if !self.advertising.contains_key(&ifid) {
            return Ok(());
        }
        let Some(cfg) = self.router_cfg.get(&ifid) else {
            return Ok(());
        };
        let (min, max) = (cfg.min_rtr_adv_interval, cfg.max_rtr_adv_interval);
        let (initial_interval, initial_count) = (
            cfg.max_initial_rtr_advert_interval,
            cfg.max_initial_rtr_advertisements,
        );

        self.timers
            .cancel(TimerToken::SolicitedAdvertisement { ifid });
        if !self.send_router_advertisement(ifid, Ipv6Addr::MULTICAST_ALL_NODES)? {
            // resumes once the link-local address is preferred again
            if let Some(entry) = self.advertising.get_mut(&ifid) {
                entry.next_advertisement = SimTime::MAX;
            }
            self.timers
                .cancel(TimerToken::PeriodicAdvertisement { ifid });
            return Ok(());
        }

        let mut interval = uniform(min, max, &mut self.rng);
        let Some(entry) = self.advertising.get_mut(&ifid) else {
            return Ok(());
        };
        entry.advertisements_sent += 1;
        if entry.advertisements_sent <= initial_count {
            interval = interval.min(initial_interval);
        }
        entry.next_advertisement = now + interval;

        self.timers
            .schedule(TimerToken::PeriodicAdvertisement { ifid }, now + interval);
        tracing::trace!(
            IFACE = %ifid,
            "advertisement #{} sent, next in {interval:?}",
            entry.advertisements_sent
        );
        Ok(())
    }

    /// Answers a router solicitation by moving the next multicast
    /// advertisement forward.
    pub(crate) fn recv_router_solicitation(
        &mut self,
        now: SimTime,
        ifid: IfId,
        src: Ipv6Addr,
        msg: &IcmpV6RouterSolicitation,
    ) -> Result<()> {
        if !self.advertising.contains_key(&ifid) {
            tracing::trace!(IFACE = %ifid, "ignoring solicitation on non-advertising interface");
            return Ok(());
        }

        let slla = msg.source_link_layer_address();
        if src.is_unspecified() {
            if slla.is_some() {
                tracing::warn!(
                    IFACE = %ifid,
                    "dropping solicitation from :: with link-layer address"
                );
                return Ok(());
            }
        } else if let Some(mac) = slla {
            self.update_link_layer_address(now, NeighborKey::new(src, ifid), mac)?;
        }

        let Some(cfg) = self.router_cfg.get(&ifid) else {
            return Ok(());
        };
        let delay = uniform(Duration::ZERO, cfg.max_ra_delay_time, &mut self.rng);
        let at = now + delay;

        let Some(entry) = self.advertising.get_mut(&ifid) else {
            return Ok(());
        };
        if entry.next_advertisement == SimTime::MAX {
            tracing::trace!(IFACE = %ifid, "not advertising yet, solicitation ignored");
            return Ok(());
        }
        if at < entry.next_advertisement {
            entry.next_advertisement = at;
            self.timers
                .schedule(TimerToken::SolicitedAdvertisement { ifid }, at);
            tracing::trace!(IFACE = %ifid, "solicited advertisement in {delay:?}");
        }
        Ok(())
    }

    /// Returns whether an advertisement was sent.
    fn send_router_advertisement(&mut self, ifid: IfId, dst: Ipv6Addr) -> Result<bool> {
        let cfg = self
            .router_cfg
            .get(&ifid)
            .ok_or(NdpError::UnknownInterface(ifid))?;
        let iface = self.iface(ifid)?;
        let Some(src) = iface.link_local().filter(|addr| addr.is_preferred()) else {
            tracing::warn!(IFACE = %ifid, "no usable link-local address, advertisement suppressed");
            return Ok(false);
        };
        let src = src.addr;

        let mut options = vec![IcmpV6NDPOption::SourceLinkLayerAddress(iface.mac)];
        if cfg.adv_link_mtu != 0 {
            options.push(IcmpV6NDPOption::Mtu(IcmpV6MtuOption {
                mtu: cfg.adv_link_mtu,
            }));
        }
        options.extend(
            cfg.adv_prefix_list
                .iter()
                .map(|prefix| IcmpV6NDPOption::PrefixInformation(prefix.to_prefix_information())),
        );

        let msg = IcmpV6RouterAdvertisement {
            current_hop_limit: cfg.adv_current_hop_limit,
            managed: cfg.adv_managed_flag,
            other_configuration: cfg.adv_other_config_flag,
            home_agent: cfg.adv_home_agent_flag,
            router_lifetime: u16::try_from(cfg.adv_default_lifetime.as_secs()).unwrap_or(u16::MAX),
            reachable_time: u32::try_from(cfg.adv_reachable_time.as_millis()).unwrap_or(u32::MAX),
            retransmit_time: u32::try_from(cfg.adv_retrans_time.as_millis()).unwrap_or(u32::MAX),
            options,
        };
        self.send_ndp(ifid, None, src, dst, NdpMessage::RouterAdvertisement(msg));
        Ok(true)
    }
}
