use std::time::Duration;

use inet_types::{icmpv6::*, ip::Ipv6Prefix};

/// Node wide Neighbor Discovery parameters (RFC 4861 §10, RFC 4862 §5.1).
#[derive(Debug, Clone)]
pub struct HostConfiguration {
    // The number of solicitations needed to confirm the uniqueness of an address
    pub dup_addr_detect_transmits: usize,
    pub max_multicast_solicit: usize,
    pub max_unicast_solicit: usize,
    pub base_reachable_time: Duration,
    pub retrans_timer: Duration,
    pub delay_first_probe_time: Duration,

    pub max_rtr_solicitations: usize,
    pub rtr_solicitation_interval: Duration,
    pub max_rtr_solicitation_delay: Duration,

    /// Upper bound of packets queued per unresolved neighbour.
    pub max_pending_packets: usize,
    /// Seed for all randomized intervals.
    pub seed: u64,
}

impl Default for HostConfiguration {
    fn default() -> Self {
        Self {
            dup_addr_detect_transmits: 1,
            max_multicast_solicit: NDP_MAX_MULTICAST_SOLICIT,
            max_unicast_solicit: NDP_MAX_UNICAST_SOLICIT,
            base_reachable_time: NDP_REACHABLE_TIME,
            retrans_timer: NDP_RETRANS_TIMER,
            delay_first_probe_time: NDP_DELAY_FIRST_PROBE_TIME,
            max_rtr_solicitations: NDP_MAX_RTR_SOLICITATIONS,
            rtr_solicitation_interval: NDP_RTR_SOLICITATION_INTERVAL,
            max_rtr_solicitation_delay: NDP_MAX_RTR_SOLICITATION_DELAY,
            max_pending_packets: 16,
            seed: 0,
        }
    }
}

/// Router side parameters of an advertising interface (RFC 4861 §6.2.1).
#[derive(Debug, Clone)]
pub struct RouterInterfaceConfiguration {
    pub adv_send_advertisements: bool,
    pub min_rtr_adv_interval: Duration,
    pub max_rtr_adv_interval: Duration,
    pub max_initial_rtr_advert_interval: Duration,
    pub max_initial_rtr_advertisements: usize,
    pub max_ra_delay_time: Duration,

    pub adv_managed_flag: bool,
    pub adv_other_config_flag: bool,
    pub adv_home_agent_flag: bool,
    pub adv_link_mtu: u32, // 0 means not advertised
    pub adv_reachable_time: Duration,
    pub adv_retrans_time: Duration,
    pub adv_current_hop_limit: u8,
    pub adv_default_lifetime: Duration,
    pub adv_prefix_list: Vec<RouterPrefix>,
}

impl Default for RouterInterfaceConfiguration {
    fn default() -> Self {
        let max_rtr_adv_interval = Duration::from_secs(600);
        Self {
            adv_send_advertisements: true,
            min_rtr_adv_interval: max_rtr_adv_interval.mul_f64(0.33),
            max_rtr_adv_interval,
            max_initial_rtr_advert_interval: NDP_MAX_INITIAL_RTR_ADVERT_INTERVAL,
            max_initial_rtr_advertisements: NDP_MAX_INITIAL_RTR_ADVERTISEMENTS,
            max_ra_delay_time: NDP_MAX_RA_DELAY_TIME,
            adv_managed_flag: false,
            adv_other_config_flag: false,
            adv_home_agent_flag: false,
            adv_link_mtu: 0,
            adv_reachable_time: Duration::ZERO,
            adv_retrans_time: Duration::ZERO,
            adv_current_hop_limit: 64,
            adv_default_lifetime: max_rtr_adv_interval * 3,
            adv_prefix_list: Vec::new(),
        }
    }
}

/// A prefix announced in router advertisements.
#[derive(Debug, Clone)]
pub struct RouterPrefix {
    pub prefix: Ipv6Prefix,
    pub on_link: bool,
    pub autonomous: bool,
    pub valid_lifetime: Duration,
    pub preferred_lifetime: Duration,
}

impl RouterPrefix {
    /// An on-link prefix usable for autoconfiguration with infinite lifetimes.
    #[must_use]
    pub fn new(prefix: Ipv6Prefix) -> Self {
        Self {
            prefix,
            on_link: true,
            autonomous: true,
            valid_lifetime: Duration::MAX,
            preferred_lifetime: Duration::MAX,
        }
    }

    pub(super) fn to_prefix_information(&self) -> IcmpV6PrefixInformation {
        IcmpV6PrefixInformation {
            prefix_len: self.prefix.len(),
            on_link: self.on_link,
            autonomous_address_configuration: self.autonomous,
            valid_lifetime: lifetime_secs(self.valid_lifetime),
            preferred_lifetime: lifetime_secs(self.preferred_lifetime),
            prefix: self.prefix.addr(),
        }
    }
}

fn lifetime_secs(lifetime: Duration) -> u32 {
    u32::try_from(lifetime.as_secs()).unwrap_or(NDP_INFINITE_LIFETIME)
}
