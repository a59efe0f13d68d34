use std::{net::Ipv6Addr, time::Duration};

use des::time::SimTime;
use rand::Rng;

use super::cfg::HostConfiguration;
use crate::interface::IfId;
use inet_types::icmpv6::{NDP_MAX_RANDOM_FACTOR, NDP_MIN_RANDOM_FACTOR};

/// Per interface variables of RFC 4861 §6.3.2.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceState {
    pub link_mtu: u32,
    pub max_link_mtu: u32,
    pub cur_hop_limit: u8,
    pub base_reachable_time: Duration,
    pub reachable_time: Duration,
    pub retrans_timer: Duration,
}

impl InterfaceState {
    pub(super) fn new(cfg: &HostConfiguration, rng: &mut impl Rng) -> Self {
        Self {
            link_mtu: 1500,
            max_link_mtu: 1500,
            cur_hop_limit: 64,
            base_reachable_time: cfg.base_reachable_time,
            reachable_time: random_reachable_time(cfg.base_reachable_time, rng),
            retrans_timer: cfg.retrans_timer,
        }
    }
}

/// A reachable time drawn uniformly from 0.5 to 1.5 times `base`.
pub(super) fn random_reachable_time(base: Duration, rng: &mut impl Rng) -> Duration {
    base.mul_f64(rng.gen_range(NDP_MIN_RANDOM_FACTOR..=NDP_MAX_RANDOM_FACTOR))
}

/// A duration drawn uniformly from `[min, max]`.
pub(super) fn uniform(min: Duration, max: Duration, rng: &mut impl Rng) -> Duration {
    if max <= min {
        return min;
    }
    Duration::from_secs_f64(rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
}

/// An address undergoing duplicate address detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DadEntry {
    pub ifid: IfId,
    pub addr: Ipv6Addr,
    pub solicitations_sent: usize,
}

/// Router discovery state of a non-advertising interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterDiscoveryEntry {
    pub ifid: IfId,
    pub solicitations_sent: usize,
}

/// Advertisement state of an advertising interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingInterfaceEntry {
    pub ifid: IfId,
    pub advertisements_sent: usize,
    pub next_advertisement: SimTime,
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn reachable_time_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let base = Duration::from_secs(30);
        for _ in 0..100 {
            let t = random_reachable_time(base, &mut rng);
            assert!(t >= Duration::from_secs(15) && t <= Duration::from_secs(45));
        }
    }

    #[test]
    fn uniform_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let d = Duration::from_secs(3);
        assert_eq!(uniform(d, d, &mut rng), d);
        assert_eq!(uniform(d, Duration::ZERO, &mut rng), d);
        let t = uniform(Duration::ZERO, d, &mut rng);
        assert!(t <= d);
    }
}
