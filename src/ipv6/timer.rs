use std::net::Ipv6Addr;

use des::time::SimTime;

use crate::interface::IfId;

/// Identifies a timer by the state it belongs to and its purpose.
///
/// Tokens carry keys, never references. When a token fires, its handler looks
/// the state up again and does nothing if it is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerToken {
    AddressResolution { target: Ipv6Addr, ifid: IfId },
    NeighborUnreachability { target: Ipv6Addr, ifid: IfId },
    DuplicateAddressDetection { addr: Ipv6Addr, ifid: IfId },
    RouterDiscoveryStart { ifid: IfId },
    RouterDiscovery { ifid: IfId },
    PeriodicAdvertisement { ifid: IfId },
    SolicitedAdvertisement { ifid: IfId },
}

impl TimerToken {
    pub fn ifid(&self) -> IfId {
        match *self {
            Self::AddressResolution { ifid, .. }
            | Self::NeighborUnreachability { ifid, .. }
            | Self::DuplicateAddressDetection { ifid, .. }
            | Self::RouterDiscoveryStart { ifid }
            | Self::RouterDiscovery { ifid }
            | Self::PeriodicAdvertisement { ifid }
            | Self::SolicitedAdvertisement { ifid } => ifid,
        }
    }
}

/// Pending timers, ordered by deadline.
///
/// At most one timer per token exists. Timers with equal deadlines fire in
/// the order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerCtrl {
    timers: Vec<(TimerToken, SimTime)>,
}

impl TimerCtrl {
    pub fn new() -> Self {
        Self { timers: Vec::new() }
    }

    /// Schedules `token` at `deadline`, replacing a pending timer of the same token.
    pub fn schedule(&mut self, token: TimerToken, deadline: SimTime) {
        self.cancel(token);
        let idx = self.timers.partition_point(|(_, t)| *t <= deadline);
        self.timers.insert(idx, (token, deadline));
    }

    pub fn active(&self, token: TimerToken) -> bool {
        self.timers.iter().any(|t| t.0 == token)
    }

    pub fn cancel(&mut self, token: TimerToken) {
        self.timers.retain(|e| e.0 != token);
    }

    /// Cancels every timer of `ifid`, returning how many were pending.
    pub fn cancel_interface(&mut self, ifid: IfId) -> usize {
        let len = self.timers.len();
        self.timers.retain(|e| e.0.ifid() != ifid);
        len - self.timers.len()
    }

    pub fn next(&self) -> Option<SimTime> {
        self.timers.first().map(|v| v.1)
    }

    /// Removes and returns the earliest timer due at `now`.
    pub fn pop_expired(&mut self, now: SimTime) -> Option<TimerToken> {
        if self.timers.first()?.1 <= now {
            Some(self.timers.remove(0).0)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn at(secs: u64) -> SimTime {
        SimTime::ZERO + Duration::from_secs(secs)
    }

    #[test]
    fn expire_in_deadline_order() {
        let ifid = IfId::new("en0");
        let mut timers = TimerCtrl::new();
        timers.schedule(TimerToken::RouterDiscovery { ifid }, at(4));
        timers.schedule(TimerToken::PeriodicAdvertisement { ifid }, at(1));
        timers.schedule(TimerToken::SolicitedAdvertisement { ifid }, at(4));

        assert_eq!(timers.next(), Some(at(1)));
        assert_eq!(timers.pop_expired(at(0)), None);
        assert_eq!(
            timers.pop_expired(at(5)),
            Some(TimerToken::PeriodicAdvertisement { ifid })
        );
        assert_eq!(
            timers.pop_expired(at(5)),
            Some(TimerToken::RouterDiscovery { ifid })
        );
        assert_eq!(
            timers.pop_expired(at(5)),
            Some(TimerToken::SolicitedAdvertisement { ifid })
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn rescheduling_replaces() {
        let ifid = IfId::new("en0");
        let token = TimerToken::AddressResolution {
            target: Ipv6Addr::LOCALHOST,
            ifid,
        };
        let mut timers = TimerCtrl::new();
        timers.schedule(token, at(1));
        timers.schedule(token, at(3));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next(), Some(at(3)));

        timers.schedule(TimerToken::RouterDiscovery { ifid }, at(2));
        timers.schedule(
            TimerToken::RouterDiscovery {
                ifid: IfId::new("en1"),
            },
            at(2),
        );
        assert_eq!(timers.cancel_interface(ifid), 2);
        assert_eq!(timers.len(), 1);
        assert!(!timers.active(token));
    }
}
