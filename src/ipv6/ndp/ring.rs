use super::{NeighborCache, NeighborKey};

/// Forward and backward slot links of a ring member.
///
/// Both links are set or unset together, an entry can not be half-linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RingLink {
    next: usize,
    prev: usize,
}

/// Round robin cursor over the default routers of a neighbour cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultRouterRing {
    head: Option<usize>,
    len: usize,
}

impl NeighborCache {
    fn link_of(&self, slot: usize) -> Option<RingLink> {
        self.slots.get(slot)?.as_ref()?.ring
    }

    fn set_link(&mut self, slot: usize, link: Option<RingLink>) {
        if let Some(Some(entry)) = self.slots.get_mut(slot) {
            entry.ring = link;
        }
    }

    fn set_next(&mut self, slot: usize, next: usize) {
        if let Some(link) = self.link_of(slot) {
            self.set_link(slot, Some(RingLink { next, ..link }));
        }
    }

    fn set_prev(&mut self, slot: usize, prev: usize) {
        if let Some(link) = self.link_of(slot) {
            self.set_link(slot, Some(RingLink { prev, ..link }));
        }
    }

    /// Links an entry into the ring, just before the head.
    ///
    /// Returns false if the entry does not exist or is allready linked.
    pub fn link_router(&mut self, key: NeighborKey) -> bool {
        let Some(&slot) = self.index.get(&key) else {
            return false;
        };
        if self.link_of(slot).is_some() {
            return false;
        }

        match self.ring.head.and_then(|head| Some((head, self.link_of(head)?))) {
            Some((head, head_link)) => {
                let tail = head_link.prev;
                self.set_link(
                    slot,
                    Some(RingLink {
                        next: head,
                        prev: tail,
                    }),
                );
                self.set_next(tail, slot);
                self.set_prev(head, slot);
            }
            None => {
                self.set_link(
                    slot,
                    Some(RingLink {
                        next: slot,
                        prev: slot,
                    }),
                );
                self.ring.head = Some(slot);
            }
        }
        self.ring.len += 1;
        tracing::debug!(IFACE = %key.ifid, "added default router {}", key.addr);
        true
    }

    /// Unlinks an entry from the ring in constant time.
    ///
    /// Returns whether the entry was linked.
    pub fn unlink_router(&mut self, key: NeighborKey) -> bool {
        let Some(&slot) = self.index.get(&key) else {
            return false;
        };
        let Some(link) = self.link_of(slot) else {
            return false;
        };

        if link.next == slot {
            self.ring.head = None;
        } else {
            self.set_next(link.prev, link.next);
            self.set_prev(link.next, link.prev);
            if self.ring.head == Some(slot) {
                self.ring.head = Some(link.next);
            }
        }
        self.set_link(slot, None);
        self.ring.len -= 1;
        tracing::debug!(IFACE = %key.ifid, "removed default router {}", key.addr);
        true
    }

    /// The default routers, starting at the head and following the ring once.
    pub fn default_routers(&self) -> Vec<NeighborKey> {
        let mut routers = Vec::with_capacity(self.ring.len);
        let mut cursor = self.ring.head;
        while let Some(slot) = cursor {
            let Some(entry) = self.slots.get(slot).and_then(Option::as_ref) else {
                break;
            };
            routers.push(entry.key);
            cursor = entry.ring.map(|link| link.next);
            // wrapped around
            if cursor == self.ring.head || routers.len() >= self.ring.len {
                break;
            }
        }
        routers
    }

    pub fn default_router_head(&self) -> Option<NeighborKey> {
        let slot = self.ring.head?;
        Some(self.slots.get(slot)?.as_ref()?.key)
    }

    pub fn default_router_count(&self) -> usize {
        self.ring.len
    }

    /// Moves the head to the ring successor of `key`.
    pub fn advance_head_past(&mut self, key: NeighborKey) {
        let Some(&slot) = self.index.get(&key) else {
            return;
        };
        if let Some(link) = self.link_of(slot) {
            self.ring.head = Some(link.next);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use des::time::SimTime;
    use inet_types::iface::MacAddress;

    use super::*;
    use crate::{interface::IfId, ipv6::timer::TimerCtrl};

    fn key(last: u16) -> NeighborKey {
        NeighborKey::new(
            Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, last),
            IfId::new("en0"),
        )
    }

    fn cache_with_routers(n: u16) -> NeighborCache {
        let mut cache = NeighborCache::new();
        for i in 1..=n {
            cache
                .add_router(key(i), Some(MacAddress::NULL), SimTime::MAX, false)
                .unwrap();
        }
        cache
    }

    fn assert_linked_iff_listed(cache: &NeighborCache) {
        let listed = cache.default_routers();
        for entry in cache.iter() {
            assert_eq!(entry.is_default_router(), listed.contains(&entry.key()));
        }
        assert_eq!(listed.len(), cache.default_router_count());
    }

    #[test]
    fn routers_link_in_insertion_order() {
        let cache = cache_with_routers(3);
        assert_eq!(cache.default_routers(), vec![key(1), key(2), key(3)]);
        assert_eq!(cache.default_router_head(), Some(key(1)));
        assert_linked_iff_listed(&cache);
    }

    #[test]
    fn unlink_head_middle_and_last() {
        let mut cache = cache_with_routers(4);
        assert!(cache.unlink_router(key(2)));
        assert_eq!(cache.default_routers(), vec![key(1), key(3), key(4)]);

        assert!(cache.unlink_router(key(1)));
        assert_eq!(cache.default_router_head(), Some(key(3)));
        assert_eq!(cache.default_routers(), vec![key(3), key(4)]);
        assert!(!cache.unlink_router(key(1)));

        assert!(cache.unlink_router(key(4)));
        assert!(cache.unlink_router(key(3)));
        assert!(cache.default_routers().is_empty());
        assert_eq!(cache.default_router_head(), None);
        assert_linked_iff_listed(&cache);

        assert!(cache.link_router(key(2)));
        assert!(!cache.link_router(key(2)));
        assert_eq!(cache.default_routers(), vec![key(2)]);
        assert_linked_iff_listed(&cache);
    }

    #[test]
    fn advance_wraps_around() {
        let mut cache = cache_with_routers(3);
        cache.advance_head_past(key(3));
        assert_eq!(cache.default_router_head(), Some(key(1)));
        cache.advance_head_past(key(1));
        assert_eq!(cache.default_routers(), vec![key(2), key(3), key(1)]);
    }

    #[test]
    fn removal_unlinks() {
        let mut cache = cache_with_routers(2);
        let mut timers = TimerCtrl::new();
        let removed = cache.remove(key(1), &mut timers).unwrap();
        assert!(!removed.is_default_router());
        assert_eq!(cache.default_routers(), vec![key(2)]);
        assert_linked_iff_listed(&cache);
    }
}
