use std::net::Ipv6Addr;

use des::time::SimTime;

use super::{
    ndp::{NeighborKey, NeighborState},
    NeighborDiscovery,
};
use crate::{
    interface::{IfId, InterfaceTable},
    routing::{Destination, RouteTable},
};

impl<I: InterfaceTable, R: RouteTable> NeighborDiscovery<I, R> {
    /// Determines the next hop towards `dst` and records it in the
    /// destination cache.
    ///
    /// Destinations within an on-link prefix are their own next hop. All others
    /// go through a default router.
    pub fn determine_next_hop(&mut self, now: SimTime, dst: Ipv6Addr) -> Option<(Ipv6Addr, IfId)> {
        let (next_hop, ifid, expires) = if let Some(route) = self.routing.lookup_prefix(dst, now) {
            (route.next_hop(dst), route.ifid, route.expires)
        } else {
            let Some(router) = self.select_default_router(now) else {
                tracing::trace!("no default router for {dst}");
                return None;
            };
            let expires = self
                .neighbors
                .lookup(router)
                .map_or(now, |entry| entry.router_expiry);
            (router.addr, router.ifid, expires)
        };

        self.routing.update_destination(
            dst,
            Destination {
                next_hop,
                ifid,
                expires,
            },
        );
        tracing::trace!(IFACE = %ifid, "next hop for {dst} is {next_hop}");
        Some((next_hop, ifid))
    }

    /// Picks a default router in round-robin order.
    ///
    /// Expired routers are removed on the way. Routers not known to be
    /// unreachable are preferred. If every router is still being resolved,
    /// the head of the ring is used. Either way the ring advances past the
    /// selected router.
    pub(super) fn select_default_router(&mut self, now: SimTime) -> Option<NeighborKey> {
        let mut fallback = None;
        for key in self.neighbors.default_routers() {
            let Some(entry) = self.neighbors.lookup(key) else {
                continue;
            };

            if entry.router_expiry <= now {
                tracing::debug!(IFACE = %key.ifid, "default router {} expired", key.addr);
                self.remove_neighbor(key);
                continue;
            }

            if entry.state != NeighborState::Incomplete {
                self.neighbors.advance_head_past(key);
                return Some(key);
            }
            fallback.get_or_insert(key);
        }

        let head = fallback?;
        self.neighbors.advance_head_past(head);
        Some(head)
    }
}
