//! The prefix list, default route list and destination cache.
//!
//! Neighbor Discovery drives this state but does not own it. The engine talks
//! to it through [`RouteTable`]; [`RoutingTable`] is the in-memory default.

use std::net::Ipv6Addr;

use des::time::SimTime;
use inet_types::ip::Ipv6Prefix;

use crate::interface::IfId;

mod table;
pub use self::table::*;

/// How packets matching a route are forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ipv6Gateway {
    /// The destination is on-link and is its own next hop.
    Local,
    /// Packets are forwarded to this neighbouring router.
    Gateway(Ipv6Addr),
}

/// A prefix route, either an on-link prefix or a static route via a router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Route {
    pub prefix: Ipv6Prefix,
    pub gateway: Ipv6Gateway,
    pub ifid: IfId,
    pub expires: SimTime,
}

impl Route {
    /// The next hop for `dst` when forwarded along this route.
    #[must_use]
    pub fn next_hop(&self, dst: Ipv6Addr) -> Ipv6Addr {
        match self.gateway {
            Ipv6Gateway::Local => dst,
            Ipv6Gateway::Gateway(router) => router,
        }
    }
}

/// A default route through a router learned from an advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultRoute {
    pub router: Ipv6Addr,
    pub ifid: IfId,
    pub expires: SimTime,
}

/// A memorized next-hop decision for a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    pub next_hop: Ipv6Addr,
    pub ifid: IfId,
    pub expires: SimTime,
}

/// The routing collaborator of the Neighbor Discovery engine.
pub trait RouteTable {
    /// Whether this node forwards packets.
    fn is_router(&self) -> bool;

    /// The longest non-expired prefix route matching `dst`.
    ///
    /// Default routes are not considered, they are selected by the engine.
    fn lookup_prefix(&self, dst: Ipv6Addr, now: SimTime) -> Option<Route>;

    /// Whether `prefix` is an on-link prefix of `ifid`.
    fn has_prefix(&self, prefix: Ipv6Prefix, ifid: IfId) -> bool;

    /// Adds an on-link prefix or refreshes its expiry.
    fn add_or_update_prefix(&mut self, prefix: Ipv6Prefix, ifid: IfId, expires: SimTime);

    fn remove_prefix(&mut self, prefix: Ipv6Prefix, ifid: IfId);

    /// Adds a default route or refreshes its expiry.
    fn add_default_route(&mut self, router: Ipv6Addr, ifid: IfId, expires: SimTime);

    fn remove_default_route(&mut self, router: Ipv6Addr, ifid: IfId);

    /// The cached next-hop decision for `dst`, if not expired.
    fn destination(&self, dst: Ipv6Addr, now: SimTime) -> Option<Destination>;

    fn update_destination(&mut self, dst: Ipv6Addr, entry: Destination);

    /// Drops every destination cache entry using `next_hop` on `ifid`.
    fn purge_destinations_via(&mut self, next_hop: Ipv6Addr, ifid: IfId);

    /// Drops all prefixes, default routes and destinations of `ifid`.
    fn remove_interface(&mut self, ifid: IfId);
}

impl<T: RouteTable + ?Sized> RouteTable for &mut T {
    fn is_router(&self) -> bool {
        (**self).is_router()
    }

    fn lookup_prefix(&self, dst: Ipv6Addr, now: SimTime) -> Option<Route> {
        (**self).lookup_prefix(dst, now)
    }

    fn has_prefix(&self, prefix: Ipv6Prefix, ifid: IfId) -> bool {
        (**self).has_prefix(prefix, ifid)
    }

    fn add_or_update_prefix(&mut self, prefix: Ipv6Prefix, ifid: IfId, expires: SimTime) {
        (**self).add_or_update_prefix(prefix, ifid, expires);
    }

    fn remove_prefix(&mut self, prefix: Ipv6Prefix, ifid: IfId) {
        (**self).remove_prefix(prefix, ifid);
    }

    fn add_default_route(&mut self, router: Ipv6Addr, ifid: IfId, expires: SimTime) {
        (**self).add_default_route(router, ifid, expires);
    }

    fn remove_default_route(&mut self, router: Ipv6Addr, ifid: IfId) {
        (**self).remove_default_route(router, ifid);
    }

    fn destination(&self, dst: Ipv6Addr, now: SimTime) -> Option<Destination> {
        (**self).destination(dst, now)
    }

    fn update_destination(&mut self, dst: Ipv6Addr, entry: Destination) {
        (**self).update_destination(dst, entry);
    }

    fn purge_destinations_via(&mut self, next_hop: Ipv6Addr, ifid: IfId) {
        (**self).purge_destinations_via(next_hop, ifid);
    }

    fn remove_interface(&mut self, ifid: IfId) {
        (**self).remove_interface(ifid);
    }
}
