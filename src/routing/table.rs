use std::net::Ipv6Addr;

use des::time::SimTime;
use fxhash::{FxBuildHasher, FxHashMap};
use inet_types::ip::{Ipv6LongestPrefixTable, Ipv6Prefix};

use super::{DefaultRoute, Destination, Ipv6Gateway, Route, RouteTable};
use crate::interface::IfId;

/// An in-memory routing table.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    is_router: bool,
    prefixes: Ipv6LongestPrefixTable<Route>,
    default_routes: Vec<DefaultRoute>,
    destinations: FxHashMap<Ipv6Addr, Destination>,
}

impl RoutingTable {
    #[must_use]
    pub fn new(is_router: bool) -> Self {
        Self {
            is_router,
            prefixes: Ipv6LongestPrefixTable::new(),
            default_routes: Vec::new(),
            destinations: FxHashMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Adds a permanent route for `prefix` through `router`.
    pub fn add_route(&mut self, prefix: Ipv6Prefix, router: Ipv6Addr, ifid: IfId) {
        self.prefixes.insert_by(
            prefix,
            Route {
                prefix,
                gateway: Ipv6Gateway::Gateway(router),
                ifid,
                expires: SimTime::MAX,
            },
            |route| route.ifid == ifid && route.gateway != Ipv6Gateway::Local,
        );
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.prefixes.iter().map(|(_, route)| route)
    }

    #[must_use]
    pub fn default_routes(&self) -> &[DefaultRoute] {
        &self.default_routes
    }

    pub fn destinations(&self) -> impl Iterator<Item = (&Ipv6Addr, &Destination)> {
        self.destinations.iter()
    }
}

impl RouteTable for RoutingTable {
    fn is_router(&self) -> bool {
        self.is_router
    }

    fn lookup_prefix(&self, dst: Ipv6Addr, now: SimTime) -> Option<Route> {
        self.prefixes
            .lookup_by(dst, |route| route.expires > now)
            .copied()
    }

    fn has_prefix(&self, prefix: Ipv6Prefix, ifid: IfId) -> bool {
        self.prefixes
            .get_by(prefix, |route| on_link_via(route, ifid))
            .is_some()
    }

    fn add_or_update_prefix(&mut self, prefix: Ipv6Prefix, ifid: IfId, expires: SimTime) {
        let replaced = self.prefixes.insert_by(
            prefix,
            Route {
                prefix,
                gateway: Ipv6Gateway::Local,
                ifid,
                expires,
            },
            |route| on_link_via(route, ifid),
        );
        if replaced.is_none() {
            tracing::debug!(IFACE = %ifid, "added on-link prefix {prefix}");
        }
    }

    fn remove_prefix(&mut self, prefix: Ipv6Prefix, ifid: IfId) {
        if self
            .prefixes
            .remove_by(prefix, |route| on_link_via(route, ifid))
            .is_some()
        {
            // destinations resolved through this prefix are no longer on-link
            self.destinations
                .retain(|dst, entry| !(entry.ifid == ifid && prefix.contains(*dst)));
            tracing::debug!(IFACE = %ifid, "removed on-link prefix {prefix}");
        }
    }

    fn add_default_route(&mut self, router: Ipv6Addr, ifid: IfId, expires: SimTime) {
        if let Some(route) = self
            .default_routes
            .iter_mut()
            .find(|r| r.router == router && r.ifid == ifid)
        {
            route.expires = expires;
        } else {
            self.default_routes.push(DefaultRoute {
                router,
                ifid,
                expires,
            });
            tracing::debug!(IFACE = %ifid, "added default route via {router}");
        }
    }

    fn remove_default_route(&mut self, router: Ipv6Addr, ifid: IfId) {
        self.default_routes
            .retain(|r| !(r.router == router && r.ifid == ifid));
    }

    fn destination(&self, dst: Ipv6Addr, now: SimTime) -> Option<Destination> {
        self.destinations
            .get(&dst)
            .filter(|entry| entry.expires > now)
            .copied()
    }

    fn update_destination(&mut self, dst: Ipv6Addr, entry: Destination) {
        self.destinations.insert(dst, entry);
    }

    fn purge_destinations_via(&mut self, next_hop: Ipv6Addr, ifid: IfId) {
        self.destinations
            .retain(|_, entry| !(entry.next_hop == next_hop && entry.ifid == ifid));
    }

    fn remove_interface(&mut self, ifid: IfId) {
        self.prefixes.retain(|_, route| route.ifid != ifid);
        self.default_routes.retain(|r| r.ifid != ifid);
        self.destinations.retain(|_, entry| entry.ifid != ifid);
    }
}

/// On-link prefixes are kept per interface.
fn on_link_via(route: &Route, ifid: IfId) -> bool {
    route.ifid == ifid && route.gateway == Ipv6Gateway::Local
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn addr(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn longest_on_link_match() {
        let en0 = IfId::new("en0");
        let en1 = IfId::new("en1");
        let mut table = RoutingTable::new(false);
        table.add_or_update_prefix("2001:db8::/32".parse().unwrap(), en0, SimTime::MAX);
        table.add_route("2001:db8:1::/48".parse().unwrap(), addr("fe80::1"), en1);

        let route = table
            .lookup_prefix(addr("2001:db8:1::5"), SimTime::ZERO)
            .unwrap();
        assert_eq!(route.ifid, en1);
        assert_eq!(route.next_hop(addr("2001:db8:1::5")), addr("fe80::1"));

        let route = table
            .lookup_prefix(addr("2001:db8:2::5"), SimTime::ZERO)
            .unwrap();
        assert_eq!(route.gateway, Ipv6Gateway::Local);
        assert_eq!(route.next_hop(addr("2001:db8:2::5")), addr("2001:db8:2::5"));

        assert!(table.lookup_prefix(addr("2002::1"), SimTime::ZERO).is_none());
    }

    #[test]
    fn expired_prefixes_do_not_match() {
        let en0 = IfId::new("en0");
        let mut table = RoutingTable::new(false);
        let expires = SimTime::ZERO + Duration::from_secs(10);
        table.add_or_update_prefix("2001:db8::/64".parse().unwrap(), en0, expires);

        let before = SimTime::ZERO + Duration::from_secs(9);
        assert!(table.lookup_prefix(addr("2001:db8::1"), before).is_some());
        assert!(table.lookup_prefix(addr("2001:db8::1"), expires).is_none());
        assert!(table.has_prefix("2001:db8::/64".parse().unwrap(), en0));
    }

    #[test]
    fn purge_destinations_by_next_hop() {
        let en0 = IfId::new("en0");
        let mut table = RoutingTable::new(false);
        let via = |next_hop| Destination {
            next_hop,
            ifid: en0,
            expires: SimTime::MAX,
        };
        table.update_destination(addr("2001:db8::1"), via(addr("fe80::1")));
        table.update_destination(addr("2001:db8::2"), via(addr("fe80::1")));
        table.update_destination(addr("2001:db8::3"), via(addr("fe80::2")));

        table.purge_destinations_via(addr("fe80::1"), en0);
        assert!(table.destination(addr("2001:db8::1"), SimTime::ZERO).is_none());
        assert!(table.destination(addr("2001:db8::2"), SimTime::ZERO).is_none());
        assert!(table.destination(addr("2001:db8::3"), SimTime::ZERO).is_some());
    }

    #[test]
    fn remove_interface_clears_everything() {
        let en0 = IfId::new("en0");
        let mut table = RoutingTable::new(false);
        table.add_or_update_prefix("2001:db8::/64".parse().unwrap(), en0, SimTime::MAX);
        table.add_default_route(addr("fe80::1"), en0, SimTime::MAX);
        table.add_default_route(addr("fe80::1"), en0, SimTime::MAX);
        assert_eq!(table.default_routes().len(), 1);

        table.remove_interface(en0);
        assert_eq!(table.routes().count(), 0);
        assert!(table.default_routes().is_empty());
    }

    #[test]
    fn on_link_prefixes_are_per_interface() {
        let en0 = IfId::new("en0");
        let en1 = IfId::new("en1");
        let prefix: Ipv6Prefix = "fe80::/64".parse().unwrap();
        let mut table = RoutingTable::new(false);
        table.add_or_update_prefix(prefix, en0, SimTime::MAX);
        table.add_or_update_prefix(prefix, en1, SimTime::MAX);
        assert!(table.has_prefix(prefix, en0));
        assert!(table.has_prefix(prefix, en1));
        assert_eq!(table.routes().count(), 2);

        table.remove_interface(en1);
        assert!(table.has_prefix(prefix, en0));
        assert!(!table.has_prefix(prefix, en1));
        let route = table.lookup_prefix(addr("fe80::99"), SimTime::ZERO).unwrap();
        assert_eq!(route.ifid, en0);

        table.remove_prefix(prefix, en1);
        table.remove_prefix(prefix, en0);
        assert_eq!(table.routes().count(), 0);
    }
}
