use inet_ndp::{
    ipv6::{HostConfiguration, NeighborKey, NeighborState},
    routing::RouteTable,
    types::icmpv6::IcmpV6Type,
};

mod common;
use common::*;

#[test]
fn teardown_releases_everything() {
    let (mut a, ifid) = node(1, false, HostConfiguration::default());
    a.register_host_interface(at(0.0), ifid).unwrap();
    let ll = link_local(&a, ifid);
    assert!(a.dad_entry(ll, ifid).is_some());

    a.recv(at(0.2), ifid, advertisement(addr("fe80::1"), Some(mac(10)), 1800, Vec::new()))
        .unwrap();
    a.send_datagram(at(0.5), datagram(ll, addr("fe80::9"), 1))
        .unwrap();
    assert_eq!(
        a.neighbor(addr("fe80::9"), ifid).unwrap().state(),
        NeighborState::Incomplete
    );
    a.drain_outputs();
    assert!(a.has_pending_timers());

    a.teardown_interface(ifid);
    let out = a.drain_outputs();
    let failed = unreachables(&out);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].content, vec![1; 8]);

    assert!(a.neighbors().is_empty());
    assert_eq!(a.neighbors().default_router_count(), 0);
    assert!(a.dad_entry(ll, ifid).is_none());
    assert!(a.interface_state(ifid).is_none());
    assert!(a.routing().default_routes().is_empty());
    assert!(a.routing().lookup_prefix(ll, at(1.0)).is_none());
    assert!(!a.has_pending_timers());

    a.poll(at(100.0));
    assert!(a.drain_outputs().is_empty());
}

#[test]
fn shutdown_tears_down_all_interfaces() {
    let (mut a, ifid) = host(1);
    a.resolve_neighbour(at(0.0), addr("fe80::9"), ifid).unwrap();
    assert!(a.has_pending_timers());

    a.shutdown();
    assert!(a.neighbors().is_empty());
    assert!(a.router_discovery(ifid).is_none());
    assert!(!a.has_pending_timers());
}

#[test]
fn neighbor_removal_is_atomic() {
    let (mut a, ifid) = host(1);
    let ll = link_local(&a, ifid);
    a.send_datagram(at(0.0), datagram(ll, addr("fe80::9"), 1))
        .unwrap();
    a.drain_outputs();

    assert!(a.remove_neighbor(NeighborKey::new(addr("fe80::9"), ifid)));
    assert_eq!(unreachables(&a.drain_outputs()).len(), 1);
    assert!(!a.remove_neighbor(NeighborKey::new(addr("fe80::9"), ifid)));

    // no retransmission for the removed entry
    a.poll(at(1.5));
    assert!(controls(&a.drain_outputs(), IcmpV6Type::NeighborSolicitation).is_empty());
}
