use std::{net::Ipv6Addr, time::Duration};

use inet_ndp::{
    interface::IfId,
    ipv6::{
        HostConfiguration, NdpPacket, NeighborState, RouterInterfaceConfiguration, RouterPrefix,
    },
    routing::RouteTable,
    types::{
        icmpv6::{IcmpV6NDPOption, IcmpV6RouterSolicitation, IcmpV6Type, NdpMessage},
        ip::Ipv6AddrExt,
    },
};

mod common;
use common::*;

fn router() -> (Node, IfId) {
    let (mut r, ifid) = node(10, true, instant());
    r.register_router_interface(
        at(0.0),
        ifid,
        RouterInterfaceConfiguration {
            adv_prefix_list: vec![RouterPrefix::new("2001:db8::/64".parse().unwrap())],
            ..Default::default()
        },
    )
    .unwrap();
    (r, ifid)
}

fn router_solicitation(src: Ipv6Addr, options: Vec<IcmpV6NDPOption>) -> NdpPacket {
    NdpPacket {
        src,
        dst: Ipv6Addr::MULTICAST_ALL_ROUTERS,
        hop_limit: 255,
        msg: NdpMessage::RouterSolicitation(IcmpV6RouterSolicitation { options }),
    }
}

fn advertisements(r: &mut Node) -> usize {
    controls(&r.drain_outputs(), IcmpV6Type::RouterAdvertisement).len()
}

fn next_advertisement(r: &Node, ifid: IfId) -> des::time::SimTime {
    r.advertising_interface(ifid).unwrap().next_advertisement
}

#[test]
fn initial_advertisements_are_frequent() {
    let (mut r, ifid) = router();
    assert!(r.is_advertising(ifid));
    assert!(r.router_discovery(ifid).is_none());
    assert!(r.routing().has_prefix("2001:db8::/64".parse().unwrap(), ifid));

    r.poll(at(0.0));
    let ras = controls(&r.drain_outputs(), IcmpV6Type::RouterAdvertisement);
    assert_eq!(ras.len(), 1);

    let (_, pkt) = &ras[0];
    assert_eq!(pkt.src, link_local(&r, ifid));
    assert_eq!(pkt.dst, Ipv6Addr::MULTICAST_ALL_NODES);
    let NdpMessage::RouterAdvertisement(msg) = &pkt.msg else {
        panic!("expected advertisement")
    };
    assert_eq!(msg.router_lifetime, 1800);
    assert_eq!(msg.current_hop_limit, 64);
    assert_eq!(msg.source_link_layer_address(), Some(mac(10)));
    assert_eq!(msg.mtu(), None);
    let prefixes = msg.prefixes().collect::<Vec<_>>();
    assert_eq!(prefixes.len(), 1);
    assert_eq!(prefixes[0].prefix, addr("2001:db8::"));
    assert_eq!(prefixes[0].prefix_len, 64);

    assert_eq!(next_advertisement(&r, ifid), at(16.0));
    for t in [16.0, 32.0] {
        r.poll(at(t));
        assert_eq!(advertisements(&mut r), 1);
        assert_eq!(next_advertisement(&r, ifid), at(t + 16.0));
    }

    r.poll(at(48.0));
    assert_eq!(advertisements(&mut r), 1);
    let interval = next_advertisement(&r, ifid) - at(48.0);
    assert!(interval >= Duration::from_secs(197), "{interval:?}");
    assert!(interval <= Duration::from_secs(600), "{interval:?}");
    assert_eq!(r.advertising_interface(ifid).unwrap().advertisements_sent, 4);
}

#[test]
fn solicitation_advances_next_advertisement() {
    let (mut r, ifid) = router();
    r.poll(at(0.0));
    r.drain_outputs();

    let host = addr("fe80::5");
    r.recv(
        at(1.0),
        ifid,
        router_solicitation(host, vec![IcmpV6NDPOption::SourceLinkLayerAddress(mac(5))]),
    )
    .unwrap();
    let scheduled = next_advertisement(&r, ifid);
    assert!(scheduled >= at(1.0) && scheduled <= at(1.5));

    let entry = r.neighbor(host, ifid).unwrap();
    assert_eq!(entry.state(), NeighborState::Stale);
    assert_eq!(entry.mac(), mac(5));

    r.poll(at(1.5));
    assert_eq!(advertisements(&mut r), 1);
    assert_eq!(next_advertisement(&r, ifid), scheduled + Duration::from_secs(16));

    // the periodic advertisement at 16s was replaced
    r.poll(at(16.9));
    assert_eq!(advertisements(&mut r), 0);
}

#[test]
fn solicitation_from_unspecified_source() {
    let (mut r, ifid) = router();
    r.poll(at(0.0));
    r.drain_outputs();

    r.recv(
        at(1.0),
        ifid,
        router_solicitation(
            Ipv6Addr::UNSPECIFIED,
            vec![IcmpV6NDPOption::SourceLinkLayerAddress(mac(5))],
        ),
    )
    .unwrap();
    assert_eq!(next_advertisement(&r, ifid), at(16.0));

    r.recv(at(1.0), ifid, router_solicitation(Ipv6Addr::UNSPECIFIED, Vec::new()))
        .unwrap();
    assert!(next_advertisement(&r, ifid) <= at(1.5));
    assert!(r.neighbors().is_empty());
}

#[test]
fn solicitation_before_link_local_is_preferred() {
    let (mut r, ifid) = node(10, true, HostConfiguration::default());
    r.register_router_interface(at(0.0), ifid, RouterInterfaceConfiguration::default())
        .unwrap();
    r.drain_outputs();
    assert_eq!(next_advertisement(&r, ifid), des::time::SimTime::MAX);

    r.recv(at(0.5), ifid, router_solicitation(Ipv6Addr::UNSPECIFIED, Vec::new()))
        .unwrap();
    assert_eq!(next_advertisement(&r, ifid), des::time::SimTime::MAX);

    r.poll(at(0.9));
    assert_eq!(advertisements(&mut r), 0);
    assert_eq!(r.advertising_interface(ifid).unwrap().advertisements_sent, 0);

    // duplicate address detection completes, the first advertisement follows
    r.poll(at(1.0));
    assert_eq!(advertisements(&mut r), 1);
    assert_eq!(r.advertising_interface(ifid).unwrap().advertisements_sent, 1);
    assert_eq!(next_advertisement(&r, ifid), at(17.0));
}

#[test]
fn hosts_ignore_solicitations() {
    let (mut a, ifid) = host(1);
    a.recv(
        at(0.5),
        ifid,
        router_solicitation(
            addr("fe80::5"),
            vec![IcmpV6NDPOption::SourceLinkLayerAddress(mac(5))],
        ),
    )
    .unwrap();
    assert!(a.neighbors().is_empty());
    assert!(a.drain_outputs().is_empty());
}

#[test]
fn routers_ignore_advertisements() {
    let (mut r, ifid) = router();
    r.recv(at(0.5), ifid, advertisement(addr("fe80::1"), Some(mac(1)), 1800, Vec::new()))
        .unwrap();
    assert!(r.neighbors().is_empty());
    assert!(r.routing().default_routes().is_empty());
}

#[test]
fn non_forwarding_node_does_not_advertise() {
    let (mut a, ifid) = node(10, false, instant());
    a.register_router_interface(at(0.0), ifid, RouterInterfaceConfiguration::default())
        .unwrap();
    assert!(!a.is_advertising(ifid));
    assert!(a.router_discovery(ifid).is_some());
}

#[test]
fn host_learns_router_from_advertisement() {
    let (mut r, ifid) = router();
    let (mut a, _) = host(1);
    let a_addr = link_local(&a, ifid);
    let r_addr = link_local(&r, ifid);

    r.poll(at(0.0));
    deliver(at(0.1), r.drain_outputs(), &mut a, ifid);

    let entry = a.neighbor(r_addr, ifid).unwrap();
    assert!(entry.is_default_router());
    assert_eq!(entry.mac(), mac(10));
    assert!(a.routing().has_prefix("2001:db8::/64".parse().unwrap(), ifid));

    a.send_datagram(at(1.0), datagram(a_addr, addr("2001:db9::1"), 7))
        .unwrap();
    let sent = datagrams(&a.drain_outputs());
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, mac(10));
    assert_eq!(a.neighbor(r_addr, ifid).unwrap().state(), NeighborState::Delay);
}
