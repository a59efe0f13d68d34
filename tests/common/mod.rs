#![allow(dead_code)]

use std::{net::Ipv6Addr, time::Duration};

use des::time::SimTime;
use inet_ndp::{
    interface::{IfId, Interface, InterfaceTable, Interfaces},
    ipv6::{HostConfiguration, NdpOutput, NdpPacket, NeighborDiscovery},
    routing::RoutingTable,
    types::{
        icmpv6::{
            IcmpV6NDPOption, IcmpV6NeighborSolicitation, IcmpV6RouterAdvertisement, IcmpV6Type,
            NdpMessage, NDP_HOP_LIMIT,
        },
        iface::MacAddress,
        ip::{Ipv6AddrExt, Ipv6Packet},
    },
};

pub type Node = NeighborDiscovery<Interfaces, RoutingTable>;

pub fn at(secs: f64) -> SimTime {
    SimTime::ZERO + Duration::from_secs_f64(secs)
}

pub fn mac(id: u8) -> MacAddress {
    MacAddress::from([0x02, 0x00, 0x00, 0x00, 0x00, id])
}

pub fn addr(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

/// A host configuration without duplicate address detection, so that
/// addresses become usable immediately.
pub fn instant() -> HostConfiguration {
    HostConfiguration {
        dup_addr_detect_transmits: 0,
        ..Default::default()
    }
}

/// A node with a single ethernet interface `en0`.
pub fn node(id: u8, is_router: bool, cfg: HostConfiguration) -> (Node, IfId) {
    let mut ifaces = Interfaces::new();
    let ifid = ifaces.add(Interface::ethernet("en0", mac(id)));
    (
        NeighborDiscovery::new(ifaces, RoutingTable::new(is_router), cfg),
        ifid,
    )
}

/// A registered host with a usable link-local address.
pub fn host(id: u8) -> (Node, IfId) {
    let (mut node, ifid) = node(id, false, instant());
    node.register_host_interface(at(0.0), ifid).unwrap();
    (node, ifid)
}

pub fn link_local(node: &Node, ifid: IfId) -> Ipv6Addr {
    node.ifaces()
        .get(ifid)
        .and_then(Interface::link_local)
        .map(|addr| addr.addr)
        .unwrap()
}

pub fn datagram(src: Ipv6Addr, dst: Ipv6Addr, marker: u8) -> Ipv6Packet {
    Ipv6Packet::new(src, dst, 17, vec![marker; 8])
}

/// Hands every control message in `outputs` to `to`, returning what `to`
/// emitted in response.
pub fn deliver(now: SimTime, outputs: Vec<NdpOutput>, to: &mut Node, ifid: IfId) -> Vec<NdpOutput> {
    for output in outputs {
        if let NdpOutput::Control { pkt, .. } = output {
            to.recv(now, ifid, pkt).unwrap();
        }
    }
    to.drain_outputs()
}

pub fn controls(outputs: &[NdpOutput], typ: IcmpV6Type) -> Vec<(Option<MacAddress>, NdpPacket)> {
    outputs
        .iter()
        .filter_map(|output| match output {
            NdpOutput::Control { link_dst, pkt, .. } if pkt.msg.typ() == typ => {
                Some((*link_dst, pkt.clone()))
            }
            _ => None,
        })
        .collect()
}

pub fn datagrams(outputs: &[NdpOutput]) -> Vec<(MacAddress, Ipv6Packet)> {
    outputs
        .iter()
        .filter_map(|output| match output {
            NdpOutput::Datagram { mac, pkt, .. } => Some((*mac, pkt.clone())),
            _ => None,
        })
        .collect()
}

pub fn unreachables(outputs: &[NdpOutput]) -> Vec<Ipv6Packet> {
    outputs
        .iter()
        .filter_map(|output| match output {
            NdpOutput::Unreachable { pkt, .. } => Some(pkt.clone()),
            _ => None,
        })
        .collect()
}

/// A solicitation from `src`, announcing its link-layer address.
pub fn solicitation(src: Ipv6Addr, src_mac: MacAddress, target: Ipv6Addr) -> NdpPacket {
    NdpPacket {
        src,
        dst: Ipv6Addr::solicited_node_multicast(target),
        hop_limit: NDP_HOP_LIMIT,
        msg: NdpMessage::NeighborSolicitation(IcmpV6NeighborSolicitation {
            target,
            options: vec![IcmpV6NDPOption::SourceLinkLayerAddress(src_mac)],
        }),
    }
}

/// A router advertisement with the given router lifetime in seconds.
pub fn advertisement(
    src: Ipv6Addr,
    src_mac: Option<MacAddress>,
    lifetime: u16,
    mut options: Vec<IcmpV6NDPOption>,
) -> NdpPacket {
    if let Some(mac) = src_mac {
        options.insert(0, IcmpV6NDPOption::SourceLinkLayerAddress(mac));
    }
    NdpPacket {
        src,
        dst: Ipv6Addr::MULTICAST_ALL_NODES,
        hop_limit: NDP_HOP_LIMIT,
        msg: NdpMessage::RouterAdvertisement(IcmpV6RouterAdvertisement {
            current_hop_limit: 0,
            managed: false,
            other_configuration: false,
            home_agent: false,
            router_lifetime: lifetime,
            reachable_time: 0,
            retransmit_time: 0,
            options,
        }),
    }
}
