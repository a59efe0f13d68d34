//! ICMPv6 Neighbor Discovery messages (RFC 4861 §4).
//!
//! Messages are kept in their decoded form. Encoding and checksumming is done
//! by the transport, so only the option framing lengths are modelled here.

use std::{net::Ipv6Addr, time::Duration};

use crate::{iface::MacAddress, ip::Ipv6Prefix};

pub const PROTO_ICMPV6: u8 = 58;

/// Hop limit every Neighbor Discovery message must carry.
pub const NDP_HOP_LIMIT: u8 = 255;

/// Minimum link MTU of any IPv6 link (RFC 8200 §5).
pub const IPV6_MIN_MTU: u32 = 1280;

/// Lifetime value representing infinity.
pub const NDP_INFINITE_LIFETIME: u32 = u32::MAX;

// Router constants
pub const NDP_MAX_INITIAL_RTR_ADVERT_INTERVAL: Duration = Duration::from_secs(16);
pub const NDP_MAX_INITIAL_RTR_ADVERTISEMENTS: usize = 3;
pub const NDP_MAX_FINAL_RTR_ADVERTISEMENTS: usize = 3;
pub const NDP_MIN_DELAY_BETWEEN_RAS: Duration = Duration::from_secs(3);
pub const NDP_MAX_RA_DELAY_TIME: Duration = Duration::from_millis(500);

// Host constants
pub const NDP_MAX_RTR_SOLICITATION_DELAY: Duration = Duration::from_secs(1);
pub const NDP_RTR_SOLICITATION_INTERVAL: Duration = Duration::from_secs(4);
pub const NDP_MAX_RTR_SOLICITATIONS: usize = 3;

// Node constants
pub const NDP_MAX_MULTICAST_SOLICIT: usize = 3;
pub const NDP_MAX_UNICAST_SOLICIT: usize = 3;
pub const NDP_MAX_ANYCAST_DELAY_TIME: Duration = Duration::from_secs(1);
pub const NDP_MAX_NEIGHBOR_ADVERTISEMENT: usize = 3;
pub const NDP_REACHABLE_TIME: Duration = Duration::from_secs(30);
pub const NDP_RETRANS_TIMER: Duration = Duration::from_secs(1);
pub const NDP_DELAY_FIRST_PROBE_TIME: Duration = Duration::from_secs(5);
pub const NDP_MIN_RANDOM_FACTOR: f64 = 0.5;
pub const NDP_MAX_RANDOM_FACTOR: f64 = 1.5;

primitve_enum_repr! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum IcmpV6Type {
        type Repr = u8;

        DestinationUnreachable = 1,
        PacketToBig = 2,
        TimeExceeded = 3,
        ParameterProblem = 4,
        RouterSolicitation = 133,
        RouterAdvertisement = 134,
        NeighborSolicitation = 135,
        NeighborAdvertisement = 136,
        Redirect = 137,
    };
}

primitve_enum_repr! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum IcmpV6DestinationUnreachableCode {
        type Repr = u8;

        NoRoute = 0,
        AdministrativelyProhibited = 1,
        BeyondScopeOfSourceAddress = 2,
        AddressUnreachable = 3,
        PortUnreachable = 4,
    };
}

primitve_enum_repr! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum IcmpV6NDPOptionType {
        type Repr = u8;

        SourceLinkLayerAddress = 1,
        TargetLinkLayerAddress = 2,
        PrefixInformation = 3,
        RedirectHeader = 4,
        Mtu = 5,
    };
}

/// The fixed set of Neighbor Discovery messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdpMessage {
    RouterSolicitation(IcmpV6RouterSolicitation),
    RouterAdvertisement(IcmpV6RouterAdvertisement),
    NeighborSolicitation(IcmpV6NeighborSolicitation),
    NeighborAdvertisement(IcmpV6NeighborAdvertisement),
    Redirect(IcmpV6Redirect),
}

impl NdpMessage {
    #[must_use]
    pub fn typ(&self) -> IcmpV6Type {
        match self {
            Self::RouterSolicitation(_) => IcmpV6Type::RouterSolicitation,
            Self::RouterAdvertisement(_) => IcmpV6Type::RouterAdvertisement,
            Self::NeighborSolicitation(_) => IcmpV6Type::NeighborSolicitation,
            Self::NeighborAdvertisement(_) => IcmpV6Type::NeighborAdvertisement,
            Self::Redirect(_) => IcmpV6Type::Redirect,
        }
    }

    #[must_use]
    pub fn options(&self) -> &[IcmpV6NDPOption] {
        match self {
            Self::RouterSolicitation(msg) => &msg.options,
            Self::RouterAdvertisement(msg) => &msg.options,
            Self::NeighborSolicitation(msg) => &msg.options,
            Self::NeighborAdvertisement(msg) => &msg.options,
            Self::Redirect(msg) => &msg.options,
        }
    }

    /// Length of the encoded message in bytes, including the ICMPv6 header.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        let fixed = match self {
            Self::RouterSolicitation(_) => 8,
            Self::RouterAdvertisement(_) => 16,
            Self::NeighborSolicitation(_) | Self::NeighborAdvertisement(_) => 24,
            Self::Redirect(_) => 40,
        };
        fixed
            + self
                .options()
                .iter()
                .map(|opt| usize::from(opt.len()) * 8)
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpV6RouterSolicitation {
    pub options: Vec<IcmpV6NDPOption>,
}

impl IcmpV6RouterSolicitation {
    #[must_use]
    pub fn source_link_layer_address(&self) -> Option<MacAddress> {
        source_link_layer_address(&self.options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpV6RouterAdvertisement {
    pub current_hop_limit: u8,
    pub managed: bool,
    pub other_configuration: bool,
    pub home_agent: bool,
    pub router_lifetime: u16, // in seconds
    pub reachable_time: u32,  // in ms
    pub retransmit_time: u32, // in ms
    pub options: Vec<IcmpV6NDPOption>,
}

impl IcmpV6RouterAdvertisement {
    #[must_use]
    pub fn source_link_layer_address(&self) -> Option<MacAddress> {
        source_link_layer_address(&self.options)
    }

    #[must_use]
    pub fn mtu(&self) -> Option<u32> {
        self.options.iter().find_map(|opt| {
            if let IcmpV6NDPOption::Mtu(mtu) = opt {
                Some(mtu.mtu)
            } else {
                None
            }
        })
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &IcmpV6PrefixInformation> {
        self.options.iter().filter_map(|opt| {
            if let IcmpV6NDPOption::PrefixInformation(info) = opt {
                Some(info)
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpV6NeighborSolicitation {
    pub target: Ipv6Addr,
    pub options: Vec<IcmpV6NDPOption>,
}

impl IcmpV6NeighborSolicitation {
    #[must_use]
    pub fn source_link_layer_address(&self) -> Option<MacAddress> {
        source_link_layer_address(&self.options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpV6NeighborAdvertisement {
    pub target: Ipv6Addr,
    pub router: bool,
    pub solicited: bool,
    pub override_flag: bool,
    pub options: Vec<IcmpV6NDPOption>,
}

impl IcmpV6NeighborAdvertisement {
    #[must_use]
    pub fn target_link_layer_address(&self) -> Option<MacAddress> {
        self.options.iter().find_map(|opt| {
            if let IcmpV6NDPOption::TargetLinkLayerAddress(mac) = opt {
                Some(*mac)
            } else {
                None
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpV6Redirect {
    pub target: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub options: Vec<IcmpV6NDPOption>,
}

fn source_link_layer_address(options: &[IcmpV6NDPOption]) -> Option<MacAddress> {
    options.iter().find_map(|opt| {
        if let IcmpV6NDPOption::SourceLinkLayerAddress(mac) = opt {
            Some(*mac)
        } else {
            None
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmpV6NDPOption {
    SourceLinkLayerAddress(MacAddress),
    TargetLinkLayerAddress(MacAddress),
    PrefixInformation(IcmpV6PrefixInformation),
    RedirectHeader(Vec<u8>),
    Mtu(IcmpV6MtuOption),
}

impl IcmpV6NDPOption {
    #[must_use]
    pub fn typ(&self) -> IcmpV6NDPOptionType {
        match self {
            Self::SourceLinkLayerAddress(_) => IcmpV6NDPOptionType::SourceLinkLayerAddress,
            Self::TargetLinkLayerAddress(_) => IcmpV6NDPOptionType::TargetLinkLayerAddress,
            Self::PrefixInformation(_) => IcmpV6NDPOptionType::PrefixInformation,
            Self::RedirectHeader(_) => IcmpV6NDPOptionType::RedirectHeader,
            Self::Mtu(_) => IcmpV6NDPOptionType::Mtu,
        }
    }

    /// The option length in units of 8 octets, including type and length bytes.
    #[must_use]
    pub fn len(&self) -> u8 {
        match self {
            Self::SourceLinkLayerAddress(_) | Self::TargetLinkLayerAddress(_) | Self::Mtu(_) => 1,
            Self::PrefixInformation(_) => 4,
            // 2 bytes header, 6 bytes reserved, then the truncated packet
            Self::RedirectHeader(data) => (8 + data.len()).div_ceil(8) as u8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpV6PrefixInformation {
    pub prefix_len: u8,
    pub on_link: bool,
    pub autonomous_address_configuration: bool,
    pub valid_lifetime: u32,     // in seconds
    pub preferred_lifetime: u32, // in seconds
    pub prefix: Ipv6Addr,
}

impl IcmpV6PrefixInformation {
    /// The advertised prefix, if the length is valid.
    #[must_use]
    pub fn prefix(&self) -> Option<Ipv6Prefix> {
        Ipv6Prefix::try_new(self.prefix, self.prefix_len)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpV6MtuOption {
    pub mtu: u32,
}
