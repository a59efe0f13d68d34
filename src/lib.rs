//! IPv6 Neighbor Discovery (RFC 4861) and stateless address
//! autoconfiguration (RFC 4862).
//!
//! The engine ([`ipv6::NeighborDiscovery`]) owns the neighbour cache and all
//! protocol state machines of a single node. It is driven by three kinds of
//! events, each processed to completion:
//!
//! - inbound ND messages ([`ipv6::NeighborDiscovery::recv`]),
//! - outbound datagrams ([`ipv6::NeighborDiscovery::send_datagram`]),
//! - timer expiry ([`ipv6::NeighborDiscovery::poll`]).
//!
//! Everything the engine wants to transmit is collected as [`ipv6::NdpOutput`]
//! and must be drained by the link layer.

pub mod error;
pub mod interface;
pub mod ipv6;
pub mod routing;

pub use inet_types as types;
