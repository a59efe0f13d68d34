use std::net::Ipv6Addr;

mod addr;
pub use addr::*;

/// An IPv6 datagram with an opaque payload.
///
/// Encoding is left to the link layer, so the payload is kept as raw bytes
/// and moved, never copied, between queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ipv6Packet {
    pub traffic_class: u8,
    pub flow_label: u32, // u20
    pub next_header: u8,
    pub hop_limit: u8,

    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,

    pub content: Vec<u8>,
}

impl Ipv6Packet {
    /// Header length without extension headers.
    pub const HEADER_LEN: usize = 40;

    #[must_use]
    pub fn new(src: Ipv6Addr, dst: Ipv6Addr, next_header: u8, content: Vec<u8>) -> Self {
        Self {
            traffic_class: 0,
            flow_label: 0,
            next_header,
            hop_limit: 64,
            src,
            dst,
            content,
        }
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        Self::HEADER_LEN + self.content.len()
    }
}
