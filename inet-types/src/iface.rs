use std::{fmt::Display, net::Ipv6Addr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const NULL: MacAddress = MacAddress([0; 6]);

    pub const IPV6_MULTICAST: MacAddress = MacAddress([0x33, 0x33, 0, 0, 0, 0]);

    /// The link-layer group an IPv6 multicast address maps to (RFC 2464 §7).
    #[must_use]
    pub fn ipv6_multicast(ip: Ipv6Addr) -> MacAddress {
        let mut mac = MacAddress::IPV6_MULTICAST;
        mac.0[2..].copy_from_slice(&ip.octets()[12..]);
        mac
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        *self == MacAddress::NULL
    }

    /// Writes the modified EUI-64 interface identifier of this address into
    /// the lower 64 bits of `addr`.
    #[must_use]
    pub fn embed_into(&self, addr: Ipv6Addr) -> Ipv6Addr {
        let mut bytes = addr.octets();
        bytes[8..11].copy_from_slice(&self.as_slice()[..3]);
        bytes[8] ^= 0x02;
        bytes[11] = 0xff;
        bytes[12] = 0xfe;
        bytes[13..].copy_from_slice(&self.as_slice()[3..]);
        Ipv6Addr::from(bytes)
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(value: [u8; 6]) -> Self {
        MacAddress(value)
    }
}

impl From<MacAddress> for [u8; 6] {
    fn from(value: MacAddress) -> Self {
        value.0
    }
}

impl Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv6_embedding() {
        let linklocal = Ipv6Addr::new(0xfe80, 0x1, 0x2, 0x3, 0, 0, 0, 0);
        let mac = MacAddress::from([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        let embedded = mac.embed_into(linklocal);
        assert_eq!(
            embedded,
            Ipv6Addr::new(0xfe80, 0x1, 0x2, 0x3, 0x1322, 0x33ff, 0xfe44, 0x5566)
        );
    }

    #[test]
    fn ipv6_multicast_mac() {
        let dst = Ipv6Addr::new(0x2001, 0xffec, 0x3013, 0, 0, 0, 0x1234, 0x5678);
        let mac = MacAddress::ipv6_multicast(dst);
        assert_eq!(mac, MacAddress([0x33, 0x33, 0x12, 0x34, 0x56, 0x78]));
    }

    #[test]
    fn display_is_zero_padded() {
        let mac = MacAddress::from([0x0a, 0, 0x1b, 0x2c, 0x3d, 0x04]);
        assert_eq!(mac.to_string(), "0a:00:1b:2c:3d:04");
    }
}
