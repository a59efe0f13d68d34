use std::{fmt, net::Ipv6Addr};

/// An IPv6 address assigned to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceAddr {
    pub addr: Ipv6Addr,
    pub prefix_len: u8,
    pub state: AddrState,
}

/// The RFC 4862 state of an assigned address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrState {
    /// Uniqueness is not yet verified. The address only accepts
    /// Neighbor Discovery traffic used for duplicate detection.
    Tentative,
    Preferred,
    /// Another node uses this address. It must not be used.
    Duplicated,
}

impl InterfaceAddr {
    #[must_use]
    pub fn tentative(addr: Ipv6Addr, prefix_len: u8) -> Self {
        Self {
            addr,
            prefix_len,
            state: AddrState::Tentative,
        }
    }

    #[must_use]
    pub fn preferred(addr: Ipv6Addr, prefix_len: u8) -> Self {
        Self {
            addr,
            prefix_len,
            state: AddrState::Preferred,
        }
    }

    #[must_use]
    pub fn is_tentative(&self) -> bool {
        self.state == AddrState::Tentative
    }

    #[must_use]
    pub fn is_preferred(&self) -> bool {
        self.state == AddrState::Preferred
    }
}

impl fmt::Display for InterfaceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inet6 {} prefixlen {}", self.addr, self.prefix_len)?;
        match self.state {
            AddrState::Tentative => write!(f, " (tentative)"),
            AddrState::Duplicated => write!(f, " (duplicated)"),
            AddrState::Preferred => Ok(()),
        }
    }
}
