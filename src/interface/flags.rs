use std::fmt;

/// Flags indicating the state and capabilities of a network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InterfaceFlags {
    /// Whether the interface is connected
    pub up: bool,
    /// Whether the interface is the loopback interface
    pub loopback: bool,
    /// Whether the interface supports multicast
    pub multicast: bool,
    /// Wether the interface exclusivly allows point-to-point traffic
    pub p2p: bool,
}

impl InterfaceFlags {
    /// The flags for the loopback interface
    #[must_use]
    pub const fn loopback() -> Self {
        Self {
            up: true,
            loopback: true,
            multicast: true,
            p2p: false,
        }
    }

    /// The flags for a multicast capable broadcast link
    #[must_use]
    pub const fn en0() -> Self {
        Self {
            up: true,
            loopback: false,
            multicast: true,
            p2p: false,
        }
    }

    /// The flags for a point-to-point link
    #[must_use]
    pub const fn p2p() -> Self {
        Self {
            up: true,
            loopback: false,
            multicast: false,
            p2p: true,
        }
    }
}

impl fmt::Display for InterfaceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.up {
            names.push("UP");
        }
        if self.loopback {
            names.push("LOOPBACK");
        }
        if self.multicast {
            names.push("MULTICAST");
        }
        if self.p2p {
            names.push("POINTTOPOINT");
        }
        write!(f, "flags=<{}>", names.join(","))
    }
}
