//! Errors surfaced by the Neighbor Discovery engine.

use std::{error, fmt, io, net::Ipv6Addr};

use crate::interface::IfId;

pub type Result<T> = std::result::Result<T, NdpError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdpError {
    /// Duplicate address detection found another node using `addr`.
    ///
    /// The address was marked as duplicated and will not be used. There is
    /// no automatic recovery.
    DuplicateAddress { addr: Ipv6Addr, ifid: IfId },
    /// A neighbour entry for this key already exists.
    NeighborExists { addr: Ipv6Addr, ifid: IfId },
    /// No neighbour entry exists for this key.
    UnknownNeighbor { addr: Ipv6Addr, ifid: IfId },
    UnknownInterface(IfId),
}

impl fmt::Display for NdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateAddress { addr, ifid } => {
                write!(f, "duplicate address {addr} detected on {ifid}")
            }
            Self::NeighborExists { addr, ifid } => {
                write!(f, "neighbor {addr} on {ifid} allready exists")
            }
            Self::UnknownNeighbor { addr, ifid } => {
                write!(f, "no neighbor {addr} on {ifid}")
            }
            Self::UnknownInterface(ifid) => write!(f, "no interface found under id {ifid}"),
        }
    }
}

impl error::Error for NdpError {}

impl From<NdpError> for io::Error {
    fn from(value: NdpError) -> Self {
        let kind = match value {
            NdpError::DuplicateAddress { .. } => io::ErrorKind::AddrInUse,
            NdpError::NeighborExists { .. } => io::ErrorKind::AlreadyExists,
            NdpError::UnknownNeighbor { .. } | NdpError::UnknownInterface(_) => {
                io::ErrorKind::NotFound
            }
        };
        io::Error::new(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds() {
        let ifid = IfId::new("en0");
        let err = io::Error::from(NdpError::DuplicateAddress {
            addr: Ipv6Addr::LOCALHOST,
            ifid,
        });
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
        assert_eq!(err.to_string(), "duplicate address ::1 detected on en0");

        let err = io::Error::from(NdpError::UnknownInterface(ifid));
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
