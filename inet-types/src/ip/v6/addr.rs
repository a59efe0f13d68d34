use std::{
    error, fmt,
    net::{AddrParseError, Ipv6Addr},
    num::ParseIntError,
    str::FromStr,
};

pub trait Ipv6AddrExt {
    const LINK_LOCAL: Ipv6Addr = Ipv6Prefix::LINK_LOCAL.addr();
    const MULTICAST_ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);
    const MULTICAST_ALL_ROUTERS: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 2);

    /// The solicited-node multicast group `ff02::1:ffXX:XXXX` of `addr`.
    fn solicited_node_multicast(addr: Ipv6Addr) -> Self;

    fn is_link_local(&self) -> bool;

    fn is_solicited_node_multicast(&self) -> bool;
}

impl Ipv6AddrExt for Ipv6Addr {
    fn solicited_node_multicast(addr: Ipv6Addr) -> Self {
        let mut bytes = [0; 16];
        bytes[0] = 0xff;
        bytes[1] = 0x02;
        // pad
        bytes[11] = 0x01;
        bytes[12] = 0xff;
        bytes[13..].copy_from_slice(&addr.octets()[13..]);
        Ipv6Addr::from(bytes)
    }

    fn is_link_local(&self) -> bool {
        Ipv6Prefix::LINK_LOCAL.contains(*self)
    }

    fn is_solicited_node_multicast(&self) -> bool {
        Ipv6Prefix::SOLICITED_NODE.contains(*self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv6Prefix {
    addr: Ipv6Addr,
    len: u8,
}

impl Ipv6Prefix {
    pub const LINK_LOCAL: Ipv6Prefix =
        Ipv6Prefix::new_unchecked(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 64);
    pub const SOLICITED_NODE: Ipv6Prefix =
        Ipv6Prefix::new_unchecked(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 1, 0xff00, 0), 104);

    /// Creates a new prefix, masking out all host bits of `prefix`.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds 128.
    #[must_use]
    pub fn new(prefix: Ipv6Addr, len: u8) -> Self {
        assert!(len <= 128);
        let prefix = Ipv6Addr::from(u128::from(prefix) & Self::mask_of(len));
        Self::new_unchecked(prefix, len)
    }

    /// Like [`Ipv6Prefix::new`] but rejects lengths above 128.
    #[must_use]
    pub fn try_new(prefix: Ipv6Addr, len: u8) -> Option<Self> {
        (len <= 128).then(|| Self::new(prefix, len))
    }

    #[inline]
    const fn new_unchecked(prefix: Ipv6Addr, len: u8) -> Self {
        Self { addr: prefix, len }
    }

    #[must_use]
    pub const fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> u8 {
        self.len
    }

    #[inline]
    fn mask_of(len: u8) -> u128 {
        if len == 0 {
            0
        } else {
            u128::MAX << (128 - u32::from(len))
        }
    }

    #[must_use]
    pub fn contains(&self, addr: Ipv6Addr) -> bool {
        u128::from(addr) & Self::mask_of(self.len) == u128::from(self.addr)
    }
}

impl fmt::Debug for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl fmt::Display for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

impl FromStr for Ipv6Prefix {
    type Err = Ipv6PrefixParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((prefix, len)) = s.split_once('/') else {
            return Err(Ipv6PrefixParsingError::MissingPrefixLen);
        };
        let prefix = prefix
            .parse()
            .map_err(Ipv6PrefixParsingError::AddrParseError)?;
        let len = len.parse().map_err(Ipv6PrefixParsingError::ParseIntError)?;
        Self::try_new(prefix, len).ok_or(Ipv6PrefixParsingError::PrefixLenOutOfRange(len))
    }
}

/// A table of prefixes, sorted so that longer prefixes are visited first.
///
/// A prefix may appear more than once. Entries of the same prefix are told
/// apart by the predicate passed to [`insert_by`](Self::insert_by),
/// [`get_by`](Self::get_by) and [`remove_by`](Self::remove_by).
#[derive(Debug, Clone)]
pub struct Ipv6LongestPrefixTable<E> {
    inner: Vec<(Ipv6Prefix, E)>,
}

impl<E> Ipv6LongestPrefixTable<E> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Inserts an entry, replacing the entry of an equal prefix that
    /// satisfies `same`.
    pub fn insert_by(
        &mut self,
        prefix: Ipv6Prefix,
        entry: E,
        same: impl Fn(&E) -> bool,
    ) -> Option<E> {
        if let Some(existing) = self.get_mut_by(prefix, &same) {
            return Some(std::mem::replace(existing, entry));
        }
        // after all entries of equal length
        let idx = self.inner.partition_point(|v| v.0.len() >= prefix.len());
        self.inner.insert(idx, (prefix, entry));
        None
    }

    pub fn remove_by(&mut self, prefix: Ipv6Prefix, f: impl Fn(&E) -> bool) -> Option<E> {
        let idx = self
            .inner
            .iter()
            .position(|(key, entry)| *key == prefix && f(entry))?;
        Some(self.inner.remove(idx).1)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&Ipv6Prefix, &E) -> bool) {
        self.inner.retain(|(prefix, entry)| f(prefix, entry));
    }

    #[must_use]
    pub fn get_by(&self, prefix: Ipv6Prefix, f: impl Fn(&E) -> bool) -> Option<&E> {
        self.inner
            .iter()
            .find_map(|(key, entry)| (*key == prefix && f(entry)).then_some(entry))
    }

    fn get_mut_by(&mut self, prefix: Ipv6Prefix, f: impl Fn(&E) -> bool) -> Option<&mut E> {
        self.inner
            .iter_mut()
            .find_map(|(key, entry)| (*key == prefix && f(entry)).then_some(entry))
    }

    /// The longest prefix containing `addr` whose entry satisfies `f`.
    pub fn lookup_by(&self, addr: Ipv6Addr, f: impl Fn(&E) -> bool) -> Option<&E> {
        self.inner.iter().find_map(|(prefix, entry)| {
            if prefix.contains(addr) && f(entry) {
                Some(entry)
            } else {
                None
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Ipv6Prefix, E)> {
        self.inner.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<E> Default for Ipv6LongestPrefixTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ipv6PrefixParsingError {
    MissingPrefixLen,
    PrefixLenOutOfRange(u8),
    AddrParseError(AddrParseError),
    ParseIntError(ParseIntError),
}

impl fmt::Display for Ipv6PrefixParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl error::Error for Ipv6PrefixParsingError {}
