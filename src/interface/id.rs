use std::{
    collections::hash_map,
    fmt,
    hash::{Hash, Hasher},
};

/// A compact interface identifier derived from an interface name.
///
/// The first seven bytes hold a prefix of the name, the last byte a hash of
/// the full name. Ordering follows the byte representation, so tables keyed by
/// `IfId` iterate in a stable order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfId {
    // byte 0..7 prefix
    // byte 7 hash
    bytes: [u8; 8],
}

impl IfId {
    pub const NULL: Self = Self { bytes: [0; 8] };

    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut bytes = [0u8; 8];
        let len = name.len().min(7);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);

        let mut hasher = hash_map::DefaultHasher::new();
        name.hash(&mut hasher);
        let result = hasher.finish();

        // Subtract 48 to ensure that Id::new("") is [0; 8]
        bytes[7] = result.to_be_bytes()[0].wrapping_sub(48);

        Self { bytes }
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        Self::new(name) == *self
    }
}

impl fmt::Display for IfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Debug>::fmt(self, f)
    }
}

impl fmt::Debug for IfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = &self.bytes[..7];
        let len = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        write!(f, "{}", String::from_utf8_lossy(&bytes[..len]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_name_prefix() {
        assert_eq!(IfId::new("en0").to_string(), "en0");
        assert_eq!(IfId::new("ethernet-long").to_string(), "etherne");
        assert!(IfId::new("en0").matches("en0"));
        assert_ne!(IfId::new("en0"), IfId::new("en1"));
    }
}
