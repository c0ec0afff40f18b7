//! Business-object identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rkyv::Archive;

/// Identity of a business object, equal to its primary key value.
///
/// Parent/child links inside a session are expressed as `ObjectId`s into the
/// session's object map rather than as references.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct ObjectId([u8; 16]);

impl ObjectId {
    /// Wrap raw id bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Generate a new id (UUID v4 layout, time ordered).
    pub fn generate() -> Self {
        // Keeps ids unique when two are generated in the same nanosecond
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

        let mut id = [0u8; 16];
        id[..8].copy_from_slice(&now.to_be_bytes());
        id[8..16].copy_from_slice(&counter.to_be_bytes());

        id[6] = (id[6] & 0x0f) | 0x40;
        id[8] = (id[8] & 0x3f) | 0x80;

        Self(id)
    }

    /// Parse a 32-character hex string.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s.replace('-', "")).ok()?;
        let bytes: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 16]> for ObjectId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..1000).map(|_| ObjectId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_hex_round_trip() {
        let id = ObjectId::generate();
        assert_eq!(ObjectId::parse_hex(&id.to_string()), Some(id));
        assert_eq!(ObjectId::parse_hex("not-hex"), None);
    }
}
