//! Chunk checksums
//!
//! Provides [`ChunkHash`], a 32-byte Blake3 digest of a chunk's address and
//! canonical payload bytes.

use crate::error::CodecError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte Blake3 checksum of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChunkHash([u8; 32]);

impl ChunkHash {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash the parts of a chunk, separated so that address and payload
    /// cannot bleed into each other
    #[must_use]
    pub fn compute(address: &str, payload: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(address.as_bytes());
        hasher.update(&[0]);
        hasher.update(payload);
        Self(*hasher.finalize().as_bytes())
    }

    /// Short form for logs (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ChunkHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ChunkHash {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CodecError::InvalidChecksum(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CodecError::InvalidChecksum(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl serde::Serialize for ChunkHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ChunkHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_hex_round_trip() {
        let hash = ChunkHash::compute("items.1", b"{}");
        let parsed: ChunkHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(hash.short().len(), 16);
    }

    #[test]
    fn hash_depends_on_address_and_payload() {
        let base = ChunkHash::compute("items.1", b"{}");
        assert_ne!(base, ChunkHash::compute("items.2", b"{}"));
        assert_ne!(base, ChunkHash::compute("items.1", b"[]"));
    }

    #[test]
    fn hash_rejects_bad_hex() {
        assert!("zz".parse::<ChunkHash>().is_err());
        assert!("abcd".parse::<ChunkHash>().is_err());
    }

    #[test]
    fn hash_serializes_as_hex_string() {
        let hash = ChunkHash::compute("dialog", b"null");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let back: ChunkHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
