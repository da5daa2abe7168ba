use std::fmt::{Debug, Display};
use std::str::FromStr;

use digest::consts::U32;
use digest::Digest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utilities::encoding::{from_hex, to_hex};

pub type HashType = [u8; 32];

pub fn blake2_256(data: &[u8]) -> HashType {
    let mut dest = [0; 32];
    type Blake2b256 = blake2::Blake2b<U32>;
    dest.copy_from_slice(Blake2b256::digest(data).as_slice());
    dest
}

/// Hashes the concatenation of all parts, without any separators.
pub fn blake2_256_concat(parts: &[&[u8]]) -> HashType {
    type Blake2b256 = blake2::Blake2b<U32>;
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut dest = [0; 32];
    dest.copy_from_slice(hasher.finalize().as_slice());
    dest
}

/// Identifies a chain of entries. Messages of the same chain always end up in the same lane.
///
/// Serialized as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChainId(HashType);

impl ChainId {
    pub const LENGTH: usize = 32;

    pub const fn new(bytes: HashType) -> Self {
        Self(bytes)
    }

    /// Chain id with all bytes zero except the last one.
    ///
    /// Reserved chains are identified this way, for example `00..0a` for the admin chain.
    pub const fn from_low_byte(byte: u8) -> Self {
        let mut bytes = [0; 32];
        bytes[31] = byte;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<HashType> for ChainId {
    fn from(bytes: HashType) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ChainId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_hex(self.0))
    }
}

impl Debug for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChainId({self})")
    }
}

impl FromStr for ChainId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s)?;
        let bytes: HashType = bytes.try_into().map_err(|bytes: Vec<u8>| {
            anyhow::anyhow!(
                "Invalid chain id length: expected {} bytes, got {}",
                Self::LENGTH,
                bytes.len()
            )
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helper for `[u8; 32]` hashes as hex strings.
pub(crate) mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::HashType;
    use crate::utilities::encoding::{from_hex, to_hex};

    pub(crate) fn serialize<S: Serializer>(hash: &HashType, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(hash))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<HashType, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = from_hex(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))
    }
}
