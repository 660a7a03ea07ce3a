use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use hex::{encode as hex_encode, decode as hex_decode};
use anyhow::Result;

/// 32-byte hash: tx id, block hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 32]);

    pub fn from_bytes(b: [u8; 32]) -> Self { Hash(b) }
    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }
    pub fn to_hex(&self) -> String { hex_encode(self.0) }

    /// Test/fixture helper: hash dengan semua byte = `b`.
    pub fn repeat(b: u8) -> Self { Hash([b; 32]) }

    /// Short form untuk log.
    pub fn short(&self) -> String { hex_encode(&self.0[..4]) }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash").field(&self.short()).finish()
    }
}

impl FromStr for Hash {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let v = hex_decode(s)?;
        if v.len() != 32 { anyhow::bail!("invalid hash length: {}", v.len()); }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&v);
        Ok(Hash(arr))
    }
}

/* serde impls for Hash as hex string */
impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.serialize_str(&self.to_hex())
    }
}
impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Hash, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        Hash::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub type TxId = Hash;
pub type BlockHash = Hash;

/// (tx id, output index). Unspent index menyimpan maksimal satu entry per key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxOutputKey {
    pub tx_id: TxId,
    pub index: u32,
}

impl TxOutputKey {
    pub fn new(tx_id: TxId, index: u32) -> Self { Self { tx_id, index } }
}

impl fmt::Display for TxOutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}
impl fmt::Debug for TxOutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id.short(), self.index)
    }
}

/// Token base units carry 2 decimals.
pub const DECIMALS: u32 = 2;
pub const SCALE: u64 = 10u64.pow(DECIMALS);

/// 100.00% in basis points.
pub const PERCENT_SCALE: u64 = 10_000;
