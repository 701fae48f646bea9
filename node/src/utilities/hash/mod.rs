use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use blake2::Blake2b;
use digest::consts::U32;
use digest::Digest;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utilities::encoding::{encode, from_hex, to_hex};

type Blake2b256 = Blake2b<U32>;

pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut dest = [0; 32];
    dest.copy_from_slice(Blake2b256::digest(data).as_slice());
    dest
}

/// 32 byte digest rendered as lowercase hex without prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct HashType([u8; 32]);

impl HashType {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn inner(&self) -> [u8; 32] {
        self.0
    }

    pub(crate) fn digest(data: &[u8]) -> Self {
        Self(blake2_256(data))
    }
}

impl Display for HashType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_hex(self.0))
    }
}

impl Debug for HashType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_hex(self.0))
    }
}

impl FromStr for HashType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("Hash must be 32 bytes: {s}"))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for HashType {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for HashType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HashType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Hasher over the canonical byte encoding shared by all list hashes of a block.
///
/// Every item is encoded as JSON and prefixed with its length as big-endian `u64`,
/// so that two different lists can't produce the same byte stream.
pub(crate) struct CanonicalHasher {
    inner: Blake2b256,
}

impl CanonicalHasher {
    pub(crate) fn new() -> Self {
        Self {
            inner: Blake2b256::new(),
        }
    }

    pub(crate) fn update_raw(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub(crate) fn update_item<T: Serialize>(&mut self, item: &T) -> anyhow::Result<()> {
        let bytes = encode(item)?;
        self.inner.update((bytes.len() as u64).to_be_bytes());
        self.inner.update(&bytes);
        Ok(())
    }

    pub(crate) fn finish(self) -> HashType {
        let mut dest = [0; 32];
        dest.copy_from_slice(self.inner.finalize().as_slice());
        HashType(dest)
    }
}

/// Hash of an ordered list. The element count goes first.
pub(crate) fn hash_list<T: Serialize>(items: &[T]) -> anyhow::Result<HashType> {
    let mut hasher = CanonicalHasher::new();
    hasher.update_raw(&(items.len() as u64).to_be_bytes());
    for item in items {
        hasher.update_item(item)?;
    }
    Ok(hasher.finish())
}

pub(crate) fn hash_value<T: Serialize>(value: &T) -> anyhow::Result<HashType> {
    let mut hasher = CanonicalHasher::new();
    hasher.update_item(value)?;
    Ok(hasher.finish())
}
