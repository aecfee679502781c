//! Identifiers and records held by the registry.

use crate::lifecycle::{Durations, LifecycleStatus};
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failure to parse a hex-encoded identifier, including a wrong length.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] alloy::hex::FromHexError),
}

/// One-way hash of a raw phone number. Primary key of the registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneHash(pub(crate) B256);

impl PhoneHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl From<[u8; 32]> for PhoneHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }
}

impl FromStr for PhoneHash {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl TryFrom<String> for PhoneHash {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PhoneHash> for String {
    fn from(hash: PhoneHash) -> Self {
        hash.to_string()
    }
}

impl fmt::Display for PhoneHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&alloy::hex::encode_prefixed(self.0))
    }
}

impl fmt::Debug for PhoneHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhoneHash({})", self)
    }
}

/// A 20-byte account identity (owner, signer, resolver target).
///
/// Rendered as lowercase hex, not EIP-55.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub(crate) alloy::primitives::Address);

impl Address {
    pub const ZERO: Address = Address(alloy::primitives::Address::ZERO);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0 .0 .0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(alloy::primitives::Address::new(bytes))
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl TryFrom<String> for Address {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&alloy::hex::encode_prefixed(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// A phone record. Replaced wholesale on create and claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Registry key, never changes
    pub phone_hash: PhoneHash,

    /// Identity allowed to renew and link resolvers
    pub owner: Address,

    /// Label of the primary resolver entry (e.g. "ETH")
    pub label: String,

    /// Unix seconds of the last create, renew or claim
    pub created_at: u64,

    /// Durations pinned at write time; `None` means read live from config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<Durations>,
}

/// An address binding attached to a record. Order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverEntry {
    /// Position assigned when the entry was appended
    pub slot: u32,

    /// Bound address
    pub address: Address,

    /// Human-readable tag (network or currency code)
    pub label: String,
}

/// Read model for a record, with lifecycle flags evaluated at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub phone_hash: PhoneHash,
    pub owner: Address,
    pub label: String,
    pub created_at: u64,
    pub exists: bool,
    pub status: LifecycleStatus,

    /// Sticky: true once nominal expiry has been reached, including after grace
    pub in_grace: bool,

    /// True once expiry plus grace has passed and the record is claimable
    pub expired: bool,

    pub expires_at: u64,
    pub grace_ends_at: u64,
}
