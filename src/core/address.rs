//! Ledger addresses and deterministic address derivation
//!
//! Every account the authorization program touches is identified by a
//! 32-byte [`Address`]. Group and action record accounts are never
//! generated randomly: their addresses are derived from fixed seeds so any
//! reader can locate them from the creator, nonce and action index alone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Size of an address in bytes
pub const ADDRESS_LEN: usize = 32;

/// Seed tag for authorization group accounts
pub const GROUP_SEED: &[u8] = b"multisig";

/// Seed tag for action record accounts
pub const ACTION_SEED: &[u8] = b"transaction";

/// Marker appended to every derivation so derived addresses never collide
/// with plain SHA-256 outputs of the same bytes
const DERIVATION_MARKER: &[u8] = b"ProgramDerivedAddress";

// =============================================================================
// Address
// =============================================================================

/// Errors when parsing an address from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid base58 address: {0}")]
    InvalidEncoding(String),
    #[error("Invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// A 32-byte account identifier
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice that must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let array: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    /// Random address, used for throwaway identities
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    /// First 8 base58 characters, for log lines
    pub fn short(&self) -> String {
        let full = self.to_string();
        full.chars().take(8).collect()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// Derive an address from seeds and the owning program id
///
/// Address = SHA256(len(seed_0) || seed_0 || ... || program_id || marker)
/// with each length a 4-byte little-endian prefix, so different seed splits
/// of the same bytes never produce the same address.
pub fn derive_address(seeds: &[&[u8]], program_id: &Address) -> Address {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update((seed.len() as u32).to_le_bytes());
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(DERIVATION_MARKER);

    let digest = hasher.finalize();
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest);
    Address(bytes)
}

/// Address of the authorization group created by `creator` with `nonce`
pub fn derive_group_address(creator: &Address, nonce: u64, program_id: &Address) -> Address {
    derive_address(
        &[GROUP_SEED, creator.as_ref(), &nonce.to_le_bytes()],
        program_id,
    )
}

/// Address of the action record at `action_index` under `group`
pub fn derive_action_address(group: &Address, action_index: u64, program_id: &Address) -> Address {
    derive_address(
        &[ACTION_SEED, group.as_ref(), &action_index.to_le_bytes()],
        program_id,
    )
}
