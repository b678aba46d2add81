//! Key management for group owners
//!
//! Owners are identified on the ledger by a 32-byte address. A [`KeyPair`]
//! uses the x-only form of its secp256k1 public key as that address; the
//! secret is normalised to even parity at construction so the full public
//! key can always be rebuilt from the address for verification.

use crate::core::Address;
use rand::rngs::OsRng;
use secp256k1::{Message, Parity, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::hash::sha256;

/// Size of a compact ECDSA signature
pub const SIGNATURE_LEN: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A compact ECDSA signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &hex::encode(&self.0[..8]))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Signature::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// The key-management seam: who is acting, and a way to sign for them
pub trait Signer {
    /// Ledger identity of the key holder
    fn identity(&self) -> Address;

    /// Sign an arbitrary message
    fn sign(&self, message: &[u8]) -> Result<Signature, KeyError>;
}

impl<T: Signer + ?Sized> Signer for &T {
    fn identity(&self) -> Address {
        (**self).identity()
    }

    fn sign(&self, message: &[u8]) -> Result<Signature, KeyError> {
        (**self).sign(message)
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, _) = secp.generate_keypair(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        let (_, parity) = public_key.x_only_public_key();

        // Odd-y keys are flipped so the x-only identity maps back to 0x02 || x
        let secret_key = if parity == Parity::Odd {
            secret_key.negate()
        } else {
            secret_key
        };
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);

        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// The owner address: x-only public key bytes
    pub fn address(&self) -> Address {
        let (x_only, _) = self.public_key.x_only_public_key();
        Address::new(x_only.serialize())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Signer for KeyPair {
    fn identity(&self) -> Address {
        self.address()
    }

    fn sign(&self, message: &[u8]) -> Result<Signature, KeyError> {
        sign_message(&self.secret_key, message)
    }
}

/// Rebuild the full public key behind an owner address
pub fn public_key_from_address(address: &Address) -> Result<PublicKey, KeyError> {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(address.as_bytes());
    PublicKey::from_slice(&compressed).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign the SHA-256 digest of a message
pub fn sign_message(secret_key: &SecretKey, message: &[u8]) -> Result<Signature, KeyError> {
    let secp = Secp256k1::new();
    let digest = Message::from_digest_slice(&sha256(message))?;
    let signature = secp.sign_ecdsa(&digest, secret_key);
    Ok(Signature(signature.serialize_compact()))
}

/// Verify a signature made by the owner of `address`
pub fn verify_signature(
    address: &Address,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let public_key = public_key_from_address(address)?;
    let digest = Message::from_digest_slice(&sha256(message))?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature.as_bytes())
        .map_err(|_| KeyError::InvalidSignature)?;

    match secp.verify_ecdsa(&digest, &sig, &public_key) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
