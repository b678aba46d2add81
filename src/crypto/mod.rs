//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing
//! - secp256k1 key pairs that act as group owners
//! - The [`Signer`] trait used to pass identity explicitly into every call

pub mod hash;
pub mod keys;

pub use hash::{sha256, sha256_hex};
pub use keys::{
    public_key_from_address, sign_message, verify_signature, KeyError, KeyPair, Signature,
    Signer, SIGNATURE_LEN,
};
