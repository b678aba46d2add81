//! Storage module for ledger snapshots and owner keys

pub mod keystore;
pub mod persistence;

pub use keystore::Keystore;
pub use persistence::{LedgerStorage, StorageConfig, StorageStats};

use crate::crypto::KeyError;
use std::io;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}
