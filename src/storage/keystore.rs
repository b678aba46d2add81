//! Named key files
//!
//! Each owner key lives in `<dir>/<name>.json` together with the address it
//! derives, so a corrupted or swapped file is caught on load.

use super::StorageError;
use crate::core::{Address, Clock, SystemClock};
use crate::crypto::KeyPair;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serializable key data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    name: String,
    private_key_hex: String,
    address: Address,
    created_at: i64,
}

/// Directory of named owner keys
pub struct Keystore {
    dir: PathBuf,
}

impl Keystore {
    /// Open (and create if needed) a keystore directory
    pub fn new(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn key_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidData(format!("invalid key name {:?}", name)));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Generate and save a new key
    pub fn create(&self, name: &str) -> Result<KeyPair, StorageError> {
        let key_pair = KeyPair::generate();
        self.store(name, &key_pair)?;
        Ok(key_pair)
    }

    fn store(&self, name: &str, key_pair: &KeyPair) -> Result<(), StorageError> {
        let path = self.key_path(name)?;
        if path.exists() {
            return Err(StorageError::InvalidData(format!("key {} already exists", name)));
        }

        let file = KeyFile {
            name: name.to_string(),
            private_key_hex: key_pair.private_key_hex(),
            address: key_pair.address(),
            created_at: SystemClock.now(),
        };
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;

        log::info!("Stored key {} ({})", name, key_pair.address());
        Ok(())
    }

    /// Load a key by name
    pub fn load(&self, name: &str) -> Result<KeyPair, StorageError> {
        let path = self.key_path(name)?;
        if !path.exists() {
            return Err(StorageError::NotFound(format!("key {}", name)));
        }

        let file: KeyFile = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let key_pair = KeyPair::from_private_key_hex(&file.private_key_hex)?;
        if key_pair.address() != file.address {
            return Err(StorageError::InvalidData(format!(
                "key {} does not match its recorded address",
                name
            )));
        }
        Ok(key_pair)
    }
}
