//! Client configuration
//!
//! Read from `<data_dir>/config.json` when present; every field has a
//! default, and command-line flags override what the file says.

use crate::core::Address;
use crate::crypto::sha256;
use crate::storage::{StorageConfig, StorageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Program id used when none is configured
pub fn default_program_id() -> Address {
    let digest = sha256(b"quorum-auth/authorization-program");
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Address::new(bytes)
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Authorization program that owns group and record addresses
    pub program_id: Address,
    /// Root directory for ledger snapshots and keys
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Ledger snapshot file name
    pub ledger_file: String,
    /// Key directory, relative to `data_dir`
    pub key_dir: String,
    /// Lifetime for proposals made without an explicit expiry
    pub default_ttl_secs: Option<i64>,
    /// Ledger snapshot backups to keep
    pub max_backups: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            data_dir: PathBuf::from(".quorum"),
            ledger_file: "ledger.json".to_string(),
            key_dir: "keys".to_string(),
            default_ttl_secs: None,
            max_backups: 5,
        }
    }
}

impl ClientConfig {
    /// Load `<data_dir>/config.json`, falling back to defaults
    pub fn load(data_dir: &Path) -> Result<Self, StorageError> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            log::debug!("Loading configuration from {:?}", path);
            serde_json::from_str::<ClientConfig>(&fs::read_to_string(&path)?)?
        } else {
            ClientConfig::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Write the configuration to `<data_dir>/config.json`
    pub fn save(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(
            self.data_dir.join(CONFIG_FILE),
            serde_json::to_string_pretty(self)?,
        )?;
        Ok(())
    }

    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join(&self.key_dir)
    }

    /// Ledger storage settings derived from this configuration
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            data_dir: self.data_dir.clone(),
            ledger_file: self.ledger_file.clone(),
            backup_enabled: self.max_backups > 0,
            max_backups: self.max_backups,
        }
    }
}
