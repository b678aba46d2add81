//! Ledger persistence layer
//!
//! Saves and loads the local ledger's accounts as a JSON snapshot. Writes go
//! to a temporary file first and are renamed into place; the previous
//! snapshot is rotated into numbered backups.

use super::StorageError;
use crate::core::{Address, Clock, SystemClock};
use crate::ledger::LedgerState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".quorum"),
            ledger_file: "ledger.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// On-disk form of a ledger snapshot
#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    program_id: Address,
    saved_at: i64,
    state: LedgerState,
}

/// Ledger snapshot storage
pub struct LedgerStorage {
    config: StorageConfig,
}

impl LedgerStorage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn ledger_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.ledger_file)
    }

    fn temp_path(&self) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.tmp", self.config.ledger_file))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.ledger_file, index))
    }

    /// Save a ledger snapshot for `program_id`
    pub fn save(&self, program_id: &Address, state: &LedgerState) -> Result<(), StorageError> {
        let path = self.ledger_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = self.temp_path();
        let writer = BufWriter::new(fs::File::create(&temp_path)?);
        let file = LedgerFile {
            program_id: *program_id,
            saved_at: SystemClock.now(),
            state: state.clone(),
        };
        serde_json::to_writer_pretty(writer, &file)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!(
            "Saved ledger snapshot ({} accounts) to {:?}",
            state.accounts.len(),
            path
        );
        Ok(())
    }

    /// Load the saved snapshot; it must belong to `program_id`
    pub fn load(&self, program_id: &Address) -> Result<LedgerState, StorageError> {
        let path = self.ledger_path();
        if !path.exists() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        self.read(&path, program_id)
    }

    /// Load the saved snapshot, or start empty when none exists
    pub fn load_or_default(&self, program_id: &Address) -> Result<LedgerState, StorageError> {
        if self.exists() {
            self.load(program_id)
        } else {
            log::info!("No ledger snapshot in {:?}, starting empty", self.config.data_dir);
            Ok(LedgerState::default())
        }
    }

    fn read(&self, path: &Path, program_id: &Address) -> Result<LedgerState, StorageError> {
        let reader = BufReader::new(fs::File::open(path)?);
        let file: LedgerFile = serde_json::from_reader(reader)?;

        if file.program_id != *program_id {
            return Err(StorageError::InvalidData(format!(
                "snapshot belongs to program {}, expected {}",
                file.program_id, program_id
            )));
        }
        Ok(file.state)
    }

    /// Check if a saved snapshot exists
    pub fn exists(&self) -> bool {
        self.ledger_path().exists()
    }

    /// Delete the saved snapshot
    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.ledger_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Load a backup; 0 is the most recent
    pub fn restore_backup(
        &self,
        backup_index: usize,
        program_id: &Address,
    ) -> Result<LedgerState, StorageError> {
        let path = self.backup_path(backup_index);
        if !path.exists() {
            return Err(StorageError::NotFound(format!("backup {}", backup_index)));
        }
        self.read(&path, program_id)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.ledger_path();
        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}
