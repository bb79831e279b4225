//! Configuration for RowStore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, RowError};

/// Directory flag value that selects in-memory buckets
pub const MEMORY_DIRECTORY: &str = ":memory:";

/// Main configuration for a RowStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Bucket names served by this instance (ASCII letters only)
    pub buckets: Vec<String>,

    /// Where bucket data lives
    /// File layout for `StorageMode::Directory(dir)`:
    ///   {dir}/
    ///     ├── {bucket_a}      (one database file per bucket)
    ///     └── {bucket_b}
    pub storage: StorageMode,

    /// How long to wait for the exclusive lock on a bucket file
    pub file_lock_timeout: Duration,

    // -------------------------------------------------------------------------
    // Scan Configuration
    // -------------------------------------------------------------------------
    /// Deadline applied to every served scan. Zero means unbounded.
    pub scan_timeout: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Volatile in-memory buckets
    Memory,

    /// Durable buckets rooted at a directory
    Directory(PathBuf),
}

impl StorageMode {
    /// Interpret a `--dir` style flag, where `:memory:` selects volatile storage
    pub fn from_flag(flag: &str) -> Self {
        if flag == MEMORY_DIRECTORY {
            StorageMode::Memory
        } else {
            StorageMode::Directory(PathBuf::from(flag))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buckets: vec!["default".to_string()],
            storage: StorageMode::Memory,
            file_lock_timeout: Duration::from_secs(10),
            scan_timeout: Duration::ZERO,
            listen_addr: "0.0.0.0:8234".to_string(),
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Scan deadline as an option (None when unbounded)
    pub fn scan_deadline(&self) -> Option<Duration> {
        if self.scan_timeout.is_zero() {
            None
        } else {
            Some(self.scan_timeout)
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the served bucket names
    pub fn buckets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.buckets = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the storage mode
    pub fn storage(mut self, storage: StorageMode) -> Self {
        self.config.storage = storage;
        self
    }

    /// Store buckets as files under the given directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage = StorageMode::Directory(path.into());
        self
    }

    /// Set the bucket file lock timeout
    pub fn file_lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.file_lock_timeout = timeout;
        self
    }

    /// Set the scan deadline (zero for none)
    pub fn scan_timeout(mut self, timeout: Duration) -> Self {
        self.config.scan_timeout = timeout;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Bucket Names
// =============================================================================

/// Check that a bucket name is non-empty and made only of ASCII letters
pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RowError::Config("empty bucket name".to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(RowError::Config(format!(
            "invalid bucket name {}: must contain a-z A-Z",
            name
        )));
    }
    Ok(())
}

/// Split a comma-separated bucket list, validating every name
pub fn parse_bucket_names(list: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for name in list.split(',') {
        validate_bucket_name(name)?;
        if names.iter().any(|seen| seen == name) {
            return Err(duplicate_bucket(name));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Error for a bucket name given more than once
pub fn duplicate_bucket(name: &str) -> RowError {
    RowError::Config(format!("duplicate bucket name {}", name))
}
