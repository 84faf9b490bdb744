//! Pool configuration
//!
//! A pool is described by three numbers:
//! - **capacity**: size of the backing store in bytes (fixed for the pool's lifetime)
//! - **header_size**: per-block overhead reserved in the store ahead of each payload
//! - **min_split_remainder**: smallest payload a split may leave behind as a free block
//!
//! Configs can be built in code or loaded from TOML or JSON:
//!
//! ```toml
//! capacity = 65536
//! header_size = 16
//! min_split_remainder = 32
//! ```

use crate::error::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default smallest payload left behind by a split
pub const DEFAULT_MIN_SPLIT_REMAINDER: usize = 16;

/// Default per-block header overhead in the store
///
/// Zero keeps block headers entirely in the directory record, so a pool of
/// capacity `N` can hand out a single `N`-byte block.
pub const DEFAULT_HEADER_SIZE: usize = 0;

/// Configuration for a [`Pool`](crate::Pool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Backing store size in bytes
    pub capacity: usize,

    /// Bytes reserved in front of every payload
    pub header_size: usize,

    /// Smallest payload a split may produce for the free remainder
    pub min_split_remainder: usize,
}

impl PoolConfig {
    /// Create a config with the given capacity and default block layout
    pub fn new(capacity: usize) -> Self {
        PoolConfig {
            capacity,
            ..Self::default()
        }
    }

    /// Set the per-block header overhead
    pub fn with_header_size(mut self, header_size: usize) -> Self {
        self.header_size = header_size;
        self
    }

    /// Set the minimum split remainder
    pub fn with_min_split_remainder(mut self, min_split_remainder: usize) -> Self {
        self.min_split_remainder = min_split_remainder;
        self
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON text and validate it
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PoolConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate all fields
    ///
    /// Checks:
    /// - Capacity is positive
    /// - The first block's header fits in the store
    /// - A split leaves at least one usable byte behind
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(PoolError::InvalidCapacity(self.capacity));
        }

        if self.min_split_remainder == 0 {
            return Err(PoolError::InvalidConfig(
                "min_split_remainder must be at least 1".to_string(),
            ));
        }

        if self.header_size > self.capacity {
            return Err(PoolError::InvalidConfig(format!(
                "header size {} exceeds capacity {}",
                self.header_size, self.capacity
            )));
        }

        Ok(())
    }

    /// Bytes a split must leave over, beyond the request, to carve a new free block
    pub(crate) fn split_threshold(&self) -> usize {
        self.header_size.saturating_add(self.min_split_remainder)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            capacity: 0,
            header_size: DEFAULT_HEADER_SIZE,
            min_split_remainder: DEFAULT_MIN_SPLIT_REMAINDER,
        }
    }
}
