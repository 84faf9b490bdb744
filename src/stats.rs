//! Pool statistics and directory snapshots

use crate::allocator::block::BlockState;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Point-in-time summary of a pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub header_size: usize,
    /// Blocks in the directory, free and allocated
    pub block_count: usize,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
    /// Payload bytes handed out to clients
    pub allocated_bytes: usize,
    /// Payload bytes available in free blocks
    pub free_bytes: usize,
    pub largest_free_block: usize,
    /// 0.0 = all free space is one extent, approaching 1.0 = free space is scattered
    pub fragmentation: f64,
}

impl PoolStats {
    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Bytes spent on block headers
    pub fn header_bytes(&self) -> usize {
        self.block_count * self.header_size
    }
}

/// One entry of an address-ordered directory dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub offset: usize,
    pub payload_size: usize,
    pub state: BlockState,
}

/// Share of free bytes that lie outside the largest free block
pub(crate) fn fragmentation_score(free_bytes: usize, largest_free: usize) -> f64 {
    if free_bytes == 0 {
        return 0.0; // No free space = no fragmentation
    }

    1.0 - (largest_free as f64 / free_bytes as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragmentation_score() {
        assert_eq!(fragmentation_score(0, 0), 0.0);
        assert_eq!(fragmentation_score(500, 500), 0.0);
        assert!((fragmentation_score(400, 100) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_json() -> Result<()> {
        let stats = PoolStats {
            capacity: 1024,
            header_size: 16,
            block_count: 2,
            allocated_blocks: 1,
            free_blocks: 1,
            allocated_bytes: 100,
            free_bytes: 892,
            largest_free_block: 892,
            fragmentation: 0.0,
        };

        assert_eq!(stats.header_bytes(), 32);

        let json = stats.to_json()?;
        let parsed: PoolStats = serde_json::from_str(&json)?;
        assert_eq!(parsed, stats);
        Ok(())
    }
}
