//! Block allocation over a fixed-capacity backing store
//!
//! - [`pool::Pool`] - single-owner allocator (no synchronization)
//! - [`shared::SharedPool`] - one coarse lock around a `Pool`
//! - [`directory::BlockDirectory`] - address-ordered block chain both build on

pub mod block;
pub mod directory;
pub mod pool;
pub mod shared;

use crate::allocator::block::BlockHandle;
use crate::error::Result;

/// Block allocator trait
///
/// Defines the interface clients use to obtain and release payload blocks.
pub trait BlockAllocator {
    /// Allocate a block with at least `size` payload bytes
    fn allocate(&mut self, size: usize) -> Result<BlockHandle>;

    /// Free a previously allocated block (`None` is a no-op)
    fn free(&mut self, handle: Option<BlockHandle>) -> Result<()>;

    /// Grow or keep a block, returning the handle that now holds its contents
    fn resize(&mut self, handle: Option<BlockHandle>, new_size: usize) -> Result<BlockHandle>;

    /// Size of the backing store in bytes
    fn capacity(&self) -> usize;

    /// Payload bytes currently available in free blocks
    fn free_bytes(&self) -> usize;

    /// Calculate fragmentation score (0.0 = no fragmentation, higher = more fragmented)
    fn fragmentation_score(&self) -> f64;
}

impl BlockAllocator for pool::Pool {
    fn allocate(&mut self, size: usize) -> Result<BlockHandle> {
        pool::Pool::allocate(self, size)
    }

    fn free(&mut self, handle: Option<BlockHandle>) -> Result<()> {
        pool::Pool::free(self, handle)
    }

    fn resize(&mut self, handle: Option<BlockHandle>, new_size: usize) -> Result<BlockHandle> {
        pool::Pool::resize(self, handle, new_size)
    }

    fn capacity(&self) -> usize {
        pool::Pool::capacity(self)
    }

    fn free_bytes(&self) -> usize {
        pool::Pool::free_bytes(self)
    }

    fn fragmentation_score(&self) -> f64 {
        pool::Pool::fragmentation_score(self)
    }
}

#[cfg(test)]
mod tests {
    use super::pool::Pool;
    use super::shared::SharedPool;
    use super::*;
    use crate::config::PoolConfig;

    fn churn<A: BlockAllocator>(alloc: &mut A) -> Result<()> {
        let a = alloc.allocate(100)?;
        let b = alloc.allocate(100)?;
        let c = alloc.resize(Some(a), 150)?;
        alloc.free(Some(b))?;
        alloc.free(Some(c))?;
        alloc.free(None)?;
        Ok(())
    }

    #[test]
    fn test_pool_via_trait() -> Result<()> {
        let mut pool = Pool::new(1024)?;
        churn(&mut pool)?;
        assert_eq!(BlockAllocator::free_bytes(&pool), 1024);
        assert_eq!(BlockAllocator::fragmentation_score(&pool), 0.0);
        Ok(())
    }

    #[test]
    fn test_shared_pool_via_trait() -> Result<()> {
        let mut shared = SharedPool::new();
        shared.initialize(PoolConfig::new(1024))?;
        churn(&mut shared)?;
        assert_eq!(BlockAllocator::capacity(&shared), 1024);
        assert_eq!(BlockAllocator::free_bytes(&shared), 1024);
        Ok(())
    }
}
