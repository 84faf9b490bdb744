//! Fixed-capacity first-fit pool
//!
//! A [`Pool`] owns one backing store and the block directory that partitions
//! it. Every operation runs synchronously against the directory:
//!
//! - **allocate**: first-fit scan in address order, split when the leftover
//!   can host a header plus the minimum remainder
//! - **free**: mark free, merge the following block if free, then merge into
//!   the preceding block if free
//! - **resize**: keep the block if it is big enough, grow in place into a free
//!   successor, or relocate (allocate, copy, free)
//!
//! ```text
//!   allocate(200) x3                 free(A) free(C) free(B)
//!   ┌─────┬─────┬─────┬────────┐     ┌──────────────────────────┐
//!   │  A  │  B  │  C  │  free  │ ──▶ │           free           │
//!   └─────┴─────┴─────┴────────┘     └──────────────────────────┘
//! ```

use crate::allocator::block::{Block, BlockHandle, SlotId};
use crate::allocator::directory::BlockDirectory;
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::stats::{self, BlockInfo, PoolStats};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

/// Identifies the pool lifetime that issued a handle
static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Single-owner allocator over a fixed-capacity byte store
#[derive(Debug)]
pub struct Pool {
    id: u32,
    config: PoolConfig,
    store: Vec<u8>,
    directory: BlockDirectory,
}

impl Pool {
    /// Initialize a pool of `capacity` bytes with the default block layout
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(capacity))
    }

    /// Initialize a pool from a config
    ///
    /// The whole store is acquired up front and covered by a single free
    /// block. Fails with [`PoolError::StoreUnavailable`] if the store cannot
    /// be acquired; no partially initialized pool is ever returned.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let mut store = Vec::new();
        store
            .try_reserve_exact(config.capacity)
            .map_err(|_| PoolError::StoreUnavailable {
                capacity: config.capacity,
            })?;
        store.resize(config.capacity, 0);

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Initialized pool {} with {} bytes (header {}, min split remainder {})",
            id, config.capacity, config.header_size, config.min_split_remainder
        );

        Ok(Pool {
            id,
            config,
            store,
            directory: BlockDirectory::new(config.capacity, config.header_size),
        })
    }

    /// Allocate a block with at least `size` payload bytes
    ///
    /// Zero-byte requests are legal and yield a distinct, freeable handle.
    pub fn allocate(&mut self, size: usize) -> Result<BlockHandle> {
        let slot = match self.directory.first_fit(size) {
            Some(slot) => slot,
            None => {
                let largest_free = self.directory.largest_free();
                trace!(
                    "Pool {}: no free block fits {} bytes (largest free {})",
                    self.id,
                    size,
                    largest_free
                );
                return Err(PoolError::OutOfSpace {
                    requested: size,
                    largest_free,
                });
            }
        };

        if let Some(remainder) = self
            .directory
            .split(slot, size, self.config.split_threshold())?
        {
            trace!(
                "Pool {}: split slot {} at {} bytes, remainder in slot {}",
                self.id,
                slot,
                size,
                remainder
            );
        }

        let generation = self.directory.mark_allocated(slot)?;
        Ok(BlockHandle::new(self.id, slot, generation))
    }

    /// Free a block; `None` is a no-op
    ///
    /// Adjacent free blocks are merged: the successor first, then the
    /// predecessor, so a free/freed/free run collapses in one call.
    pub fn free(&mut self, handle: impl Into<Option<BlockHandle>>) -> Result<()> {
        let handle = match handle.into() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        let slot = self.resolve(handle)?;
        self.release(slot)
    }

    /// Resize a block, preserving its contents
    ///
    /// - `None` behaves as [`allocate`](Self::allocate)
    /// - a block already holding `new_size` bytes is returned unchanged
    /// - a free successor large enough is absorbed in place
    /// - otherwise the block is relocated; on failure the original block and
    ///   its contents stay valid
    pub fn resize(
        &mut self,
        handle: impl Into<Option<BlockHandle>>,
        new_size: usize,
    ) -> Result<BlockHandle> {
        let handle = match handle.into() {
            Some(handle) => handle,
            None => return self.allocate(new_size),
        };

        let slot = self.resolve(handle)?;
        let block = *self.block(slot)?;

        if block.payload_size >= new_size {
            return Ok(handle);
        }

        if self.can_grow_in_place(&block, new_size) {
            self.directory.merge_next(slot)?;
            let grown = self.block(slot)?.payload_size;
            trace!(
                "Pool {}: grew slot {} in place to {} bytes",
                self.id,
                slot,
                grown
            );
            return Ok(handle);
        }

        let relocated = self.allocate(new_size)?;
        let target = *self.block(relocated.slot)?;

        let header_size = self.config.header_size;
        let src = block.payload_offset(header_size);
        let len = block.payload_size.min(new_size);
        self.store
            .copy_within(src..src + len, target.payload_offset(header_size));

        self.release(slot)?;
        trace!(
            "Pool {}: relocated {} bytes from offset {} to {}",
            self.id,
            len,
            block.offset,
            target.offset
        );
        Ok(relocated)
    }

    /// Tear down the pool, releasing the backing store
    ///
    /// Every handle issued by this pool becomes invalid. Dropping the pool
    /// has the same effect.
    pub fn deinitialize(self) {
        debug!(
            "Deinitialized pool {} ({} blocks discarded)",
            self.id,
            self.directory.len()
        );
    }

    /// Payload bytes of an allocated block
    pub fn payload(&self, handle: BlockHandle) -> Result<&[u8]> {
        let slot = self.resolve(handle)?;
        let block = self.block(slot)?;
        let start = block.payload_offset(self.config.header_size);
        Ok(&self.store[start..start + block.payload_size])
    }

    /// Mutable payload bytes of an allocated block
    pub fn payload_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8]> {
        let slot = self.resolve(handle)?;
        let block = *self.block(slot)?;
        let start = block.payload_offset(self.config.header_size);
        Ok(&mut self.store[start..start + block.payload_size])
    }

    /// Recorded payload size of an allocated block
    pub fn payload_size(&self, handle: BlockHandle) -> Result<usize> {
        let slot = self.resolve(handle)?;
        Ok(self.block(slot)?.payload_size)
    }

    /// Whether `handle` names a live allocation of this pool
    pub fn contains(&self, handle: BlockHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of blocks in the directory
    pub fn block_count(&self) -> usize {
        self.directory.len()
    }

    /// Total payload bytes in free blocks
    pub fn free_bytes(&self) -> usize {
        self.directory.free_bytes()
    }

    /// Largest request that can currently succeed
    pub fn largest_free_block(&self) -> usize {
        self.directory.largest_free()
    }

    pub fn fragmentation_score(&self) -> f64 {
        stats::fragmentation_score(self.free_bytes(), self.largest_free_block())
    }

    /// Address-ordered dump of the directory
    pub fn blocks(&self) -> Vec<BlockInfo> {
        self.directory
            .iter()
            .map(|(_, block)| BlockInfo {
                offset: block.offset,
                payload_size: block.payload_size,
                state: block.state,
            })
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            capacity: self.config.capacity,
            header_size: self.config.header_size,
            block_count: 0,
            allocated_blocks: 0,
            free_blocks: 0,
            allocated_bytes: 0,
            free_bytes: 0,
            largest_free_block: 0,
            fragmentation: 0.0,
        };

        for (_, block) in self.directory.iter() {
            stats.block_count += 1;
            if block.is_free() {
                stats.free_blocks += 1;
                stats.free_bytes += block.payload_size;
                stats.largest_free_block = stats.largest_free_block.max(block.payload_size);
            } else {
                stats.allocated_blocks += 1;
                stats.allocated_bytes += block.payload_size;
            }
        }

        stats.fragmentation =
            stats::fragmentation_score(stats.free_bytes, stats.largest_free_block);
        stats
    }

    /// Check every directory invariant against the backing store
    pub fn verify(&self) -> Result<()> {
        if self.store.len() != self.config.capacity {
            return Err(PoolError::Corrupted(format!(
                "store holds {} bytes, configured capacity is {}",
                self.store.len(),
                self.config.capacity
            )));
        }

        self.directory.verify(self.config.capacity)
    }

    fn resolve(&self, handle: BlockHandle) -> Result<SlotId> {
        if handle.pool != self.id {
            return Err(PoolError::InvalidHandle);
        }

        self.directory
            .resolve(handle.slot, handle.generation)
            .map(|_| handle.slot)
            .ok_or(PoolError::InvalidHandle)
    }

    fn block(&self, slot: SlotId) -> Result<&Block> {
        self.directory
            .get(slot)
            .ok_or_else(|| PoolError::Corrupted(format!("slot {} is vacant", slot)))
    }

    fn can_grow_in_place(&self, block: &Block, new_size: usize) -> bool {
        match block.next.and_then(|next| self.directory.get(next)) {
            Some(next) if next.is_free() => {
                block.payload_size + next.span(self.config.header_size) >= new_size
            }
            _ => false,
        }
    }

    /// Mark `slot` free and coalesce with free neighbors
    fn release(&mut self, slot: SlotId) -> Result<()> {
        self.directory.mark_free(slot)?;

        if let Some(next) = self.directory.next_of(slot) {
            if self.block(next)?.is_free() {
                self.directory.merge_next(slot)?;
                trace!("Pool {}: merged slot {} into {}", self.id, next, slot);
            }
        }

        if let Some(prev) = self.directory.prev_of(slot) {
            if self.block(prev)?.is_free() {
                self.directory.merge_next(prev)?;
                trace!("Pool {}: merged slot {} into {}", self.id, slot, prev);
            }
        }

        Ok(())
    }
}
