//! Shared pool guarded by a single lock
//!
//! Every public call takes the lock exactly once and then runs the unlocked
//! [`Pool`] primitives, so resize can allocate and free internally without
//! re-entering the lock.

use crate::allocator::block::BlockHandle;
use crate::allocator::pool::Pool;
use crate::allocator::BlockAllocator;
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::stats::PoolStats;
use parking_lot::Mutex;
use tracing::debug;

/// Pool that can be shared between threads (wrap in `Arc`)
///
/// Starts uninitialized; operations before [`initialize`](Self::initialize)
/// or after [`deinitialize`](Self::deinitialize) fail with
/// [`PoolError::Uninitialized`].
#[derive(Debug, Default)]
pub struct SharedPool {
    inner: Mutex<Option<Pool>>,
}

impl SharedPool {
    pub fn new() -> Self {
        SharedPool {
            inner: Mutex::new(None),
        }
    }

    /// Create and initialize in one step
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        let shared = Self::new();
        shared.initialize(config)?;
        Ok(shared)
    }

    /// Install a fresh pool
    ///
    /// An active pool is discarded along with every handle it issued.
    pub fn initialize(&self, config: PoolConfig) -> Result<()> {
        let pool = Pool::with_config(config)?;

        let mut guard = self.inner.lock();
        if let Some(previous) = guard.replace(pool) {
            debug!("Re-initializing shared pool, previous pool discarded");
            previous.deinitialize();
        }
        Ok(())
    }

    /// Release the backing store; later calls fail until re-initialized
    pub fn deinitialize(&self) {
        if let Some(pool) = self.inner.lock().take() {
            pool.deinitialize();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().is_some()
    }

    pub fn allocate(&self, size: usize) -> Result<BlockHandle> {
        self.with_pool_mut(|pool| pool.allocate(size))
    }

    pub fn free(&self, handle: impl Into<Option<BlockHandle>>) -> Result<()> {
        let handle = handle.into();
        self.with_pool_mut(|pool| pool.free(handle))
    }

    pub fn resize(
        &self,
        handle: impl Into<Option<BlockHandle>>,
        new_size: usize,
    ) -> Result<BlockHandle> {
        let handle = handle.into();
        self.with_pool_mut(|pool| pool.resize(handle, new_size))
    }

    /// Run `f` over a block's payload while holding the lock
    pub fn with_payload<R>(&self, handle: BlockHandle, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.with_pool(|pool| Ok(f(pool.payload(handle)?)))
    }

    /// Run `f` over a block's mutable payload while holding the lock
    pub fn with_payload_mut<R>(
        &self,
        handle: BlockHandle,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R> {
        self.with_pool_mut(|pool| Ok(f(pool.payload_mut(handle)?)))
    }

    pub fn stats(&self) -> Result<PoolStats> {
        self.with_pool(|pool| Ok(pool.stats()))
    }

    pub fn verify(&self) -> Result<()> {
        self.with_pool(|pool| pool.verify())
    }

    fn with_pool<R>(&self, f: impl FnOnce(&Pool) -> Result<R>) -> Result<R> {
        let guard = self.inner.lock();
        let pool = guard.as_ref().ok_or(PoolError::Uninitialized)?;
        f(pool)
    }

    fn with_pool_mut<R>(&self, f: impl FnOnce(&mut Pool) -> Result<R>) -> Result<R> {
        let mut guard = self.inner.lock();
        let pool = guard.as_mut().ok_or(PoolError::Uninitialized)?;
        f(pool)
    }
}

/// Size queries report `0` (and a score of `0.0`) while no pool is
/// initialized; use [`SharedPool::is_initialized`] to tell that apart from an
/// exhausted pool.
impl BlockAllocator for SharedPool {
    fn allocate(&mut self, size: usize) -> Result<BlockHandle> {
        SharedPool::allocate(self, size)
    }

    fn free(&mut self, handle: Option<BlockHandle>) -> Result<()> {
        SharedPool::free(self, handle)
    }

    fn resize(&mut self, handle: Option<BlockHandle>, new_size: usize) -> Result<BlockHandle> {
        SharedPool::resize(self, handle, new_size)
    }

    fn capacity(&self) -> usize {
        self.with_pool(|pool| Ok(pool.capacity())).unwrap_or(0)
    }

    fn free_bytes(&self) -> usize {
        self.with_pool(|pool| Ok(pool.free_bytes())).unwrap_or(0)
    }

    fn fragmentation_score(&self) -> f64 {
        self.with_pool(|pool| Ok(pool.fragmentation_score()))
            .unwrap_or(0.0)
    }
}
