//! Block records and client handles
//!
//! A block is the unit of accounting: a header at `offset` followed by
//! `payload_size` usable bytes. Blocks are chained in address order through
//! `prev`/`next` slot indices of the directory arena.

use serde::{Deserialize, Serialize};

/// Slot index inside the directory arena
pub(crate) type SlotId = usize;

/// Allocation state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockState {
    Free,
    Allocated,
}

/// A block of the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Byte offset of the block header from the start of the store
    pub offset: usize,
    /// Usable bytes following the header
    pub payload_size: usize,
    /// Free or allocated
    pub state: BlockState,
    pub(crate) prev: Option<SlotId>,
    pub(crate) next: Option<SlotId>,
}

impl Block {
    pub(crate) fn new(offset: usize, payload_size: usize, state: BlockState) -> Self {
        Block {
            offset,
            payload_size,
            state,
            prev: None,
            next: None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == BlockState::Free
    }

    /// Bytes this block occupies in the store, header included
    pub fn span(&self, header_size: usize) -> usize {
        header_size + self.payload_size
    }

    /// Offset of the first byte after this block
    pub fn end(&self, header_size: usize) -> usize {
        self.offset + self.span(header_size)
    }

    /// Offset of the first payload byte
    pub fn payload_offset(&self, header_size: usize) -> usize {
        self.offset + header_size
    }
}

/// Opaque reference to an allocated block
///
/// Returned by `allocate`/`resize` and consumed by `free`/`resize`/payload
/// access. A handle stays valid until the block it names is freed or
/// relocated, or the pool that issued it is deinitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHandle {
    pub(crate) pool: u32,
    pub(crate) slot: SlotId,
    pub(crate) generation: u32,
}

impl BlockHandle {
    pub(crate) fn new(pool: u32, slot: SlotId, generation: u32) -> Self {
        BlockHandle {
            pool,
            slot,
            generation,
        }
    }
}
