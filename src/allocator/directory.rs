//! Block directory
//!
//! The address-ordered partition of the backing store into blocks. Block
//! records live in an index-based arena and are chained through `prev`/`next`
//! slot ids, so neighbor lookups, splits and merges are O(1). Only the
//! first-fit scan walks the chain.
//!
//! ```text
//!   head
//!    │
//!    ▼
//!  ┌──────────┐   ┌──────────┐   ┌──────────┐
//!  │ slot 0   │──▶│ slot 2   │──▶│ slot 1   │──▶ None
//!  │ off 0    │◀──│ off 216  │◀──│ off 432  │
//!  │ Alloc    │   │ Alloc    │   │ Free     │
//!  └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! Slot ids follow creation order, not address order; vacated slots are reused.

use crate::allocator::block::{Block, BlockState, SlotId};
use crate::error::{PoolError, Result};

#[derive(Debug, Clone)]
struct Slot {
    /// Bumped whenever the slot becomes allocated or is vacated
    generation: u32,
    block: Option<Block>,
}

/// Address-ordered block chain over a fixed-capacity store
#[derive(Debug, Clone)]
pub struct BlockDirectory {
    slots: Vec<Slot>,
    vacant: Vec<SlotId>,
    head: Option<SlotId>,
    len: usize,
    header_size: usize,
}

impl BlockDirectory {
    /// Create a directory holding one free block that spans the whole store
    pub fn new(capacity: usize, header_size: usize) -> Self {
        let first = Block::new(0, capacity.saturating_sub(header_size), BlockState::Free);

        BlockDirectory {
            slots: vec![Slot {
                generation: 0,
                block: Some(first),
            }],
            vacant: Vec::new(),
            head: Some(0),
            len: 1,
            header_size,
        }
    }

    /// Number of blocks in the chain
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, slot: SlotId) -> Option<&Block> {
        self.slots.get(slot).and_then(|s| s.block.as_ref())
    }

    fn get_mut(&mut self, slot: SlotId) -> Option<&mut Block> {
        self.slots.get_mut(slot).and_then(|s| s.block.as_mut())
    }

    fn block(&self, slot: SlotId) -> Result<&Block> {
        self.get(slot)
            .ok_or_else(|| PoolError::Corrupted(format!("slot {} is vacant", slot)))
    }

    fn block_mut(&mut self, slot: SlotId) -> Result<&mut Block> {
        self.get_mut(slot)
            .ok_or_else(|| PoolError::Corrupted(format!("slot {} is vacant", slot)))
    }

    /// Look up an allocated block by slot and generation
    pub(crate) fn resolve(&self, slot: SlotId, generation: u32) -> Option<&Block> {
        let entry = self.slots.get(slot)?;
        match entry.block.as_ref() {
            Some(block) if entry.generation == generation && !block.is_free() => Some(block),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn generation(&self, slot: SlotId) -> u32 {
        self.slots.get(slot).map(|s| s.generation).unwrap_or(0)
    }

    /// First free block, in address order, whose payload holds `size` bytes
    pub(crate) fn first_fit(&self, size: usize) -> Option<SlotId> {
        self.iter()
            .find(|(_, block)| block.is_free() && block.payload_size >= size)
            .map(|(slot, _)| slot)
    }

    /// Shrink `slot` to `size` payload bytes and carve the leftover into a new
    /// free block right after it, if the leftover is at least `threshold`.
    ///
    /// Returns the slot of the new block, or `None` when no split happened.
    pub(crate) fn split(
        &mut self,
        slot: SlotId,
        size: usize,
        threshold: usize,
    ) -> Result<Option<SlotId>> {
        let header_size = self.header_size;
        let block = *self.block(slot)?;

        let leftover = match block.payload_size.checked_sub(size) {
            Some(leftover) if leftover >= threshold && leftover >= header_size => leftover,
            _ => return Ok(None),
        };

        let remainder = Block::new(
            block.payload_offset(header_size) + size,
            leftover - header_size,
            BlockState::Free,
        );

        self.block_mut(slot)?.payload_size = size;
        let new_slot = self.insert_after(slot, remainder)?;
        Ok(Some(new_slot))
    }

    /// Mark a block allocated and return its new generation
    pub(crate) fn mark_allocated(&mut self, slot: SlotId) -> Result<u32> {
        self.block_mut(slot)?.state = BlockState::Allocated;
        let entry = &mut self.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        Ok(entry.generation)
    }

    pub(crate) fn mark_free(&mut self, slot: SlotId) -> Result<()> {
        self.block_mut(slot)?.state = BlockState::Free;
        Ok(())
    }

    pub(crate) fn next_of(&self, slot: SlotId) -> Option<SlotId> {
        self.get(slot).and_then(|b| b.next)
    }

    pub(crate) fn prev_of(&self, slot: SlotId) -> Option<SlotId> {
        self.get(slot).and_then(|b| b.prev)
    }

    /// Absorb the block following `slot` (header and payload) into `slot`.
    ///
    /// The absorbed block is unlinked and its slot vacated. Returns `false`
    /// when `slot` is the last block.
    pub(crate) fn merge_next(&mut self, slot: SlotId) -> Result<bool> {
        let next = match self.next_of(slot) {
            Some(next) => next,
            None => return Ok(false),
        };

        let absorbed = self.block(next)?.span(self.header_size);
        self.block_mut(slot)?.payload_size += absorbed;
        self.remove(next)?;
        Ok(true)
    }

    /// Link `block` into the chain right after `slot`
    fn insert_after(&mut self, slot: SlotId, mut block: Block) -> Result<SlotId> {
        let next = self.block(slot)?.next;
        block.prev = Some(slot);
        block.next = next;

        let new_slot = self.occupy(block);
        self.block_mut(slot)?.next = Some(new_slot);
        if let Some(next) = next {
            self.block_mut(next)?.prev = Some(new_slot);
        }
        self.len += 1;
        Ok(new_slot)
    }

    /// Unlink `slot` from the chain and vacate it
    fn remove(&mut self, slot: SlotId) -> Result<Block> {
        let block = *self.block(slot)?;

        match block.prev {
            Some(prev) => self.block_mut(prev)?.next = block.next,
            None => self.head = block.next,
        }
        if let Some(next) = block.next {
            self.block_mut(next)?.prev = block.prev;
        }

        let entry = &mut self.slots[slot];
        entry.block = None;
        entry.generation = entry.generation.wrapping_add(1);
        self.vacant.push(slot);
        self.len -= 1;
        Ok(block)
    }

    fn occupy(&mut self, block: Block) -> SlotId {
        match self.vacant.pop() {
            Some(slot) => {
                self.slots[slot].block = Some(block);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    block: Some(block),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Blocks in address order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            directory: self,
            cursor: self.head,
        }
    }

    /// Total payload bytes held by free blocks
    pub fn free_bytes(&self) -> usize {
        self.iter()
            .filter(|(_, b)| b.is_free())
            .map(|(_, b)| b.payload_size)
            .sum()
    }

    /// Payload size of the largest free block (0 when nothing is free)
    pub fn largest_free(&self) -> usize {
        self.iter()
            .filter(|(_, b)| b.is_free())
            .map(|(_, b)| b.payload_size)
            .max()
            .unwrap_or(0)
    }

    /// Check the chain against the store it partitions
    ///
    /// Checks:
    /// - Blocks tile `[0, capacity)` in address order with no gaps or overlaps
    /// - No two adjacent blocks are both free
    /// - `prev` links mirror `next` links
    /// - The block count matches the number of occupied slots
    pub fn verify(&self, capacity: usize) -> Result<()> {
        let mut expected_offset = 0usize;
        let mut previous: Option<(SlotId, &Block)> = None;
        let mut count = 0usize;

        for (slot, block) in self.iter() {
            if count > self.slots.len() {
                return Err(PoolError::Corrupted("cycle in block chain".into()));
            }

            if block.offset != expected_offset {
                return Err(PoolError::Corrupted(format!(
                    "block at slot {} starts at {} but previous block ends at {}",
                    slot, block.offset, expected_offset
                )));
            }

            if block.prev != previous.map(|(s, _)| s) {
                return Err(PoolError::Corrupted(format!(
                    "slot {} has a stale prev link",
                    slot
                )));
            }

            if let Some((prev_slot, prev_block)) = previous {
                if prev_block.is_free() && block.is_free() {
                    return Err(PoolError::Corrupted(format!(
                        "adjacent free blocks at slots {} and {}",
                        prev_slot, slot
                    )));
                }
            }

            expected_offset = block.end(self.header_size);
            previous = Some((slot, block));
            count += 1;
        }

        if expected_offset != capacity {
            return Err(PoolError::Corrupted(format!(
                "blocks cover {} bytes of a {} byte store",
                expected_offset, capacity
            )));
        }

        let occupied = self.slots.iter().filter(|s| s.block.is_some()).count();
        if count != self.len || occupied != self.len {
            return Err(PoolError::Corrupted(format!(
                "chain holds {} blocks, directory records {} ({} occupied slots)",
                count, self.len, occupied
            )));
        }

        Ok(())
    }
}

/// Address-ordered iterator over `(slot, block)` pairs
pub struct Iter<'a> {
    directory: &'a BlockDirectory,
    cursor: Option<SlotId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (SlotId, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let block = self.directory.get(slot)?;
        self.cursor = block.next;
        Some((slot, block))
    }
}
