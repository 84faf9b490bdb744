//! Singly linked list of `u16` values stored inside a [`Pool`]
//!
//! Every node is one pool block holding the value and the handle of the next
//! node, encoded with bincode. The list owns its pool, sized so that exactly
//! the requested number of nodes fit.

use crate::allocator::block::BlockHandle;
use crate::allocator::pool::Pool;
use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Encoded size of one node (value, option tag, next handle)
pub const NODE_SIZE: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Node {
    value: u16,
    next: Option<BlockHandle>,
}

/// Linked list whose nodes live in a fixed-capacity pool
#[derive(Debug)]
pub struct NodeList {
    pool: Pool,
    head: Option<BlockHandle>,
}

impl NodeList {
    /// Create an empty list with room for `nodes` nodes
    pub fn with_capacity(nodes: usize) -> Result<Self> {
        let config = PoolConfig::new(nodes.saturating_mul(NODE_SIZE))
            .with_min_split_remainder(NODE_SIZE);

        Ok(NodeList {
            pool: Pool::with_config(config)?,
            head: None,
        })
    }

    /// First node, if any
    pub fn head(&self) -> Option<BlockHandle> {
        self.head
    }

    /// The pool backing this list
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Append a value at the rear
    pub fn insert(&mut self, value: u16) -> Result<BlockHandle> {
        let tail = self.handles()?.last().copied();
        let node = self.alloc_node(value, None)?;

        match tail {
            Some(tail) => {
                let mut last = self.read(tail)?;
                last.next = Some(node);
                self.write(tail, &last)?;
            }
            None => self.head = Some(node),
        }

        Ok(node)
    }

    /// Insert a value right after `node`
    pub fn insert_after(&mut self, node: BlockHandle, value: u16) -> Result<BlockHandle> {
        let mut prev = self.read_member(node)?;
        let inserted = self.alloc_node(value, prev.next)?;
        prev.next = Some(inserted);
        self.write(node, &prev)?;
        Ok(inserted)
    }

    /// Insert a value right before `node`
    pub fn insert_before(&mut self, node: BlockHandle, value: u16) -> Result<BlockHandle> {
        if self.head == Some(node) {
            let inserted = self.alloc_node(value, Some(node))?;
            self.head = Some(inserted);
            return Ok(inserted);
        }

        let prev = self
            .find_predecessor(node)?
            .ok_or(PoolError::NodeNotFound)?;

        let inserted = self.alloc_node(value, Some(node))?;
        let mut prev_node = self.read(prev)?;
        prev_node.next = Some(inserted);
        self.write(prev, &prev_node)?;
        Ok(inserted)
    }

    /// Remove the first node holding `value` and return its block to the pool
    pub fn delete(&mut self, value: u16) -> Result<()> {
        let mut prev: Option<BlockHandle> = None;
        let mut cursor = self.head;

        while let Some(handle) = cursor {
            let node = self.read(handle)?;
            if node.value == value {
                match prev {
                    Some(prev) => {
                        let mut prev_node = self.read(prev)?;
                        prev_node.next = node.next;
                        self.write(prev, &prev_node)?;
                    }
                    None => self.head = node.next,
                }
                return self.pool.free(handle);
            }
            prev = Some(handle);
            cursor = node.next;
        }

        debug!("Delete failed: value {} not in list", value);
        Err(PoolError::ValueNotFound(value))
    }

    /// First node holding `value`
    pub fn search(&self, value: u16) -> Result<Option<BlockHandle>> {
        for handle in self.handles()? {
            if self.read(handle)?.value == value {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    /// Value stored in `node`
    pub fn value(&self, node: BlockHandle) -> Result<u16> {
        Ok(self.read_member(node)?.value)
    }

    /// Node following `node`
    pub fn next(&self, node: BlockHandle) -> Result<Option<BlockHandle>> {
        Ok(self.read_member(node)?.next)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.handles()?.len())
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Values in list order
    pub fn values(&self) -> Result<Vec<u16>> {
        self.handles()?
            .into_iter()
            .map(|handle| Ok(self.read(handle)?.value))
            .collect()
    }

    /// Render from `start` (or the head) through `end` inclusive, or to the
    /// tail when `end` is `None` or never reached
    pub fn display_range(
        &self,
        start: Option<BlockHandle>,
        end: Option<BlockHandle>,
    ) -> Result<String> {
        let mut cursor = match start {
            Some(start) => {
                self.read_member(start)?;
                Some(start)
            }
            None => self.head,
        };

        let mut values = Vec::new();
        while let Some(handle) = cursor {
            let node = self.read(handle)?;
            values.push(node.value.to_string());
            if Some(handle) == end {
                break;
            }
            cursor = node.next;
        }

        Ok(format!("[{}]", values.join(", ")))
    }

    /// Free every node
    ///
    /// The whole chain is walked before anything is freed, so a node that
    /// fails to decode leaves the list intact.
    pub fn cleanup(&mut self) -> Result<()> {
        let handles = self.handles()?;
        self.head = None;
        for handle in handles {
            self.pool.free(handle)?;
        }
        Ok(())
    }

    fn alloc_node(&mut self, value: u16, next: Option<BlockHandle>) -> Result<BlockHandle> {
        let handle = self.pool.allocate(NODE_SIZE).map_err(|err| {
            debug!("Insertion of {} failed: {}", value, err);
            err
        })?;
        self.write(handle, &Node { value, next })?;
        Ok(handle)
    }

    fn read(&self, handle: BlockHandle) -> Result<Node> {
        Ok(bincode::deserialize(self.pool.payload(handle)?)?)
    }

    fn read_member(&self, handle: BlockHandle) -> Result<Node> {
        if !self.pool.contains(handle) {
            return Err(PoolError::NodeNotFound);
        }
        self.read(handle)
    }

    fn write(&mut self, handle: BlockHandle, node: &Node) -> Result<()> {
        bincode::serialize_into(self.pool.payload_mut(handle)?, node)?;
        Ok(())
    }

    fn handles(&self) -> Result<Vec<BlockHandle>> {
        let mut handles = Vec::new();
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            handles.push(handle);
            cursor = self.read(handle)?.next;
        }
        Ok(handles)
    }

    fn find_predecessor(&self, node: BlockHandle) -> Result<Option<BlockHandle>> {
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let next = self.read(handle)?.next;
            if next == Some(node) {
                return Ok(Some(handle));
            }
            cursor = next;
        }
        Ok(None)
    }
}

impl fmt::Display for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values().map_err(|_| fmt::Error)?;
        write!(f, "[")?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}
