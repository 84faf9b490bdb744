//! # blockpool - Fixed-Capacity Block Allocator
//!
//! A user-space allocator that manages one fixed-capacity backing store and
//! hands out variable-sized blocks from it, without calling the global
//! allocator per request.
//!
//! ## Features
//!
//! - **First-fit placement** in address order
//! - **Splitting** of oversized free blocks, with a minimum remainder to avoid slivers
//! - **Exhaustive coalescing** on free: no two adjacent blocks are ever both free
//! - **Resize in place** when the following block is free, relocation otherwise
//! - **Checked handles**: stale or foreign handles are rejected, not dereferenced
//! - **Shared pools** behind a single coarse lock
//!
//! ## Quick Start
//!
//! ```rust
//! use blockpool::{Pool, Result};
//!
//! # fn main() -> Result<()> {
//! let mut pool = Pool::new(1024)?;
//!
//! let a = pool.allocate(200)?;
//! pool.payload_mut(a)?[..5].copy_from_slice(b"hello");
//!
//! // Grows in place: the rest of the store is free
//! let a = pool.resize(a, 350)?;
//! assert_eq!(&pool.payload(a)?[..5], b"hello");
//!
//! pool.free(a)?;
//! assert_eq!(pool.free_bytes(), 1024);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Backing store (capacity bytes)              │
//! │ ┌────┬─────────┬────┬───────┬────┬────────┐ │
//! │ │hdr │ payload │hdr │payload│hdr │  free  │ │
//! │ └────┴─────────┴────┴───────┴────┴────────┘ │
//! ├─────────────────────────────────────────────┤
//! │ Block directory                             │
//! │  - one record per block: offset/size/state  │
//! │  - doubly linked in address order           │
//! │  - slot + generation behind every handle    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Header bytes are reserved only when [`PoolConfig::header_size`] is
//! non-zero; by default the directory record is the header.

pub mod allocator;
pub mod config;
pub mod error;
pub mod list;
pub mod stats;

// Re-export commonly used types
pub use allocator::{
    block::{Block, BlockHandle, BlockState},
    directory::BlockDirectory,
    pool::Pool,
    shared::SharedPool,
    BlockAllocator,
};
pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use list::{NodeList, NODE_SIZE};
pub use stats::{BlockInfo, PoolStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
