//! Property-based tests for allocator correctness
//!
//! Uses proptest to verify directory invariants hold across random sequences
//! of allocate / free / resize calls.

use blockpool::{BlockHandle, BlockState, Pool, PoolConfig};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    Free(usize),
    Resize(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..300).prop_map(Op::Allocate),
        any::<usize>().prop_map(Op::Free),
        (any::<usize>(), 0usize..600).prop_map(|(i, s)| Op::Resize(i, s)),
    ]
}

/// Live allocation with the byte it was filled with
struct Live {
    handle: BlockHandle,
    fill: u8,
    len: usize,
}

fn check_invariants(pool: &Pool) -> Result<(), TestCaseError> {
    prop_assert!(pool.verify().is_ok(), "verify failed: {:?}", pool.verify());

    let header = pool.config().header_size;
    let blocks = pool.blocks();

    // Tiling: header + payload of every block sums to capacity
    let total: usize = blocks.iter().map(|b| header + b.payload_size).sum();
    prop_assert_eq!(total, pool.capacity());

    // No two neighbours free
    for pair in blocks.windows(2) {
        prop_assert!(
            !(pair[0].state == BlockState::Free && pair[1].state == BlockState::Free),
            "adjacent free blocks at {} and {}",
            pair[0].offset,
            pair[1].offset
        );
    }

    // Disjoint payload ranges for allocated blocks (address order implies it)
    let mut last_end = 0usize;
    for block in blocks.iter().filter(|b| b.state == BlockState::Allocated) {
        let start = block.offset + header;
        prop_assert!(start >= last_end, "overlapping payloads at {}", start);
        last_end = start + block.payload_size;
    }

    Ok(())
}

fn run_ops(config: PoolConfig, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut pool = Pool::with_config(config).unwrap();
    let mut live: Vec<Live> = Vec::new();
    let mut next_fill = 1u8;

    for op in ops {
        match op {
            Op::Allocate(size) => {
                if let Ok(handle) = pool.allocate(size) {
                    prop_assert!(pool.payload_size(handle).unwrap() >= size);
                    pool.payload_mut(handle).unwrap().fill(next_fill);
                    live.push(Live {
                        handle,
                        fill: next_fill,
                        len: size,
                    });
                    next_fill = next_fill.wrapping_add(1).max(1);
                }
            }
            Op::Free(index) => {
                if !live.is_empty() {
                    let entry = live.swap_remove(index % live.len());
                    pool.free(entry.handle).unwrap();
                    prop_assert!(!pool.contains(entry.handle));
                }
            }
            Op::Resize(index, new_size) => {
                if !live.is_empty() {
                    let slot = index % live.len();
                    let entry = &mut live[slot];
                    match pool.resize(entry.handle, new_size) {
                        Ok(handle) => {
                            prop_assert!(pool.payload_size(handle).unwrap() >= new_size);
                            entry.handle = handle;
                            entry.len = entry.len.min(new_size);
                        }
                        Err(_) => {
                            // Old block must survive a failed resize
                            prop_assert!(pool.contains(entry.handle));
                        }
                    }
                }
            }
        }

        check_invariants(&pool)?;

        // Contents of every live block are intact
        for entry in &live {
            let bytes = pool.payload(entry.handle).unwrap();
            prop_assert!(
                bytes[..entry.len].iter().all(|&b| b == entry.fill),
                "payload of {:?} corrupted",
                entry.handle
            );
        }
    }

    for entry in live {
        pool.free(entry.handle).unwrap();
    }

    // Everything coalesces back into one block
    prop_assert_eq!(pool.block_count(), 1);
    prop_assert_eq!(
        pool.free_bytes() + pool.config().header_size,
        pool.capacity()
    );
    Ok(())
}

proptest! {
    #[test]
    fn prop_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..120)) {
        run_ops(PoolConfig::new(4096), ops)?;
    }

    #[test]
    fn prop_invariants_hold_with_headers(
        ops in prop::collection::vec(op_strategy(), 1..120),
        header in 1usize..32,
        min_split in 1usize..64
    ) {
        let config = PoolConfig::new(4096)
            .with_header_size(header)
            .with_min_split_remainder(min_split);
        run_ops(config, ops)?;
    }

    #[test]
    fn prop_exact_fit_reuse(size in 0usize..1024, prefix in 0usize..1024) {
        let mut pool = Pool::new(4096).unwrap();
        let _anchor = pool.allocate(prefix).unwrap();

        let first = pool.allocate(size).unwrap();
        let offset = pool.blocks()[1].offset;
        pool.free(first).unwrap();

        let second = pool.allocate(size).unwrap();
        prop_assert_eq!(pool.blocks()[1].offset, offset);
        prop_assert_eq!(pool.blocks()[1].state, BlockState::Allocated);
        prop_assert!(pool.contains(second));
    }

    #[test]
    fn prop_failed_allocation_leaves_pool_untouched(
        sizes in prop::collection::vec(1usize..512, 1..20)
    ) {
        let mut pool = Pool::new(2048).unwrap();
        for size in sizes {
            let before = pool.blocks();
            if pool.allocate(size).is_err() {
                prop_assert_eq!(pool.blocks(), before);
                prop_assert!(pool.largest_free_block() < size);
            }
        }
    }
}
