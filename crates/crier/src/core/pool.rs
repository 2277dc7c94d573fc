// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-free buffer pool for zero-allocation send snapshots.
//!
//! Every `send` copies the matching (recipient, handler) pairs into a scratch
//! vector while the registry lock is held, then invokes the handlers after
//! releasing it. Those vectors come from this pool instead of a fresh heap
//! allocation per call.
//!
//! # Design
//! - **Lock-free:** each capacity class keeps its free buffers in a crossbeam
//!   ArrayQueue
//! - **Lazy:** buffers are allocated on first use per class and recycled from
//!   then on; a rental that finds its class empty allocates and bumps the
//!   miss counter
//! - **Bounded:** each class retains at most a fixed number of buffers;
//!   returns beyond that are dropped
//! - **Clean:** buffers are cleared before they re-enter the freelist, so the
//!   pool never extends recipient or handler lifetimes

use crossbeam::queue::ArrayQueue;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One snapshot entry: a recipient and the handler registered for it.
///
/// Both sides are type-erased so buffers of every (message type, token type)
/// pair can share the same pool. The send path restores the handler type with
/// a single downcast before invoking.
pub struct SnapshotPair {
    /// Strong recipient handle captured under the lock.
    pub recipient: Arc<dyn Any + Send + Sync>,
    /// Erased handler slot; concretely an `Arc<HandlerSlot<M>>`.
    pub slot: Arc<dyn Any + Send + Sync>,
}

/// Capacity class configuration: (buffer capacity, retained buffers)
///
/// Requests round up to the next class; larger classes keep fewer buffers
/// since wide fan-out sends are rare. Requests beyond the last class fall
/// back to a plain allocation that is not retained.
const CAPACITY_CLASSES: &[(usize, usize)] = &[
    (8, 16),    // 8 pairs x 16 buffers
    (16, 16),   // 16 pairs x 16 buffers
    (32, 8),    // 32 pairs x 8 buffers
    (64, 8),    // 64 pairs x 8 buffers
    (128, 4),   // 128 pairs x 4 buffers
    (256, 4),   // 256 pairs x 4 buffers
    (512, 2),   // 512 pairs x 2 buffers
    (1024, 2),  // 1024 pairs x 2 buffers
];

/// Freelist for one capacity class.
struct ClassQueue {
    capacity: usize,
    freelist: ArrayQueue<Vec<SnapshotPair>>,
}

/// Shared pool of snapshot vectors in power-of-two capacity classes.
///
/// # Thread Safety
///
/// All operations are lock-free; the pool is shared across messengers and
/// threads behind an `Arc`.
pub struct SnapshotPool {
    classes: Vec<ClassQueue>,
    /// Count of rentals not served from a freelist (diagnostic)
    miss_count: AtomicU64,
}

impl SnapshotPool {
    /// Create an empty pool with the default capacity classes.
    pub fn new() -> Self {
        let classes = CAPACITY_CLASSES
            .iter()
            .map(|&(capacity, retained)| ClassQueue {
                capacity,
                freelist: ArrayQueue::new(retained),
            })
            .collect();

        Self {
            classes,
            miss_count: AtomicU64::new(0),
        }
    }

    /// Acquire a buffer holding at least `capacity` pairs.
    ///
    /// Served from the smallest class whose buffers fit the request; an empty
    /// freelist allocates a fresh vector and bumps the miss counter. Requests
    /// larger than the biggest class are served unpooled.
    ///
    /// The returned [`SnapshotBuffer`] clears itself and re-enters the pool
    /// on drop, including during unwinding.
    pub fn acquire(&self, capacity: usize) -> SnapshotBuffer<'_> {
        let Some(index) = self.class_index(capacity) else {
            // Oversize request: plain allocation, dropped on return.
            return SnapshotBuffer {
                pairs: Vec::with_capacity(capacity),
                class: None,
                pool: self,
            };
        };

        let class = &self.classes[index];
        let pairs = match class.freelist.pop() {
            Some(pairs) => pairs,
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(class.capacity)
            }
        };

        SnapshotBuffer {
            pairs,
            class: Some(index),
            pool: self,
        }
    }

    /// Smallest class index whose capacity covers the request.
    fn class_index(&self, capacity: usize) -> Option<usize> {
        self.classes.iter().position(|c| c.capacity >= capacity)
    }

    /// Clear a vector and return it to its class freelist (called by the guard).
    ///
    /// A full freelist drops the vector instead; retention stays bounded.
    fn release(&self, class: usize, mut pairs: Vec<SnapshotPair>) {
        pairs.clear();
        let _ = self.classes[class].freelist.push(pairs);
    }

    /// Current number of retained buffers across all classes.
    pub fn available(&self) -> usize {
        self.classes.iter().map(|c| c.freelist.len()).sum()
    }

    /// Count of rentals that could not be served from a freelist (diagnostic metric)
    pub fn miss_count(&self) -> u64 {
        self.miss_count.load(Ordering::Relaxed)
    }
}

impl Default for SnapshotPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPool")
            .field("classes", &self.classes.len())
            .field("available", &self.available())
            .field("miss_count", &self.miss_count())
            .finish()
    }
}

/// Rented snapshot buffer.
///
/// Holds the (recipient, handler) pairs captured under the registry lock.
/// When dropped, the buffer clears its entries (releasing the strong handles)
/// and returns the allocation to the pool. Drop also runs while a handler
/// panic unwinds through `send`, so a failing handler cannot leak buffers.
pub struct SnapshotBuffer<'a> {
    pairs: Vec<SnapshotPair>,
    /// Class index this buffer came from; `None` for unpooled oversize buffers.
    class: Option<usize>,
    pool: &'a SnapshotPool,
}

impl SnapshotBuffer<'_> {
    /// Append one captured pair.
    pub fn push(&mut self, pair: SnapshotPair) {
        self.pairs.push(pair);
    }

    /// Captured pairs, in table iteration order.
    pub fn pairs(&self) -> &[SnapshotPair] {
        &self.pairs
    }

    /// Number of captured pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pair was captured.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Capacity of the underlying allocation.
    pub fn capacity(&self) -> usize {
        self.pairs.capacity()
    }
}

impl Drop for SnapshotBuffer<'_> {
    fn drop(&mut self) {
        let pairs = std::mem::take(&mut self.pairs);
        if let Some(class) = self.class {
            self.pool.release(class, pairs);
        }
        // Oversize buffers drop their allocation here.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pair() -> SnapshotPair {
        SnapshotPair {
            recipient: Arc::new(0u32),
            slot: Arc::new(1u64),
        }
    }

    #[test]
    fn test_acquire_rounds_up_to_class() {
        let pool = SnapshotPool::new();

        assert_eq!(pool.acquire(1).capacity(), 8);
        assert_eq!(pool.acquire(8).capacity(), 8);
        assert_eq!(pool.acquire(9).capacity(), 16);
        assert_eq!(pool.acquire(100).capacity(), 128);
    }

    #[test]
    fn test_acquire_release_cycle_reuses_allocation() {
        let pool = SnapshotPool::new();
        assert_eq!(pool.available(), 0);

        {
            let mut buffer = pool.acquire(4);
            buffer.push(test_pair());
            assert_eq!(buffer.len(), 1);
        }

        // First rental was a miss; the buffer is now retained.
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.miss_count(), 1);

        {
            let buffer = pool.acquire(4);
            assert!(buffer.is_empty(), "recycled buffer must be cleared");
            assert_eq!(pool.available(), 0);
        }

        // Second rental hit the freelist; miss count unchanged.
        assert_eq!(pool.miss_count(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_oversize_request_not_retained() {
        let pool = SnapshotPool::new();

        {
            let buffer = pool.acquire(5000);
            assert!(buffer.capacity() >= 5000);
        }

        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_retention_is_bounded() {
        let pool = SnapshotPool::new();

        // 8-pair class retains at most 16 buffers; return twice that many.
        let buffers: Vec<_> = (0..32).map(|_| pool.acquire(8)).collect();
        drop(buffers);

        assert_eq!(pool.available(), 16);
    }

    #[test]
    fn test_cleared_before_reuse_drops_handles() {
        let pool = SnapshotPool::new();
        let recipient: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        let observed = Arc::downgrade(&recipient);

        {
            let mut buffer = pool.acquire(2);
            buffer.push(SnapshotPair {
                recipient,
                slot: Arc::new(0u8),
            });
        }

        // Pooled buffer must not keep the recipient alive.
        assert!(observed.upgrade().is_none());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(SnapshotPool::new());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    let mut buffer = pool.acquire(16);
                    buffer.push(test_pair());
                    assert_eq!(buffer.len(), 1);
                }
            }));
        }

        for handle in handles {
            handle.join().expect("pool worker should not panic");
        }

        assert!(pool.available() <= 16);
    }
}
