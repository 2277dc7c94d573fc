// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core data structures behind the messenger facade.
//!
//! Everything here is instance-owned state manipulated under the facade's
//! single lock; no type in this module is inherently global. The one
//! process-wide piece is the shared snapshot pool, exposed through
//! [`shared_pool`] the same way an explicitly constructed pool can be handed
//! to a messenger builder.

pub mod index;
pub mod key;
pub mod pool;
pub mod recipient;
pub mod registry;
pub mod table;

pub use index::RecipientIndex;
pub use key::TypeKey;
pub use pool::{SnapshotBuffer, SnapshotPair, SnapshotPool};
pub use recipient::RecipientKey;
pub use registry::TypeRegistry;
pub use table::{DuplicateHandler, ErasedTable, HandlerSlot, MappingTable, RemoveOutcome};

use std::sync::{Arc, OnceLock};

static SHARED_SNAPSHOT_POOL: OnceLock<Arc<SnapshotPool>> = OnceLock::new();

/// Initialize the process-wide snapshot pool
pub fn init_shared_pool() -> Arc<SnapshotPool> {
    SHARED_SNAPSHOT_POOL
        .get_or_init(|| Arc::new(SnapshotPool::new()))
        .clone()
}

/// Get the process-wide snapshot pool (creates if not initialized)
pub fn shared_pool() -> Arc<SnapshotPool> {
    SHARED_SNAPSHOT_POOL
        .get()
        .cloned()
        .unwrap_or_else(init_shared_pool)
}
