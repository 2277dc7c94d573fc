// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-type-pair mapping table.
//!
//! One table exists per (message type, token type) pair and maps each
//! registered recipient to its per-token handlers:
//!
//! ```text
//! MappingTable<M, T>
//! +-- rows: HashMap<RecipientKey, RecipientRow>
//!
//! RecipientRow
//! +-- recipient: Arc<dyn Any + Send + Sync>   (strong handle)
//! +-- handlers: HashMap<T, Arc<HandlerSlot<M>>>
//! ```
//!
//! Tables are stored type-erased in the registry and recovered by downcast
//! at the monomorphized call site. The [`ErasedTable`] trait carries the
//! operations the bulk-unregistration paths need without knowing `M` or `T`.
//!
//! Mutations prune eagerly: a row that loses its last handler is removed at
//! once, and the facade drops a table that loses its last row.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::core::pool::{SnapshotBuffer, SnapshotPair};
use crate::core::recipient::RecipientKey;

/// Type-erased handler for messages of type `M`.
///
/// The closure captured at registration time restores the concrete recipient
/// type; only code monomorphized with the matching generic parameters can
/// have produced the entry, so the downcast inside cannot miss.
pub struct HandlerSlot<M> {
    callback: Box<dyn Fn(&(dyn Any + Send + Sync), &mut M) + Send + Sync>,
}

impl<M: 'static> HandlerSlot<M> {
    /// Wrap a typed handler into an erased slot.
    pub fn new<R, F>(handler: F) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(&R, &mut M) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(move |recipient, message| {
                if let Some(recipient) = recipient.downcast_ref::<R>() {
                    handler(recipient, message);
                }
            }),
        }
    }

    /// Invoke the handler with the erased recipient and the typed message.
    pub fn invoke(&self, recipient: &(dyn Any + Send + Sync), message: &mut M) {
        (self.callback)(recipient, message);
    }
}

/// Error returned by [`MappingTable::try_insert`] when the exact
/// (recipient, token) pair already holds a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateHandler;

/// Outcome of [`MappingTable::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// A handler was removed.
    pub removed: bool,
    /// The recipient's row emptied and was pruned from the table.
    pub row_pruned: bool,
}

/// All registrations for one recipient within a table.
struct RecipientRow<M, T> {
    /// Strong handle keeping the recipient alive while registered.
    recipient: Arc<dyn Any + Send + Sync>,
    /// One handler per token.
    handlers: HashMap<T, Arc<HandlerSlot<M>>>,
}

/// Recipient -> (token -> handler) map for one (message type, token type) pair.
pub struct MappingTable<M, T> {
    rows: HashMap<RecipientKey, RecipientRow<M, T>>,
}

impl<M, T> MappingTable<M, T>
where
    M: 'static,
    T: Hash + Eq + Send + Sync + 'static,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    /// Insert a handler for (recipient, token).
    ///
    /// The duplicate check runs before any structural mutation, so a failed
    /// insert leaves the table exactly as it was: no empty row is created and
    /// the existing handler stays in place.
    pub fn try_insert(
        &mut self,
        key: RecipientKey,
        recipient: &Arc<dyn Any + Send + Sync>,
        token: T,
        slot: HandlerSlot<M>,
    ) -> Result<(), DuplicateHandler> {
        if let Some(row) = self.rows.get(&key) {
            if row.handlers.contains_key(&token) {
                return Err(DuplicateHandler);
            }
        }

        let row = self.rows.entry(key).or_insert_with(|| RecipientRow {
            recipient: Arc::clone(recipient),
            handlers: HashMap::new(),
        });
        row.handlers.insert(token, Arc::new(slot));
        Ok(())
    }

    /// Remove the handler for (recipient, token), pruning an emptied row.
    pub fn remove(&mut self, key: RecipientKey, token: &T) -> RemoveOutcome {
        let Some(row) = self.rows.get_mut(&key) else {
            return RemoveOutcome {
                removed: false,
                row_pruned: false,
            };
        };

        let removed = row.handlers.remove(token).is_some();
        let row_pruned = removed && row.handlers.is_empty();
        if row_pruned {
            self.rows.remove(&key);
        }

        RemoveOutcome { removed, row_pruned }
    }

    /// True when (recipient, token) holds a handler.
    pub fn contains(&self, key: RecipientKey, token: &T) -> bool {
        self.rows
            .get(&key)
            .map(|row| row.handlers.contains_key(token))
            .unwrap_or(false)
    }

    /// Number of recipients with at least one handler in this table.
    ///
    /// Upper bound on the match count of a send, used to size the snapshot
    /// buffer. Rows are pruned eagerly, so every counted recipient holds at
    /// least one handler.
    pub fn recipient_count(&self) -> usize {
        self.rows.len()
    }

    /// Total number of handlers across all rows.
    pub fn handler_count(&self) -> usize {
        self.rows.values().map(|row| row.handlers.len()).sum()
    }

    /// Append every (recipient, handler) pair registered under `token`.
    ///
    /// Called with the registry lock held; the buffer is consumed after the
    /// lock is released.
    pub fn snapshot_into(&self, token: &T, buffer: &mut SnapshotBuffer<'_>) {
        for row in self.rows.values() {
            if let Some(slot) = row.handlers.get(token) {
                buffer.push(SnapshotPair {
                    recipient: Arc::clone(&row.recipient),
                    slot: slot.clone(),
                });
            }
        }
    }
}

impl<M, T> Default for MappingTable<M, T>
where
    M: 'static,
    T: Hash + Eq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a mapping table.
///
/// The recipient-wide unregistration paths walk tables of heterogeneous
/// (message type, token type) pairs through this trait; everything else goes
/// through the concrete [`MappingTable`] recovered by downcast.
pub trait ErasedTable: Send {
    /// Remove every handler owned by `key`, regardless of token.
    ///
    /// Returns whether the recipient had a row in this table.
    fn remove_recipient(&mut self, key: RecipientKey) -> bool;

    /// Remove the handler owned by `key` under `token`, if this table's token
    /// type matches the erased token.
    ///
    /// Returns whether the recipient's row was pruned as a result. Tables of
    /// a different token type are left untouched and report `false`.
    fn remove_recipient_token(&mut self, key: RecipientKey, token: &dyn Any) -> bool;

    /// True when the table holds no rows.
    fn is_empty(&self) -> bool;

    /// Concrete-type access for the monomorphized paths.
    fn as_any(&self) -> &dyn Any;

    /// Mutable concrete-type access for the monomorphized paths.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M, T> ErasedTable for MappingTable<M, T>
where
    M: 'static,
    T: Hash + Eq + Send + Sync + 'static,
{
    fn remove_recipient(&mut self, key: RecipientKey) -> bool {
        self.rows.remove(&key).is_some()
    }

    fn remove_recipient_token(&mut self, key: RecipientKey, token: &dyn Any) -> bool {
        let Some(token) = token.downcast_ref::<T>() else {
            return false;
        };
        self.remove(key, token).row_pruned
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
