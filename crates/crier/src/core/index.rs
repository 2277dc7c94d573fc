// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reverse index from recipient to joined tables.
//!
//! Bulk unregistration must visit only the tables a recipient actually
//! joined, not every table the registry ever created. The index keeps that
//! set per recipient as [`TypeKey`]s; the registry resolves a key back to
//! its table under the same lock.
//!
//! Invariant: a recipient has an index entry if and only if it holds at
//! least one live handler in at least one table. Entries are pruned the
//! moment their set empties.

use std::collections::{HashMap, HashSet};

use crate::core::key::TypeKey;
use crate::core::recipient::RecipientKey;

/// Recipient -> set of joined (message type, token type) pairs.
pub struct RecipientIndex {
    members: HashMap<RecipientKey, HashSet<TypeKey>>,
}

impl RecipientIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
        }
    }

    /// Record that `key` joined the table for `type_key`.
    pub fn track(&mut self, key: RecipientKey, type_key: TypeKey) {
        self.members.entry(key).or_default().insert(type_key);
    }

    /// Record that `key` left the table for `type_key`, pruning an emptied
    /// entry.
    pub fn untrack(&mut self, key: RecipientKey, type_key: TypeKey) {
        if let Some(set) = self.members.get_mut(&key) {
            set.remove(&type_key);
            if set.is_empty() {
                self.members.remove(&key);
            }
        }
    }

    /// The tables `key` currently participates in.
    pub fn type_keys(&self, key: RecipientKey) -> Option<&HashSet<TypeKey>> {
        self.members.get(&key)
    }

    /// Remove and return the full entry for `key`.
    pub fn take(&mut self, key: RecipientKey) -> Option<HashSet<TypeKey>> {
        self.members.remove(&key)
    }

    /// True when `key` holds at least one registration.
    pub fn contains(&self, key: RecipientKey) -> bool {
        self.members.contains_key(&key)
    }

    /// Number of recipients with at least one registration.
    pub fn recipient_count(&self) -> usize {
        self.members.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.members.clear();
    }
}

impl Default for RecipientIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecipientIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientIndex")
            .field("recipient_count", &self.recipient_count())
            .finish()
    }
}
