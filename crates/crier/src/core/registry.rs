// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Top-level table registry.
//!
//! Maps every [`TypeKey`] to its boxed, type-erased mapping table. Tables are
//! created lazily on first registration and dropped the moment they lose
//! their last row; the registry never holds an empty table.

use std::any::type_name;
use std::collections::HashMap;
use std::hash::Hash;

use crate::core::key::TypeKey;
use crate::core::table::{ErasedTable, MappingTable};

/// Lazily-populated map from type pair to mapping table.
pub struct TypeRegistry {
    tables: HashMap<TypeKey, Box<dyn ErasedTable>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Get the table for (`M`, `T`), creating it on first use.
    ///
    /// Idempotent: repeated calls with the same type pair return the same
    /// table.
    pub fn get_or_create<M, T>(&mut self) -> &mut MappingTable<M, T>
    where
        M: 'static,
        T: Hash + Eq + Send + Sync + 'static,
    {
        let key = TypeKey::of::<M, T>();
        let erased = self.tables.entry(key).or_insert_with(|| {
            log::debug!(
                "[TypeRegistry::get_or_create] creating table for ({}, {})",
                type_name::<M>(),
                type_name::<T>()
            );
            Box::new(MappingTable::<M, T>::new())
        });

        match erased.as_any_mut().downcast_mut::<MappingTable<M, T>>() {
            Some(table) => table,
            // A TypeKey only ever maps to the table created for its own pair.
            None => unreachable!("mapping table type mismatch for key {:?}", key),
        }
    }

    /// Get the table for (`M`, `T`) if it exists.
    pub fn get<M, T>(&self) -> Option<&MappingTable<M, T>>
    where
        M: 'static,
        T: Hash + Eq + Send + Sync + 'static,
    {
        self.tables
            .get(&TypeKey::of::<M, T>())
            .and_then(|erased| erased.as_any().downcast_ref::<MappingTable<M, T>>())
    }

    /// Get the table for (`M`, `T`) mutably if it exists.
    pub fn get_mut<M, T>(&mut self) -> Option<&mut MappingTable<M, T>>
    where
        M: 'static,
        T: Hash + Eq + Send + Sync + 'static,
    {
        self.tables
            .get_mut(&TypeKey::of::<M, T>())
            .and_then(|erased| erased.as_any_mut().downcast_mut::<MappingTable<M, T>>())
    }

    /// Type-erased access for the bulk-unregistration paths.
    pub fn erased_mut(&mut self, key: &TypeKey) -> Option<&mut (dyn ErasedTable + 'static)> {
        self.tables.get_mut(key).map(|boxed| boxed.as_mut())
    }

    /// Drop the table stored under `key`.
    pub fn remove(&mut self, key: &TypeKey) {
        if self.tables.remove(key).is_some() {
            log::debug!("[TypeRegistry::remove] dropped empty table for {:?}", key);
        }
    }

    /// Number of live tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Drop every table.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("table_count", &self.table_count())
            .finish()
    }
}
