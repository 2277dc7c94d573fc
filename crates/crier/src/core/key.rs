// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compound type key for registry lookup.
//!
//! Every registration lives under a (message type, token type) pair. The pair
//! is captured as two `std::any::TypeId` values at the generic call site, so
//! lookup never touches runtime type discovery.

use std::any::TypeId;

/// Key identifying one (message type, token type) pair.
///
/// Two keys are equal exactly when both the message type and the token type
/// match. The key is `Copy` and hash-friendly; it is the index of the type
/// registry and the member of each recipient's index entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    message: TypeId,
    token: TypeId,
}

impl TypeKey {
    /// Build the key for message type `M` and token type `T`.
    ///
    /// Computed per monomorphized call site; no runtime lookup.
    pub fn of<M: 'static, T: 'static>() -> Self {
        Self {
            message: TypeId::of::<M>(),
            token: TypeId::of::<T>(),
        }
    }
}

impl std::fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeKey")
            .field("message", &self.message)
            .field("token", &self.token)
            .finish()
    }
}
