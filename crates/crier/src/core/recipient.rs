// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identity key for registered recipients.
//!
//! Recipients are keyed by the address of their `Arc` allocation, never by
//! the value they hold. Two `Arc`s cloned from the same allocation produce
//! equal keys; two separately allocated recipients produce distinct keys even
//! when their contents compare equal.
//!
//! The mapping tables hold a strong `Arc` clone for every registered
//! recipient, so the address backing a live key cannot be freed and recycled
//! while the registration exists.

use std::sync::Arc;

/// Identity key for one registered recipient.
///
/// Equality and hashing use the `Arc` allocation address only. The wrapped
/// type's own `PartialEq`/`Hash` implementations are never consulted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecipientKey(usize);

impl RecipientKey {
    /// Derive the key for a recipient handle.
    ///
    /// Cloned handles of the same allocation map to the same key.
    pub fn of<R: ?Sized>(recipient: &Arc<R>) -> Self {
        Self(Arc::as_ptr(recipient).cast::<()>() as usize)
    }
}

impl std::fmt::Debug for RecipientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecipientKey({:#x})", self.0)
    }
}
