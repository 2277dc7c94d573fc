// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Crier - Strongly-Typed In-Process Messenger
//!
//! A pure Rust publish/subscribe bus for decoupled components inside one
//! process: recipients register interest in (message type, channel token)
//! pairs, senders broadcast values of those types, and every matching
//! handler runs synchronously with full type safety and no reflection.
//!
//! ## Quick Start
//!
//! ```rust
//! use crier::{Messenger, Result};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     struct LogoutRequested {
//!         user_id: u64,
//!     }
//!
//!     struct SessionTracker {
//!         closed: AtomicU32,
//!     }
//!
//!     let messenger = Messenger::new();
//!     let tracker = Arc::new(SessionTracker { closed: AtomicU32::new(0) });
//!
//!     // Subscribe on the default channel.
//!     messenger.register(
//!         &tracker,
//!         (),
//!         |tracker: &SessionTracker, _message: &mut LogoutRequested| {
//!             tracker.closed.fetch_add(1, Ordering::SeqCst);
//!         },
//!     )?;
//!
//!     // Publish: the handler runs before send returns.
//!     messenger.send(LogoutRequested { user_id: 7 }, &());
//!     assert_eq!(tracker.closed.load(Ordering::SeqCst), 1);
//!
//!     messenger.unregister_all(&tracker);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        Application Layer                            |
//! |    register / register_listener / send / unregister / reset         |
//! +---------------------------------------------------------------------+
//! |                           Bus Layer                                 |
//! |    Messenger facade | Token channels | Request envelopes            |
//! +---------------------------------------------------------------------+
//! |                           Core Layer                                |
//! |    TypeRegistry | MappingTable | RecipientIndex | TypeKey           |
//! +---------------------------------------------------------------------+
//! |                          Memory Layer                               |
//! |    SnapshotPool | SnapshotBuffer | capacity-class freelists         |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Messenger`] | The bus itself; registration, dispatch, introspection |
//! | [`Token`] | Channel discriminator splitting one message type into streams |
//! | [`MessageListener`] | Trait-based alternative to closure handlers |
//! | [`Request`] | Query-style message carrying a response slot |
//! | [`SnapshotPool`] | Reusable dispatch buffers behind zero-allocation sends |
//!
//! ## Features
//!
//! - **Strongly typed** end to end: handler signatures are checked at compile time
//! - **Zero-allocation** steady-state sends via pooled snapshot buffers
//! - **Snapshot isolation**: handlers may register, unregister, and send reentrantly
//! - **Identity semantics**: registration follows the `Arc` allocation, not value equality
//! - **Thread-safe** throughout; every operation takes `&self`
//!
//! ## Modules Overview
//!
//! - [`bus`] - Public messenger API (start here)
//! - [`core`] - Registry, mapping tables, recipient index, snapshot pooling
//!
//! ## See Also
//!
//! - [`Messenger`] - Entry point for registration and dispatch
//! - [`bus::prelude`] - One-line import of the common surface

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Public messenger API (Messenger, handlers, tokens, requests).
pub mod bus;
/// Registration storage and dispatch machinery (registry, tables, pooling).
pub mod core;

pub use bus::prelude;
pub use bus::{
    Error, MessageHandler, MessageListener, Messenger, MessengerBuilder, Request, Result, Token,
};

// Re-export the pool type for MessengerBuilder::snapshot_pool callers
pub use core::SnapshotPool;

/// Crier version string.
pub const VERSION: &str = "0.3.2";
