// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Messenger Core API
//!
//! This module contains the primary publish/subscribe API for crier.
//!
//! ## Overview
//!
//! The API provides strongly-typed, broker-style message passing between
//! decoupled components inside one process. Key concepts:
//!
//! - **Messenger**: The bus itself; owns every registration and dispatches sends
//! - **Recipient**: Any `Arc`-held value registered to receive messages
//! - **Message**: Any `'static` type; no marker trait or derive required
//! - **Token**: Channel discriminator; same message type, separate streams
//! - **Handler**: Closure or [`MessageListener`] invoked per matching send
//!
//! ## Quick Start
//!
//! ```rust
//! use crier::Messenger;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! struct JobFinished {
//!     id: u64,
//! }
//!
//! struct StatusBar {
//!     refreshes: AtomicU32,
//! }
//!
//! let messenger = Messenger::new();
//! let status_bar = Arc::new(StatusBar { refreshes: AtomicU32::new(0) });
//!
//! // Subscribe: StatusBar wants JobFinished on the default channel.
//! messenger.register(
//!     &status_bar,
//!     (),
//!     |bar: &StatusBar, _message: &mut JobFinished| {
//!         bar.refreshes.fetch_add(1, Ordering::SeqCst);
//!     },
//! )?;
//!
//! // Publish: handlers run synchronously on this thread.
//! messenger.send(JobFinished { id: 7 }, &());
//! assert_eq!(status_bar.refreshes.load(Ordering::SeqCst), 1);
//!
//! // Unsubscribe everything for this recipient.
//! messenger.unregister_all(&status_bar);
//! # Ok::<(), crier::Error>(())
//! ```
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! send(message, token)
//!   |
//!   v
//! [lock] TypeRegistry --TypeKey--> MappingTable --token--> snapshot [unlock]
//!   |
//!   v
//! handler(recipient_1, &mut message) ... handler(recipient_n, &mut message)
//!   |
//!   v
//! message returned to caller
//! ```
//!
//! ## See Also
//!
//! - [`Messenger`] - Start here
//! - [`Token`] - Channel discriminator contract
//! - [`MessageListener`] - Trait-based alternative to closure handlers
//! - [`Request`] - Query-style messages with a response slot

/// Handler and listener traits for message consumption.
pub mod handler;
mod messenger;
/// Prelude module for convenient imports.
pub mod prelude;
mod request;

pub use handler::{MessageHandler, MessageListener};
pub use messenger::{Messenger, MessengerBuilder};
pub use request::Request;

use std::hash::Hash;

/// Errors returned by crier messenger operations.
///
/// # Example
///
/// ```rust
/// use crier::{Error, Messenger};
/// use std::sync::Arc;
///
/// struct Ping;
///
/// let messenger = Messenger::new();
/// let recipient = Arc::new(0u32);
/// messenger.register(&recipient, (), |_r: &u32, _m: &mut Ping| {})?;
///
/// let result = messenger.register(&recipient, (), |_r: &u32, _m: &mut Ping| {});
/// match result {
///     Err(Error::DuplicateRegistration { message_type, .. }) => {
///         println!("already handling {}", message_type);
///     }
///     Err(e) => println!("other error: {}", e),
///     Ok(_) => println!("registered"),
/// }
/// # Ok::<(), crier::Error>(())
/// ```
#[derive(Debug)]
pub enum Error {
    /// The (recipient, message type, token) triple is already registered.
    ///
    /// The original registration is untouched; the rejected handler was
    /// dropped. Type names identify the colliding pair in logs.
    DuplicateRegistration {
        /// Name of the message type of the rejected registration.
        message_type: &'static str,
        /// Name of the token type of the rejected registration.
        token_type: &'static str,
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::DuplicateRegistration {
                message_type,
                token_type,
            } => write!(
                f,
                "Duplicate registration: recipient already handles ({}, {})",
                message_type, token_type
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

/// Token contract: channel discriminator for registrations and sends.
///
/// A token value names the channel a registration listens on; sends deliver
/// only to registrations whose token compares equal. The unit type `()` is
/// the conventional default channel. Integers, strings, and dedicated enums
/// all qualify through the blanket implementation, so user code never
/// implements this trait by hand.
///
/// Two tokens of *different types* never match, even when their values look
/// alike: the token type is part of the table key, the token value is the
/// key within the table.
pub trait Token: Hash + Eq + Send + Sync + 'static {}

impl<T> Token for T where T: Hash + Eq + Send + Sync + 'static {}
