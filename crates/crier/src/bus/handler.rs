// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Handler and listener traits.
//!
//! Handlers are the callables a [`Messenger`](crate::bus::Messenger) invokes
//! during send. Plain closures and fn pointers implement
//! [`MessageHandler`] through the blanket impl; named handler types can
//! implement it directly. Recipients that want to receive a message type as
//! part of their own interface implement [`MessageListener`] and register
//! through `register_listener`.
//!
//! # Usage
//!
//! ```
//! use crier::{Messenger, MessageListener};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! struct Ping;
//!
//! struct Counter {
//!     seen: AtomicU32,
//! }
//!
//! impl MessageListener<Ping> for Counter {
//!     fn on_message(&self, _message: &mut Ping) {
//!         self.seen.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let messenger = Messenger::new();
//! let counter = Arc::new(Counter { seen: AtomicU32::new(0) });
//! messenger.register_listener::<Ping, _, _>(&counter, ())?;
//! messenger.send(Ping, &());
//! assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
//! # Ok::<(), crier::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! Handlers run on whichever thread calls `send`. They must be
//! `Send + Sync`; they may freely call back into the messenger.

/// Handler invoked when a matching message is sent.
///
/// The blanket impl covers closures and fn pointers of shape
/// `Fn(&R, &mut M)`, so most call sites never name this trait. Implement it
/// directly when a handler carries its own state or needs a name.
///
/// # Example
///
/// ```
/// use crier::MessageHandler;
///
/// struct Logger;
/// struct Ping;
///
/// struct LogHandler;
///
/// impl MessageHandler<Logger, Ping> for LogHandler {
///     fn handle(&self, _recipient: &Logger, _message: &mut Ping) {
///         // react to the ping
///     }
/// }
/// ```
pub trait MessageHandler<R, M>: Send + Sync {
    /// Handle a broadcast message on behalf of `recipient`.
    ///
    /// The message is shared mutably with every handler in the send's
    /// snapshot; mutations are visible to handlers invoked later in the same
    /// send and to the sender after `send` returns.
    fn handle(&self, recipient: &R, message: &mut M);
}

impl<R, M, F> MessageHandler<R, M> for F
where
    F: Fn(&R, &mut M) + Send + Sync,
{
    fn handle(&self, recipient: &R, message: &mut M) {
        self(recipient, message);
    }
}

/// Interface for recipients that receive messages of type `M` directly.
///
/// `Messenger::register_listener` wires `on_message` up as the handler, so a
/// type implementing this trait for several message types can register each
/// of them with one call apiece and keep the handling logic on the type
/// itself.
pub trait MessageListener<M>: Send + Sync {
    /// Called once per matching send with the in-flight message.
    fn on_message(&self, message: &mut M);
}
