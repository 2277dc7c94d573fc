// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response envelope for query-style messages.
//!
//! A [`Request`] travels through the messenger like any other message type;
//! handlers answer it through the mutable reference they already receive,
//! and the sender reads the answer out of the value `send` hands back. No
//! extra channel or callback is involved.
//!
//! # Design
//!
//! The first response wins. [`Request::respond`] reports whether the answer
//! was recorded, so a handler can tell it raced with an earlier recipient
//! and skip expensive work. Sends that reach no recipient simply come back
//! unanswered; the sender decides whether that is an error.

/// A message that expects a single response of type `T`.
///
/// # Example
///
/// ```
/// use crier::{Messenger, Request};
/// use std::sync::Arc;
///
/// struct Thermometer;
///
/// let messenger = Messenger::new();
/// let thermometer = Arc::new(Thermometer);
///
/// messenger.register(
///     &thermometer,
///     (),
///     |_thermometer: &Thermometer, request: &mut Request<i32>| {
///         request.respond(21);
///     },
/// )?;
///
/// let request = messenger.send(Request::new(), &());
/// assert_eq!(request.take_response(), Some(21));
/// # Ok::<(), crier::Error>(())
/// ```
pub struct Request<T> {
    response: Option<T>,
}

impl<T> Request<T> {
    /// Create an unanswered request.
    pub fn new() -> Self {
        Self { response: None }
    }

    /// Record `value` as the response.
    ///
    /// Returns true when the response was recorded, false when an earlier
    /// handler already answered (the first response wins and `value` is
    /// dropped).
    pub fn respond(&mut self, value: T) -> bool {
        if self.response.is_some() {
            return false;
        }
        self.response = Some(value);
        true
    }

    /// True once some handler has answered.
    pub fn is_answered(&self) -> bool {
        self.response.is_some()
    }

    /// Borrow the response, if any.
    pub fn response(&self) -> Option<&T> {
        self.response.as_ref()
    }

    /// Consume the envelope and return the response, if any.
    pub fn take_response(self) -> Option<T> {
        self.response
    }
}

impl<T> Default for Request<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("answered", &self.is_answered())
            .finish()
    }
}
