// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the messenger API.
//!
//! # Example
//!
//! ```rust
//! use crier::bus::prelude::*;
//!
//! struct Ping;
//!
//! let messenger = Messenger::new();
//! messenger.send(Ping, &());
//! ```

pub use super::{
    Error, MessageHandler, MessageListener, Messenger, MessengerBuilder, Request, Result, Token,
};
