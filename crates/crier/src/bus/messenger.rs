// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Messenger facade and dispatch engine.
//!
//! The messenger composes the core structures behind one lock:
//!
//! ```text
//! Messenger
//! +-- state: Mutex<State>
//! |   +-- registry: TypeRegistry        TypeKey -> MappingTable
//! |   +-- index: RecipientIndex         RecipientKey -> {TypeKey}
//! +-- pool: Arc<SnapshotPool>           shared scratch buffers
//! ```
//!
//! # Locking Discipline
//!
//! One mutex guards the registry, every table, and the index as a single
//! unit. Register, unregister, reset, and is_registered hold it for their
//! whole duration. Send holds it only while copying the matching
//! (recipient, handler) pairs into a pooled buffer:
//!
//! 1. lock, look up the table, snapshot matches into a rented buffer
//! 2. unlock
//! 3. invoke the snapshot sequentially on the calling thread
//!
//! Handlers therefore run unlocked and may call back into register,
//! unregister, or send without deadlock. The flip side is snapshot
//! isolation: a recipient registered while a send is in flight is not seen
//! by that send, and a recipient unregistered mid-send is still invoked if
//! it was already captured.

use std::any::{type_name, Any};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bus::handler::{MessageHandler, MessageListener};
use crate::bus::{Error, Result, Token};
use crate::core::index::RecipientIndex;
use crate::core::key::TypeKey;
use crate::core::recipient::RecipientKey;
use crate::core::registry::TypeRegistry;
use crate::core::table::{DuplicateHandler, HandlerSlot};
use crate::core::{shared_pool, SnapshotPool};

/// Registry and index, mutated together under the messenger lock.
struct State {
    registry: TypeRegistry,
    index: RecipientIndex,
}

impl State {
    fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            index: RecipientIndex::new(),
        }
    }
}

/// Strongly-typed in-process publish/subscribe messenger.
///
/// Recipients register interest in a message type on a channel (the token);
/// any caller broadcasts a message of that type on that channel and exactly
/// the matching handlers run, synchronously, on the calling thread.
///
/// The messenger holds a strong handle to every registered recipient, so a
/// recipient stays alive until it is unregistered or the messenger is reset.
///
/// # Example
///
/// ```
/// use crier::Messenger;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// struct TemperatureChanged {
///     celsius: i32,
/// }
///
/// struct Display {
///     updates: AtomicU32,
/// }
///
/// let messenger = Messenger::new();
/// let display = Arc::new(Display { updates: AtomicU32::new(0) });
///
/// messenger.register(
///     &display,
///     "sensors",
///     |display: &Display, message: &mut TemperatureChanged| {
///         display.updates.fetch_add(1, Ordering::SeqCst);
///         message.celsius += 1;
///     },
/// )?;
///
/// let message = messenger.send(TemperatureChanged { celsius: 20 }, &"sensors");
/// assert_eq!(message.celsius, 21);
/// assert_eq!(display.updates.load(Ordering::SeqCst), 1);
/// # Ok::<(), crier::Error>(())
/// ```
///
/// # Thread Safety
///
/// All operations take `&self` and are safe to call from any thread.
/// Handlers run on whichever thread called `send`.
pub struct Messenger {
    state: Mutex<State>,
    pool: Arc<SnapshotPool>,
}

impl Messenger {
    /// Create a messenger backed by the process-wide snapshot pool.
    ///
    /// Equivalent to `Messenger::builder().build()`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new messenger builder.
    ///
    /// # Example
    /// ```
    /// use crier::{Messenger, SnapshotPool};
    /// use std::sync::Arc;
    ///
    /// let messenger = Messenger::builder()
    ///     .snapshot_pool(Arc::new(SnapshotPool::new()))
    ///     .build();
    /// ```
    pub fn builder() -> MessengerBuilder {
        MessengerBuilder::new()
    }

    /// Get the process-wide default messenger.
    ///
    /// Created on first access, alive until process exit. Prefer owning an
    /// explicit instance; the global is convenience for callers that share
    /// one bus across a whole process.
    pub fn global() -> &'static Messenger {
        use std::sync::OnceLock;
        static GLOBAL: OnceLock<Messenger> = OnceLock::new();
        GLOBAL.get_or_init(Messenger::new)
    }

    /// Register `handler` for messages of type `M` sent on `token`.
    ///
    /// The handler runs for every matching send until unregistered. A
    /// recipient may register the same message type under many tokens; each
    /// (message type, token) pair is an independent registration.
    ///
    /// Fails with [`Error::DuplicateRegistration`] when this exact
    /// (recipient, message type, token) triple is already registered. The
    /// existing registration is left untouched and the new handler is
    /// discarded.
    ///
    /// # Example
    /// ```
    /// use crier::Messenger;
    /// use std::sync::Arc;
    ///
    /// struct Ping;
    /// struct Sensor;
    ///
    /// let messenger = Messenger::new();
    /// let sensor = Arc::new(Sensor);
    /// messenger.register(&sensor, 7u32, |_sensor: &Sensor, _message: &mut Ping| {})?;
    /// assert!(messenger.is_registered::<Ping, _, _>(&sensor, &7u32));
    /// # Ok::<(), crier::Error>(())
    /// ```
    pub fn register<R, M, T, H>(&self, recipient: &Arc<R>, token: T, handler: H) -> Result<()>
    where
        R: Send + Sync + 'static,
        M: 'static,
        T: Token,
        H: MessageHandler<R, M> + 'static,
    {
        let type_key = TypeKey::of::<M, T>();
        let recipient_key = RecipientKey::of(recipient);
        let handle: Arc<dyn Any + Send + Sync> = recipient.clone();
        let slot = HandlerSlot::new(move |recipient: &R, message: &mut M| {
            handler.handle(recipient, message);
        });

        let mut state = self.lock_state();
        let table = state.registry.get_or_create::<M, T>();
        match table.try_insert(recipient_key, &handle, token, slot) {
            Ok(()) => {
                state.index.track(recipient_key, type_key);
                log::debug!(
                    "[Messenger::register] {:?} registered for ({}, {})",
                    recipient_key,
                    type_name::<M>(),
                    type_name::<T>()
                );
                Ok(())
            }
            Err(DuplicateHandler) => Err(Error::DuplicateRegistration {
                message_type: type_name::<M>(),
                token_type: type_name::<T>(),
            }),
        }
    }

    /// Register a [`MessageListener`] recipient for messages of type `M` on
    /// `token`.
    ///
    /// Sugar over [`register`](Self::register) wiring `R::on_message` up as
    /// the handler; duplicate rules are identical.
    ///
    /// # Example
    /// ```
    /// use crier::{Messenger, MessageListener};
    /// use std::sync::Arc;
    ///
    /// struct Ping;
    /// struct Sensor;
    ///
    /// impl MessageListener<Ping> for Sensor {
    ///     fn on_message(&self, _message: &mut Ping) {}
    /// }
    ///
    /// let messenger = Messenger::new();
    /// let sensor = Arc::new(Sensor);
    /// messenger.register_listener::<Ping, _, _>(&sensor, ())?;
    /// # Ok::<(), crier::Error>(())
    /// ```
    pub fn register_listener<M, T, R>(&self, recipient: &Arc<R>, token: T) -> Result<()>
    where
        M: 'static,
        T: Token,
        R: MessageListener<M> + Send + Sync + 'static,
    {
        self.register(recipient, token, |recipient: &R, message: &mut M| {
            recipient.on_message(message);
        })
    }

    /// Remove the registration of `recipient` for (`M`, `token`).
    ///
    /// No-op when nothing matches; never fails. Emptied rows and tables are
    /// pruned immediately.
    pub fn unregister<M, T, R>(&self, recipient: &Arc<R>, token: &T)
    where
        M: 'static,
        T: Token,
        R: ?Sized,
    {
        let type_key = TypeKey::of::<M, T>();
        let recipient_key = RecipientKey::of(recipient);

        let mut state = self.lock_state();
        let mut removed = false;
        let mut row_pruned = false;
        let mut drop_table = false;
        if let Some(table) = state.registry.get_mut::<M, T>() {
            let outcome = table.remove(recipient_key, token);
            removed = outcome.removed;
            row_pruned = outcome.row_pruned;
            drop_table = table.recipient_count() == 0;
        }
        if row_pruned {
            state.index.untrack(recipient_key, type_key);
        }
        if drop_table {
            state.registry.remove(&type_key);
        }

        if removed {
            log::debug!(
                "[Messenger::unregister] {:?} unregistered from ({}, {})",
                recipient_key,
                type_name::<M>(),
                type_name::<T>()
            );
        }
    }

    /// Remove every registration of `recipient`, across all message types
    /// and tokens.
    ///
    /// Visits only the tables the recipient actually joined, via the
    /// recipient index. No-op for an unknown recipient; never fails.
    pub fn unregister_all<R: ?Sized>(&self, recipient: &Arc<R>) {
        let recipient_key = RecipientKey::of(recipient);

        let mut state = self.lock_state();
        let Some(type_keys) = state.index.take(recipient_key) else {
            return;
        };

        let joined = type_keys.len();
        for type_key in type_keys {
            let mut drop_table = false;
            if let Some(table) = state.registry.erased_mut(&type_key) {
                table.remove_recipient(recipient_key);
                drop_table = table.is_empty();
            }
            if drop_table {
                state.registry.remove(&type_key);
            }
        }

        log::debug!(
            "[Messenger::unregister_all] {:?} removed from {} tables",
            recipient_key,
            joined
        );
    }

    /// Remove every registration of `recipient` under `token`, across all
    /// message types.
    ///
    /// Registrations under other tokens survive. No-op when nothing matches;
    /// never fails.
    pub fn unregister_all_token<T, R>(&self, recipient: &Arc<R>, token: &T)
    where
        T: Token,
        R: ?Sized,
    {
        let recipient_key = RecipientKey::of(recipient);

        let mut state = self.lock_state();
        let type_keys: Vec<TypeKey> = match state.index.type_keys(recipient_key) {
            Some(set) => set.iter().copied().collect(),
            None => return,
        };

        for type_key in type_keys {
            let mut row_pruned = false;
            let mut drop_table = false;
            if let Some(table) = state.registry.erased_mut(&type_key) {
                row_pruned = table.remove_recipient_token(recipient_key, token);
                drop_table = table.is_empty();
            }
            if row_pruned {
                state.index.untrack(recipient_key, type_key);
            }
            if drop_table {
                state.registry.remove(&type_key);
            }
        }
    }

    /// True when `recipient` is registered for (`M`, `token`).
    ///
    /// Pure lookup; no mutation, never fails.
    pub fn is_registered<M, T, R>(&self, recipient: &Arc<R>, token: &T) -> bool
    where
        M: 'static,
        T: Token,
        R: ?Sized,
    {
        let recipient_key = RecipientKey::of(recipient);
        let state = self.lock_state();
        state
            .registry
            .get::<M, T>()
            .map(|table| table.contains(recipient_key, token))
            .unwrap_or(false)
    }

    /// Broadcast `message` to every recipient registered for (`M`, `token`)
    /// and return it.
    ///
    /// Matching handlers run sequentially on the calling thread, in
    /// unspecified order, each receiving the message mutably; the possibly
    /// mutated message is returned to the caller. A combination with no
    /// registrations returns the message unchanged without renting a buffer.
    ///
    /// # Snapshot Isolation
    ///
    /// The invocation set is fixed under the lock before any handler runs.
    /// Handlers may call back into register, unregister, or send; such calls
    /// affect later sends, never the snapshot already in flight. An
    /// unregistered-mid-send recipient is still invoked if captured, its
    /// handle held alive by the snapshot.
    ///
    /// # Panics
    ///
    /// A panic in a handler propagates to the caller and the remaining
    /// snapshot entries are skipped (fail-fast). The rented buffer is
    /// returned to the pool during unwinding, so a failing handler leaks
    /// nothing; the messenger stays fully usable afterwards.
    ///
    /// # Thread Safety
    ///
    /// Concurrent sends serialize only their snapshot phases; invocation
    /// runs unlocked and interleaves freely across threads.
    pub fn send<M, T>(&self, mut message: M, token: &T) -> M
    where
        M: 'static,
        T: Token,
    {
        let buffer = {
            let state = self.lock_state();
            let Some(table) = state.registry.get::<M, T>() else {
                return message;
            };

            let mut buffer = self.pool.acquire(table.recipient_count());
            table.snapshot_into(token, &mut buffer);
            buffer
        };

        for pair in buffer.pairs() {
            if let Some(slot) = pair.slot.downcast_ref::<HandlerSlot<M>>() {
                slot.invoke(pair.recipient.as_ref(), &mut message);
            }
        }

        message
    }

    /// Drop every registration, table, and index entry.
    ///
    /// Equivalent to discarding the messenger and creating a fresh one; the
    /// snapshot pool is untouched. Never fails.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        let dropped = state.registry.table_count();
        state.registry.clear();
        state.index.clear();
        log::debug!("[Messenger::reset] dropped {} mapping tables", dropped);
    }

    /// Number of distinct recipients holding at least one registration.
    pub fn recipient_count(&self) -> usize {
        self.lock_state().index.recipient_count()
    }

    /// Number of live (message type, token type) tables.
    pub fn table_count(&self) -> usize {
        self.lock_state().registry.table_count()
    }

    /// True when no registration exists.
    pub fn is_empty(&self) -> bool {
        self.table_count() == 0
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::debug!("[Messenger] state lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("recipient_count", &self.recipient_count())
            .field("table_count", &self.table_count())
            .finish()
    }
}

/// Builder for configuring and creating a [`Messenger`].
pub struct MessengerBuilder {
    pool: Option<Arc<SnapshotPool>>,
}

impl MessengerBuilder {
    fn new() -> Self {
        Self { pool: None }
    }

    /// Use a dedicated snapshot pool instead of the process-wide one.
    ///
    /// Several messengers may share one pool by handing the same `Arc` to
    /// each builder; tests use isolated pools to observe buffer reuse.
    pub fn snapshot_pool(mut self, pool: Arc<SnapshotPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Build the messenger.
    pub fn build(self) -> Messenger {
        Messenger {
            state: Mutex::new(State::new()),
            pool: self.pool.unwrap_or_else(shared_pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Probe {
        hits: AtomicU32,
    }

    impl Probe {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                hits: AtomicU32::new(0),
            })
        }

        fn hits(&self) -> u32 {
            self.hits.load(Ordering::SeqCst)
        }
    }

    struct Ping {
        value: u32,
    }

    fn counting_handler() -> impl Fn(&Probe, &mut Ping) + Send + Sync {
        |probe: &Probe, _message: &mut Ping| {
            probe.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_register_and_send() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");

        let message = messenger.send(Ping { value: 1 }, &"default");
        assert_eq!(message.value, 1);
        assert_eq!(probe.hits(), 1);
    }

    #[test]
    fn test_register_clones_recipient_handle() {
        let messenger = Messenger::new();
        let probe = Probe::new();
        assert_eq!(Arc::strong_count(&probe), 1);

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");
        assert_eq!(Arc::strong_count(&probe), 2);

        // Same table row; no second handle is taken.
        messenger
            .register(&probe, "other", counting_handler())
            .expect("register should succeed");
        assert_eq!(Arc::strong_count(&probe), 2);

        messenger.unregister_all(&probe);
        assert_eq!(Arc::strong_count(&probe), 1);
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");

        let result = messenger.register(
            &probe,
            "default",
            |probe: &Probe, _message: &mut Ping| {
                probe.hits.fetch_add(100, Ordering::SeqCst);
            },
        );
        assert!(matches!(result, Err(Error::DuplicateRegistration { .. })));

        messenger.send(Ping { value: 0 }, &"default");
        assert_eq!(probe.hits(), 1, "original handler must remain in place");
    }

    #[test]
    fn test_send_mutates_message_in_place() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, (), |_probe: &Probe, message: &mut Ping| {
                message.value *= 2;
            })
            .expect("register should succeed");

        let message = messenger.send(Ping { value: 21 }, &());
        assert_eq!(message.value, 42);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");

        messenger.unregister::<Ping, _, _>(&probe, &"default");
        assert!(!messenger.is_registered::<Ping, _, _>(&probe, &"default"));

        // Second call is a no-op, not an error.
        messenger.unregister::<Ping, _, _>(&probe, &"default");
        assert!(messenger.is_empty());
    }

    #[test]
    fn test_reregistration_after_unregister() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");
        messenger.unregister::<Ping, _, _>(&probe, &"default");
        messenger
            .register(&probe, "default", counting_handler())
            .expect("re-registration should succeed");

        messenger.send(Ping { value: 0 }, &"default");
        assert_eq!(probe.hits(), 1);
    }

    #[test]
    fn test_reregistration_after_unregister_all() {
        struct Pong;

        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");
        messenger
            .register(&probe, "default", |_probe: &Probe, _message: &mut Pong| {})
            .expect("register should succeed");
        assert_eq!(messenger.table_count(), 2);

        messenger.unregister_all(&probe);
        assert!(messenger.is_empty());
        assert_eq!(messenger.recipient_count(), 0);

        messenger
            .register(&probe, "default", counting_handler())
            .expect("re-registration should succeed");
        messenger.send(Ping { value: 0 }, &"default");
        assert_eq!(probe.hits(), 1);
    }

    #[test]
    fn test_pruning_keeps_counts_exact() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "one", counting_handler())
            .expect("register should succeed");
        messenger
            .register(&probe, "two", counting_handler())
            .expect("register should succeed");
        assert_eq!(messenger.recipient_count(), 1);
        assert_eq!(messenger.table_count(), 1);

        messenger.unregister::<Ping, _, _>(&probe, &"one");
        assert_eq!(messenger.recipient_count(), 1);
        assert_eq!(messenger.table_count(), 1);

        messenger.unregister::<Ping, _, _>(&probe, &"two");
        assert_eq!(messenger.recipient_count(), 0);
        assert_eq!(messenger.table_count(), 0);
        assert!(messenger.is_empty());
    }

    #[test]
    fn test_reset_clears_everything() {
        let messenger = Messenger::new();
        let probe = Probe::new();

        messenger
            .register(&probe, "default", counting_handler())
            .expect("register should succeed");
        messenger
            .register(&probe, 7u32, counting_handler())
            .expect("register should succeed");
        assert_eq!(messenger.table_count(), 2);

        messenger.reset();

        assert!(messenger.is_empty());
        assert_eq!(messenger.recipient_count(), 0);
        assert!(!messenger.is_registered::<Ping, _, _>(&probe, &"default"));

        messenger.send(Ping { value: 0 }, &"default");
        assert_eq!(probe.hits(), 0);
    }

    #[test]
    fn test_global_returns_same_instance() {
        let first = Messenger::global() as *const Messenger;
        let second = Messenger::global() as *const Messenger;
        assert_eq!(first, second);
    }

    #[test]
    fn test_builder_uses_custom_pool() {
        let pool = Arc::new(SnapshotPool::new());
        let messenger = Messenger::builder()
            .snapshot_pool(Arc::clone(&pool))
            .build();
        let probe = Probe::new();

        messenger
            .register(&probe, (), counting_handler())
            .expect("register should succeed");
        messenger.send(Ping { value: 0 }, &());

        // The send rented from the dedicated pool and returned its buffer.
        assert_eq!(pool.miss_count(), 1);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_listener_registration() {
        struct Counter {
            seen: AtomicU32,
        }

        impl MessageListener<Ping> for Counter {
            fn on_message(&self, message: &mut Ping) {
                self.seen.fetch_add(message.value, Ordering::SeqCst);
            }
        }

        let messenger = Messenger::new();
        let counter = Arc::new(Counter {
            seen: AtomicU32::new(0),
        });

        messenger
            .register_listener::<Ping, _, _>(&counter, "default")
            .expect("register should succeed");
        messenger.send(Ping { value: 5 }, &"default");

        assert_eq!(counter.seen.load(Ordering::SeqCst), 5);

        let duplicate = messenger.register_listener::<Ping, _, _>(&counter, "default");
        assert!(matches!(
            duplicate,
            Err(Error::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn test_identity_not_value_equality() {
        let messenger = Messenger::new();
        let first = Arc::new(0u32);
        let second = Arc::new(0u32);

        messenger
            .register(&first, (), |_recipient: &u32, _message: &mut Ping| {})
            .expect("register should succeed");

        assert!(messenger.is_registered::<Ping, _, _>(&first, &()));
        assert!(!messenger.is_registered::<Ping, _, _>(&second, &()));
    }
}
