//! Event dispatcher: a type-keyed publish/subscribe registry.
//!
//! Subscribers register per [`EventKind`] and receive every emitted event of
//! that kind synchronously, in registration order.  The dispatcher is the
//! fan-out point between the connection layer (the single producer) and any
//! number of consumer-facing facades.
//!
//! # Delivery guarantees
//!
//! - Handlers for one emission run in the order they were registered.
//! - Each handler is isolated: a panicking handler is logged and skipped,
//!   and the remaining handlers of the same emission still run.  A handler
//!   panic is never re-emitted as an [`EventKind::Error`] event, which would
//!   feed the failure back into the registry.
//! - `emit` snapshots the registration list before invoking anything, so
//!   handlers may subscribe or unsubscribe (themselves included) without
//!   affecting the in-progress emission.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;
use uuid::Uuid;

use crate::protocol::events::{ChannelEvent, EventKind};

/// Opaque token identifying one registration.
///
/// Returned by [`Dispatcher::on`] and consumed by [`Dispatcher::off`].
/// Closures have no identity of their own, so the token is what makes
/// "remove exactly the handler I registered" expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

/// Boxed subscriber callback.
type Handler = Arc<dyn Fn(&ChannelEvent) + Send + Sync>;

struct Registration {
    id: HandlerId,
    handler: Handler,
}

/// The subscriber registry.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
#[derive(Default)]
pub struct Dispatcher {
    registry: Mutex<HashMap<EventKind, Vec<Registration>>>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind` and returns its registration token.
    ///
    /// The same closure may be registered multiple times; each registration
    /// is independent and receives the event once per registration.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&ChannelEvent) + Send + Sync + 'static,
    {
        let id = HandlerId(Uuid::new_v4());
        let mut registry = self.lock_registry();
        registry.entry(kind).or_default().push(Registration {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Removes the registration identified by `id` under `kind`.
    ///
    /// Removing a token that is not registered (or was already removed) is a
    /// no-op, not an error; repeated mount/unmount cycles must leave no
    /// residue either way.  Returns `true` when a registration was removed.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut registry = self.lock_registry();
        match registry.get_mut(&kind) {
            Some(registrations) => {
                let before = registrations.len();
                registrations.retain(|r| r.id != id);
                before != registrations.len()
            }
            None => false,
        }
    }

    /// Delivers `event` to every handler currently registered for its kind.
    ///
    /// The registration list is snapshotted before the first handler runs;
    /// registry mutations performed by handlers take effect for subsequent
    /// emissions only.
    pub fn emit(&self, event: &ChannelEvent) {
        let snapshot: Vec<Handler> = {
            let registry = self.lock_registry();
            match registry.get(&event.kind()) {
                Some(registrations) => registrations.iter().map(|r| Arc::clone(&r.handler)).collect(),
                None => return,
            }
        };

        for handler in snapshot {
            // Isolate each handler: one panicking subscriber must not rob
            // the others of the event.
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!("event handler panicked for {:?}; continuing", event.kind());
            }
        }
    }

    /// Number of live registrations for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.lock_registry().get(&kind).map_or(0, Vec::len)
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, HashMap<EventKind, Vec<Registration>>> {
        // Handlers never run under this lock, so a poisoned registry can only
        // mean a panic between lock and unlock in this module; the map itself
        // is still structurally sound.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.lock_registry();
        let counts: HashMap<EventKind, usize> =
            registry.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("Dispatcher").field("handlers", &counts).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::events::{ErrorEvent, EventKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn error_event(message: &str) -> ChannelEvent {
        ChannelEvent::Error(ErrorEvent {
            message: message.to_string(),
        })
    }

    #[test]
    fn test_emit_invokes_registered_handler() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_handler = Arc::clone(&hits);
        dispatcher.on(EventKind::Error, move |_| {
            hits_handler.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.emit(&error_event("x"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let dispatcher = Dispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            dispatcher.on(EventKind::Error, move |_| {
                order.lock().unwrap().push(label);
            });
        }

        dispatcher.emit(&error_event("x"));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_emit_only_reaches_handlers_of_matching_kind() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_handler = Arc::clone(&hits);
        dispatcher.on(EventKind::Connection, move |_| {
            hits_handler.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.emit(&error_event("x"));
        assert_eq!(hits.load(Ordering::SeqCst), 0, "wrong kind must not fire");
    }

    #[test]
    fn test_register_then_unregister_leaves_no_residue() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_handler = Arc::clone(&hits);
        let id = dispatcher.on(EventKind::Error, move |_| {
            hits_handler.fetch_add(1, Ordering::SeqCst);
        });
        assert!(dispatcher.off(EventKind::Error, id));

        dispatcher.emit(&error_event("x"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.handler_count(EventKind::Error), 0);
    }

    #[test]
    fn test_off_with_unknown_id_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let id = dispatcher.on(EventKind::Error, |_| {});

        // Wrong kind and already-removed token are both silent no-ops.
        assert!(!dispatcher.off(EventKind::Connection, id));
        assert!(dispatcher.off(EventKind::Error, id));
        assert!(!dispatcher.off(EventKind::Error, id));
    }

    #[test]
    fn test_panicking_handler_does_not_starve_later_handlers() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        dispatcher.on(EventKind::Error, |_| panic!("subscriber bug"));
        let hits_handler = Arc::clone(&hits);
        dispatcher.on(EventKind::Error, move |_| {
            hits_handler.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.emit(&error_event("x"));
        assert_eq!(
            hits.load(Ordering::SeqCst),
            1,
            "handler after the panicking one must still run"
        );
    }

    #[test]
    fn test_handler_may_unsubscribe_itself_during_emission() {
        let dispatcher = Arc::new(Dispatcher::new());
        let hits = Arc::new(AtomicUsize::new(0));

        // The handler removes its own registration on first delivery.
        let id_slot: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));
        let dispatcher_inner = Arc::clone(&dispatcher);
        let id_slot_inner = Arc::clone(&id_slot);
        let hits_handler = Arc::clone(&hits);
        let id = dispatcher.on(EventKind::Error, move |_| {
            hits_handler.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_slot_inner.lock().unwrap() {
                dispatcher_inner.off(EventKind::Error, id);
            }
        });
        *id_slot.lock().unwrap() = Some(id);

        dispatcher.emit(&error_event("x"));
        dispatcher.emit(&error_event("y"));
        assert_eq!(hits.load(Ordering::SeqCst), 1, "second emission must not fire");
    }

    #[test]
    fn test_handler_registered_during_emission_misses_that_emission() {
        let dispatcher = Arc::new(Dispatcher::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let dispatcher_inner = Arc::clone(&dispatcher);
        let late_hits_outer = Arc::clone(&late_hits);
        dispatcher.on(EventKind::Error, move |_| {
            let late_hits_inner = Arc::clone(&late_hits_outer);
            dispatcher_inner.on(EventKind::Error, move |_| {
                late_hits_inner.fetch_add(1, Ordering::SeqCst);
            });
        });

        dispatcher.emit(&error_event("x"));
        assert_eq!(
            late_hits.load(Ordering::SeqCst),
            0,
            "snapshot semantics: a handler added mid-emission sees later emissions only"
        );

        dispatcher.emit(&error_event("y"));
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_closure_registered_twice_fires_twice() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let hits_handler = Arc::clone(&hits);
            dispatcher.on(EventKind::Error, move |_| {
                hits_handler.fetch_add(1, Ordering::SeqCst);
            });
        }

        dispatcher.emit(&error_event("x"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_with_no_handlers_is_harmless() {
        let dispatcher = Dispatcher::new();
        dispatcher.emit(&error_event("nobody listening"));
        assert_eq!(dispatcher.handler_count(EventKind::Error), 0);
    }
}
