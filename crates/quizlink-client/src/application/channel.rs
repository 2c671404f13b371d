//! The subscriber facade: a stable, glitch-free view of an unstable channel.
//!
//! [`QuizChannel`] is the single point through which consumers attach to the
//! event dispatcher.  It caches the last observed value per event kind
//! (latest-only, never a log) and exposes them as read-only accessors plus a
//! serializable [`ChannelSnapshot`], alongside the `connect` / `disconnect` /
//! `clear_error` commands.
//!
//! # Error slot rules
//!
//! - An unexpected connection loss populates the error slot with its reason;
//!   a manual disconnect never does.
//! - A terminal give-up from the reconnection policy populates it.
//! - Any fresh device status clears it: a valid `microbit_status` supersedes
//!   whatever fault preceded it.
//! - `clear_error()` empties it on demand.
//!
//! # Listener lifetime
//!
//! Attaching registers one dispatcher subscription per event kind; detaching
//! (or dropping) removes exactly those registrations and nothing else.  The
//! shared connection and its socket belong to the [`ChannelHandle`] clones,
//! so sibling facades on the same handle keep observing after one detaches.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quizlink_core::{
    ButtonEvent, ChannelEvent, DisconnectCause, EventKind, HandlerId, MicrobitStatus,
    MovementEvent, QuizStateEvent,
};

use crate::domain::{ChannelSnapshot, ConnectionState};
use crate::infrastructure::ChannelHandle;

/// Last-observed-value cache, overwritten on every dispatch.
#[derive(Debug)]
struct ChannelCache {
    connection: ConnectionState,
    microbit_status: Option<MicrobitStatus>,
    last_movement: Option<MovementEvent>,
    last_button: Option<ButtonEvent>,
    quiz_state: Option<QuizStateEvent>,
    error: Option<String>,
}

impl ChannelCache {
    fn new(max_reconnect_attempts: u32) -> Self {
        Self {
            connection: ConnectionState::new(max_reconnect_attempts),
            microbit_status: None,
            last_movement: None,
            last_button: None,
            quiz_state: None,
            error: None,
        }
    }
}

/// The facade consumers hold.
///
/// Cheap to create and destroy; repeated attach/detach cycles leave no
/// residue in the dispatcher.
pub struct QuizChannel {
    handle: ChannelHandle,
    cache: Arc<Mutex<ChannelCache>>,
    registrations: Vec<(EventKind, HandlerId)>,
}

impl QuizChannel {
    /// Attaches a new facade to `handle`, registering one dispatcher
    /// subscription per event kind.
    pub fn attach(handle: &ChannelHandle) -> Self {
        let cache = Arc::new(Mutex::new(ChannelCache::new(
            handle.config().max_reconnect_attempts,
        )));
        let dispatcher = handle.dispatcher();
        let mut registrations = Vec::with_capacity(6);

        let c = Arc::clone(&cache);
        registrations.push((
            EventKind::Connection,
            dispatcher.on(EventKind::Connection, move |event| {
                if let ChannelEvent::Connection(ev) = event {
                    let mut cache = lock(&c);
                    cache.connection.connected = ev.connected;
                    cache.connection.reconnect_attempts = ev.reconnect_attempts;
                    // Only an unexpected loss becomes a visible error; a
                    // deliberate disconnect is ordinary state.
                    if let Some(DisconnectCause::Lost(reason)) = &ev.cause {
                        cache.error = Some(format!("connection lost: {reason}"));
                    }
                }
            }),
        ));

        let c = Arc::clone(&cache);
        registrations.push((
            EventKind::MicrobitStatus,
            dispatcher.on(EventKind::MicrobitStatus, move |event| {
                if let ChannelEvent::MicrobitStatus(status) = event {
                    let mut cache = lock(&c);
                    cache.microbit_status = Some(status.clone());
                    // A fresh valid status supersedes any prior fault.
                    cache.error = None;
                }
            }),
        ));

        let c = Arc::clone(&cache);
        registrations.push((
            EventKind::MicrobitMovement,
            dispatcher.on(EventKind::MicrobitMovement, move |event| {
                if let ChannelEvent::MicrobitMovement(movement) = event {
                    lock(&c).last_movement = Some(movement.clone());
                }
            }),
        ));

        let c = Arc::clone(&cache);
        registrations.push((
            EventKind::MicrobitButton,
            dispatcher.on(EventKind::MicrobitButton, move |event| {
                if let ChannelEvent::MicrobitButton(button) = event {
                    lock(&c).last_button = Some(button.clone());
                }
            }),
        ));

        let c = Arc::clone(&cache);
        registrations.push((
            EventKind::QuizState,
            dispatcher.on(EventKind::QuizState, move |event| {
                if let ChannelEvent::QuizState(state) = event {
                    lock(&c).quiz_state = Some(state.clone());
                }
            }),
        ));

        let c = Arc::clone(&cache);
        registrations.push((
            EventKind::Error,
            dispatcher.on(EventKind::Error, move |event| {
                if let ChannelEvent::Error(error) = event {
                    lock(&c).error = Some(error.message.clone());
                }
            }),
        ));

        Self {
            handle: handle.clone(),
            cache,
            registrations,
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Opens the channel.  See [`ChannelHandle::connect`].
    pub async fn connect(&self) {
        self.handle.connect().await;
    }

    /// Closes the channel deliberately.  See [`ChannelHandle::disconnect`].
    pub async fn disconnect(&self) {
        self.handle.disconnect().await;
    }

    /// Empties the error slot.
    pub fn clear_error(&self) {
        lock(&self.cache).error = None;
    }

    /// Removes this facade's dispatcher registrations — exactly those and no
    /// others.  Idempotent; also invoked on drop.
    pub fn detach(&mut self) {
        for (kind, id) in self.registrations.drain(..) {
            self.handle.dispatcher().off(kind, id);
        }
    }

    // ── Read-only views ───────────────────────────────────────────────────────

    /// Current socket lifecycle state.
    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.cache).connection.clone()
    }

    /// Is the WebSocket itself open?
    pub fn is_socket_connected(&self) -> bool {
        lock(&self.cache).connection.connected
    }

    /// Does the hub report a live micro:bit?
    ///
    /// `false` until the first status arrives; the socket being up says
    /// nothing about the device.
    pub fn is_microbit_connected(&self) -> bool {
        lock(&self.cache)
            .microbit_status
            .as_ref()
            .is_some_and(|s| s.connected)
    }

    /// Last device status pushed by the hub.
    pub fn microbit_status(&self) -> Option<MicrobitStatus> {
        lock(&self.cache).microbit_status.clone()
    }

    /// Most recent tilt/shake gesture.
    pub fn last_movement(&self) -> Option<MovementEvent> {
        lock(&self.cache).last_movement.clone()
    }

    /// Most recent button press.
    pub fn last_button(&self) -> Option<ButtonEvent> {
        lock(&self.cache).last_button.clone()
    }

    /// Last server-authoritative quiz progression update.
    pub fn quiz_state(&self) -> Option<QuizStateEvent> {
        lock(&self.cache).quiz_state.clone()
    }

    /// Current channel fault, or `None` when healthy.
    pub fn error(&self) -> Option<String> {
        lock(&self.cache).error.clone()
    }

    /// One coherent copy of every slice, ready to serialize for UI bindings.
    pub fn snapshot(&self) -> ChannelSnapshot {
        let cache = lock(&self.cache);
        ChannelSnapshot {
            connection: cache.connection.clone(),
            is_web_socket_connected: cache.connection.connected,
            is_microbit_connected: cache
                .microbit_status
                .as_ref()
                .is_some_and(|s| s.connected),
            microbit_status: cache.microbit_status.clone(),
            last_movement: cache.last_movement.clone(),
            last_button: cache.last_button.clone(),
            quiz_state: cache.quiz_state.clone(),
            error: cache.error.clone(),
        }
    }
}

impl Drop for QuizChannel {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for QuizChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizChannel")
            .field("handle", &self.handle)
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

/// Cache mutations cannot leave the struct inconsistent mid-lock, so a
/// poisoned mutex is still safe to read.
fn lock(cache: &Mutex<ChannelCache>) -> MutexGuard<'_, ChannelCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
