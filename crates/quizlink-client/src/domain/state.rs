//! Consumer-visible state slices.
//!
//! These are the read models UI bindings consume: the socket's own
//! [`ConnectionState`] and the [`ChannelSnapshot`] DTO that bundles every
//! current-value slice into one serializable object.
//!
//! The snapshot serializes with camelCase field names so it can be handed to
//! a JavaScript consumer unchanged, matching the wire convention of the hub
//! protocol itself.

use serde::Serialize;

use quizlink_core::{ButtonEvent, MicrobitStatus, MovementEvent, QuizStateEvent};

/// State of the WebSocket channel itself.
///
/// Distinct from the device's state: the socket can be up while the micro:bit
/// is unplugged, and vice versa.  Invariant: `reconnect_attempts` never
/// exceeds `max_reconnect_attempts`; when the two are equal the channel has
/// given up and waits for an explicit reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// `true` while the socket is open.
    pub connected: bool,
    /// Consecutive unexpected drops in the current failure episode.
    pub reconnect_attempts: u32,
    /// Ceiling on `reconnect_attempts` before the channel gives up.
    pub max_reconnect_attempts: u32,
}

impl ConnectionState {
    /// Initial state: disconnected, zero attempts, the given ceiling.
    pub fn new(max_reconnect_attempts: u32) -> Self {
        Self {
            connected: false,
            reconnect_attempts: 0,
            max_reconnect_attempts,
        }
    }
}

/// One coherent view of everything a consumer can observe about the channel.
///
/// Produced by `QuizChannel::snapshot`; every field is a copy, so the
/// snapshot stays valid while the live channel keeps moving.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    /// Socket lifecycle state.
    pub connection: ConnectionState,
    /// Convenience flag: is the WebSocket itself open?
    pub is_web_socket_connected: bool,
    /// Convenience flag: does the hub report a live micro:bit?
    pub is_microbit_connected: bool,
    /// Last device status pushed by the hub, if any arrived yet.
    pub microbit_status: Option<MicrobitStatus>,
    /// Most recent tilt/shake gesture.
    pub last_movement: Option<MovementEvent>,
    /// Most recent button press.
    pub last_button: Option<ButtonEvent>,
    /// Last server-authoritative quiz progression update.
    pub quiz_state: Option<QuizStateEvent>,
    /// Current channel fault, or `None` when the channel is healthy.
    pub error: Option<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
