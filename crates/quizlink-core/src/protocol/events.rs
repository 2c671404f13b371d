//! Typed event model for the QuizLink channel.
//!
//! The hub pushes JSON frames over the persistent WebSocket.  Every frame is
//! a JSON object with a `"type"` field that identifies the event kind; all
//! other fields sit in the same object.  For example:
//!
//! ```json
//! {"type":"microbit_status","connected":true,"portName":"COM3","message":"ready"}
//! {"type":"microbit_movement","movement":"tilt_left","timestamp":1712345678901}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles the discriminant
//! automatically.  Payload fields use camelCase on the wire (the hub is a
//! JavaScript service) and snake_case in Rust.
//!
//! # Wire events vs. channel events
//!
//! [`ServerEvent`] covers only what actually travels on the wire.  Connection
//! lifecycle ([`ConnectionEvent`]) and channel errors ([`ErrorEvent`]) are
//! synthesised locally by the connection layer and never received from the
//! hub, so they carry no serde derives.  [`ChannelEvent`] is the closed union
//! over both groups: the single tagged type every subscriber consumes, with
//! [`EventKind`] as its discriminant.

use serde::{Deserialize, Serialize};

// ── Wire payloads ─────────────────────────────────────────────────────────────

/// Last-known state of the physical micro:bit as reported by the hub.
///
/// Distinct from the socket's own connection state: the channel can be up
/// while the device is unplugged, and the hub reports that as an ordinary
/// status with `connected: false`, not as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrobitStatus {
    /// `true` when the hub currently holds an open serial link to the board.
    pub connected: bool,
    /// Serial port the board is attached to (e.g., `"COM3"`, `"/dev/ttyACM0"`).
    #[serde(default)]
    pub port_name: Option<String>,
    /// Human-readable status line from the hub's device driver.
    pub message: String,
    /// Milliseconds since the Unix epoch, when the hub sampled the state.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// A tilt/shake gesture detected on the board.
///
/// Only the most recent movement matters to consumers; this is a live input
/// signal, not a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementEvent {
    /// Gesture name (e.g., `"tilt_left"`, `"tilt_right"`, `"shake"`).
    ///
    /// Kept as an open string: a newer hub may emit gestures this client
    /// does not know yet, and those frames must still be delivered.
    pub movement: String,
    /// Opaque correlation payload tying the gesture to the quiz session it
    /// applies to.  The client never inspects its structure.
    #[serde(default)]
    pub quiz_context: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// A button press on the board.  Same latest-only semantics as
/// [`MovementEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonEvent {
    /// Button identifier (e.g., `"A"`, `"B"`, `"AB"`).
    pub button: String,
    /// Opaque correlation payload; see [`MovementEvent::quiz_context`].
    #[serde(default)]
    pub quiz_context: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Server-authoritative quiz session progression.
///
/// The client never derives quiz state locally; it mirrors whatever the hub
/// last pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStateEvent {
    /// Identifier of the quiz session this update belongs to.
    pub quiz_id: String,
    /// Session phase (e.g., `"waiting"`, `"question"`, `"finished"`).
    pub state: String,
    /// Opaque current-question payload, absent between questions.
    #[serde(default)]
    pub current_question: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

// ── Server-pushed frame union ─────────────────────────────────────────────────

/// All frames the hub can push to a client.
///
/// # Serde representation
///
/// ```json
/// {"type":"microbit_status","connected":true,"portName":"COM3","message":"ready"}
/// {"type":"microbit_button","button":"A","timestamp":1712345678901}
/// {"type":"quiz_state","quizId":"q-17","state":"question","timestamp":1712345678901}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
// `tag = "type"` means serde reads the `"type"` field of the JSON object to
// pick the variant; `rename_all = "snake_case"` maps variant names to the
// hub's tag spelling (MicrobitStatus -> "microbit_status").
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Device status report.
    MicrobitStatus(MicrobitStatus),
    /// Tilt/shake gesture.
    MicrobitMovement(MovementEvent),
    /// Button press.
    MicrobitButton(ButtonEvent),
    /// Quiz session progression.
    QuizState(QuizStateEvent),
}

// ── Client-local synthetic events ─────────────────────────────────────────────

/// Why the channel left the connected state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The consumer asked for the disconnect.  Never treated as a fault.
    Manual,
    /// The transport dropped or failed to open; the reason string comes from
    /// the underlying socket error.
    Lost(String),
}

/// Connection lifecycle notification synthesised by the connection layer.
///
/// Carries the retry counter so subscribers can mirror the reconnection
/// progress without reaching into the connection layer's internals.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    /// `true` once the socket is open, `false` on any form of closure.
    pub connected: bool,
    /// Present only when `connected` is `false`.
    pub cause: Option<DisconnectCause>,
    /// Consecutive unexpected drops in the current failure episode.
    pub reconnect_attempts: u32,
}

/// A channel-level fault surfaced to consumers.
///
/// Each new error replaces the previous one; errors are not accumulated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Human-readable description.
    pub message: String,
}

// ── Closed channel union ──────────────────────────────────────────────────────

/// Every event a channel subscriber can observe.
///
/// This is a closed enumeration: adding a kind is a compile-time-visible
/// change, and consumers that match on it exhaustively are forced to handle
/// the new kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Socket lifecycle (client-local).
    Connection(ConnectionEvent),
    /// Device status report from the hub.
    MicrobitStatus(MicrobitStatus),
    /// Tilt/shake gesture from the hub.
    MicrobitMovement(MovementEvent),
    /// Button press from the hub.
    MicrobitButton(ButtonEvent),
    /// Quiz session progression from the hub.
    QuizState(QuizStateEvent),
    /// Channel fault (client-local).
    Error(ErrorEvent),
}

impl ChannelEvent {
    /// Returns the discriminant used to key dispatcher subscriptions.
    pub fn kind(&self) -> EventKind {
        match self {
            ChannelEvent::Connection(_) => EventKind::Connection,
            ChannelEvent::MicrobitStatus(_) => EventKind::MicrobitStatus,
            ChannelEvent::MicrobitMovement(_) => EventKind::MicrobitMovement,
            ChannelEvent::MicrobitButton(_) => EventKind::MicrobitButton,
            ChannelEvent::QuizState(_) => EventKind::QuizState,
            ChannelEvent::Error(_) => EventKind::Error,
        }
    }
}

impl From<ServerEvent> for ChannelEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::MicrobitStatus(e) => ChannelEvent::MicrobitStatus(e),
            ServerEvent::MicrobitMovement(e) => ChannelEvent::MicrobitMovement(e),
            ServerEvent::MicrobitButton(e) => ChannelEvent::MicrobitButton(e),
            ServerEvent::QuizState(e) => ChannelEvent::QuizState(e),
        }
    }
}

/// Discriminant for [`ChannelEvent`], used as the dispatcher's registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connection,
    MicrobitStatus,
    MicrobitMovement,
    MicrobitButton,
    QuizState,
    Error,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
