//! # quizlink-core
//!
//! Shared library for QuizLink containing the typed event model, the frame
//! router, and the event dispatcher.
//!
//! This crate is used by every QuizLink client surface.  It has zero
//! dependencies on sockets, async runtimes, or UI frameworks.
//!
//! # Architecture overview
//!
//! A QuizLink hub relays the live state of a micro:bit peripheral (device
//! status, tilt movements, button presses) and server-authoritative quiz
//! session progression to its clients over a single persistent WebSocket.
//! This crate defines the pieces of that channel that are pure data and pure
//! logic:
//!
//! - **`protocol`** – The event "language".  Server-pushed frames are JSON
//!   objects tagged by a `type` field; the router classifies each frame into
//!   exactly one typed event or drops it.  Connection lifecycle and error
//!   events are client-local synthetics that share the same closed event
//!   union so consumers handle everything through one tagged type.
//!
//! - **`dispatch`** – A type-keyed publish/subscribe registry.  Handlers
//!   subscribe per event kind and are invoked synchronously, in registration
//!   order, each isolated from the failures of the others.

// Declare the two top-level modules.  Rust will look for each in a
// subdirectory or file with the same name (e.g., src/protocol/mod.rs).
pub mod dispatch;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `quizlink_core::ChannelEvent` instead of the full module path.
pub use dispatch::{Dispatcher, HandlerId};
pub use protocol::events::{
    ButtonEvent, ChannelEvent, ConnectionEvent, DisconnectCause, ErrorEvent, EventKind,
    MicrobitStatus, MovementEvent, QuizStateEvent, ServerEvent,
};
pub use protocol::router::{FrameError, FrameRouter};
