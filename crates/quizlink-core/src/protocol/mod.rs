//! Protocol module containing the event types and the frame router.

pub mod events;
pub mod router;

pub use events::{ChannelEvent, EventKind, ServerEvent};
pub use router::{FrameError, FrameRouter};
