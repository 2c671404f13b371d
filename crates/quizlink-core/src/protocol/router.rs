//! Frame router: classifies raw hub frames into typed channel events.
//!
//! One frame in, at most one typed event out.  The router inspects the
//! `"type"` discriminant and validates the payload shape (required fields
//! must be present; absent optional fields take their defaults).  Frames
//! that fail classification are dropped at this layer: one bad frame must
//! not take down the whole channel, so the caller sees `None` rather than
//! an error, and the drop is counted and logged for diagnostics.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::warn;

use crate::protocol::events::{ChannelEvent, ServerEvent};

/// Why a frame failed classification.
///
/// Routing callers never see this type (malformed frames are swallowed);
/// it exists so the classification step itself has a typed error that tests
/// and diagnostics can assert on.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was not a JSON object with a recognised `"type"` tag, or a
    /// required payload field was missing or had the wrong shape.
    #[error("unrecognised frame: {0}")]
    Unrecognised(#[from] serde_json::Error),
}

/// Classifies inbound frames and keeps a running count of dropped ones.
#[derive(Debug, Default)]
pub struct FrameRouter {
    dropped: AtomicU64,
}

impl FrameRouter {
    /// Creates a router with a zeroed drop counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a single text frame.
    ///
    /// Returns the typed event for well-formed frames and `None` for
    /// everything else.  A `None` means the frame was dropped: the counter
    /// is bumped and a warning is logged, but no event reaches subscribers.
    pub fn route(&self, frame: &str) -> Option<ChannelEvent> {
        match classify(frame) {
            Ok(event) => Some(event),
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("dropping frame: {e}");
                None
            }
        }
    }

    /// Number of frames dropped since this router was created.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Parses one frame into its typed event.
///
/// # Errors
///
/// Returns [`FrameError::Unrecognised`] when the frame is not valid JSON,
/// lacks a known `"type"` tag, or is missing a required payload field.
pub fn classify(frame: &str) -> Result<ChannelEvent, FrameError> {
    let event: ServerEvent = serde_json::from_str(frame)?;
    Ok(event.into())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
