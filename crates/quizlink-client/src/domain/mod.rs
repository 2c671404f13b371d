//! Domain layer for quizlink-client.
//!
//! Pure types with no dependencies on I/O, networking, or external
//! frameworks:
//!
//! - Channel configuration ([`ChannelConfig`])
//! - Consumer-visible state slices ([`ConnectionState`], [`ChannelSnapshot`])
//!
//! Anything that touches `tokio`, sockets, or the filesystem belongs in the
//! infrastructure layer instead.

pub mod config;
pub mod state;

pub use config::ChannelConfig;
pub use state::{ChannelSnapshot, ConnectionState};
