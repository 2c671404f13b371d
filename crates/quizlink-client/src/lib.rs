//! quizlink-client library crate.
//!
//! The connectivity side of QuizLink: everything between the wire and the
//! consumer's state bindings.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Quiz hub (JSON over WebSocket)
//!         ↕
//! [quizlink-client]
//!   ├── domain/          Pure types: ChannelConfig, ConnectionState, snapshot DTO
//!   ├── application/     QuizChannel — the subscriber facade consumers hold
//!   └── infrastructure/
//!         ├── socket/    Connection actor (tokio-tungstenite), owns the transport
//!         ├── reconnect/ Backoff state machine for the self-healing loop
//!         └── settings/  TOML settings persistence
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O, no async, no frameworks.
//! - `application` depends on `domain` and `quizlink-core` only; it talks to
//!   the connection layer exclusively through [`ChannelHandle`].
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tungstenite`.
//!
//! # Typical usage
//!
//! ```no_run
//! use quizlink_client::application::QuizChannel;
//! use quizlink_client::domain::ChannelConfig;
//! use quizlink_client::infrastructure::ChannelHandle;
//!
//! # async fn example() {
//! let handle = ChannelHandle::new(ChannelConfig::default());
//! let channel = QuizChannel::attach(&handle);
//! channel.connect().await;
//! // ... later, from UI bindings:
//! let snapshot = channel.snapshot();
//! # }
//! ```

/// Domain layer: configuration and consumer-visible state types.
pub mod domain;

/// Application layer: the subscriber facade.
pub mod application;

/// Infrastructure layer: connection actor, reconnection policy, settings.
pub mod infrastructure;

pub use application::QuizChannel;
pub use domain::{ChannelConfig, ChannelSnapshot, ConnectionState};
pub use infrastructure::ChannelHandle;
