//! Infrastructure layer for quizlink-client.
//!
//! Everything that touches the outside world lives here:
//!
//! - **`socket`** – The WebSocket connection actor and the shared
//!   [`ChannelHandle`] consumers clone.
//! - **`reconnect`** – The pure backoff state machine the actor consults
//!   after each unexpected loss.
//! - **`settings`** – TOML settings persistence at the platform config path.

pub mod reconnect;
pub mod settings;
pub mod socket;

pub use socket::ChannelHandle;
