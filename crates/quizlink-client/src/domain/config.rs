//! Channel configuration types.
//!
//! [`ChannelConfig`] is the single source of truth for how the client reaches
//! its hub and how aggressively it self-heals.  Build it once (from CLI
//! arguments, a settings file, or the defaults) and hand it to
//! `ChannelHandle::new`.

use std::time::Duration;

/// All runtime configuration for one hub channel.
///
/// # Example
///
/// ```rust
/// use quizlink_client::domain::ChannelConfig;
///
/// // Defaults are suitable for local development:
/// let cfg = ChannelConfig::default();
/// assert_eq!(cfg.max_reconnect_attempts, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL of the quiz hub (e.g., `ws://127.0.0.1:3001/ws`).
    pub hub_url: String,

    /// Ceiling on consecutive unexpected drops before the channel gives up.
    ///
    /// Once the counter reaches this value the channel stops redialing and
    /// surfaces a persistent error; an explicit `connect()` re-arms it.
    pub max_reconnect_attempts: u32,

    /// Delay before the first redial of a failure episode.
    ///
    /// Subsequent delays double from here, capped at
    /// [`reconnect_max_delay`](Self::reconnect_max_delay).
    pub reconnect_initial_delay: Duration,

    /// Upper bound on the backoff delay between redials.
    pub reconnect_max_delay: Duration,
}

impl Default for ChannelConfig {
    /// Returns a `ChannelConfig` suitable for local development without any
    /// external configuration.
    ///
    /// | Field                   | Default                  |
    /// |-------------------------|--------------------------|
    /// | hub_url                 | `ws://127.0.0.1:3001/ws` |
    /// | max_reconnect_attempts  | 5                        |
    /// | reconnect_initial_delay | 1 second                 |
    /// | reconnect_max_delay     | 30 seconds               |
    fn default() -> Self {
        Self {
            hub_url: "ws://127.0.0.1:3001/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_initial_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
