//! Reconnection policy: the backoff state machine for the self-healing loop.
//!
//! The policy is pure state — it owns the retry counter and the delay curve
//! but performs no I/O and holds no timers.  The connection actor asks it
//! what to do after each unexpected loss and sleeps the delay it returns.
//!
//! # State machine
//!
//! ```text
//!          re_arm()                 connected()
//! Idle ───────────────▶ Connecting ────────────▶ Connected
//!                          ▲   │                     │
//!                          │   │ connection_lost()   │ connection_lost()
//!            Retry{delay}  │   ▼                     ▼
//!                          └── Reconnecting ◀────────┘
//!                                  │
//!                                  │ counter reaches the ceiling
//!                                  ▼
//!                               Failed  ── re_arm() ──▶ Connecting
//! ```
//!
//! A manual disconnect returns the machine to `Idle` from any state without
//! touching the counter.  `Failed` is sticky: the actor stops redialing and
//! only an explicit `connect()` (which calls [`ReconnectPolicy::re_arm`])
//! restarts the episode from a zeroed counter.
//!
//! # Backoff curve
//!
//! Exponential doubling: the first redial waits `initial_delay`, each further
//! redial doubles the wait, capped at `max_delay`.  Within one failure
//! episode the delays are therefore monotonically non-decreasing; a
//! successful connection resets the curve.

use std::time::Duration;

use crate::domain::ChannelConfig;

/// Where the channel currently stands in its connect/retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    /// No connection wanted; nothing is scheduled.
    Idle,
    /// A dial is in flight (initial or redial).
    Connecting,
    /// The socket is open.
    Connected,
    /// Waiting out a backoff delay before the next redial.
    Reconnecting,
    /// The attempt ceiling was reached; redialing is suspended.
    Failed,
}

/// What the actor should do about an unexpected connection loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then dial again.  `attempt` is the 1-based count of
    /// consecutive losses in this episode.
    Retry { delay: Duration, attempt: u32 },
    /// The ceiling is reached: stop redialing and surface a terminal error.
    GiveUp { attempts: u32 },
}

/// The retry counter and delay curve for one channel.
#[derive(Debug)]
pub struct ReconnectPolicy {
    state: PolicyState,
    attempts: u32,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl ReconnectPolicy {
    /// Creates a policy in `Idle` with a zeroed counter.
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            state: PolicyState::Idle,
            attempts: 0,
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Builds a policy from the channel configuration's backoff fields.
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(
            config.max_reconnect_attempts,
            config.reconnect_initial_delay,
            config.reconnect_max_delay,
        )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PolicyState {
        self.state
    }

    /// Consecutive unexpected losses in the current failure episode.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// An explicit `connect()` call: zero the counter and start dialing.
    ///
    /// This is the only way out of `Failed`.
    pub fn re_arm(&mut self) {
        self.attempts = 0;
        self.state = PolicyState::Connecting;
    }

    /// The dial succeeded: the episode is over and the curve restarts.
    pub fn connected(&mut self) {
        self.attempts = 0;
        self.state = PolicyState::Connected;
    }

    /// A deliberate `disconnect()`: back to `Idle`, counter untouched.
    ///
    /// Manual disconnects are never failures, so they must not advance the
    /// counter toward the ceiling.
    pub fn manual_disconnect(&mut self) {
        self.state = PolicyState::Idle;
    }

    /// Records one unexpected loss and decides whether to redial.
    ///
    /// The counter increments on every loss; the policy fails when it reaches
    /// the ceiling, so `attempts` can never exceed `max_attempts`.
    pub fn connection_lost(&mut self) -> RetryDecision {
        if self.attempts >= self.max_attempts {
            // Already at the ceiling (including max_attempts == 0).
            self.state = PolicyState::Failed;
            return RetryDecision::GiveUp {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            self.state = PolicyState::Failed;
            RetryDecision::GiveUp {
                attempts: self.attempts,
            }
        } else {
            self.state = PolicyState::Reconnecting;
            RetryDecision::Retry {
                delay: self.delay_for(self.attempts),
                attempt: self.attempts,
            }
        }
    }

    /// Backoff delay before redial number `attempt` (1-based).
    ///
    /// `initial_delay * 2^(attempt-1)`, capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        let delay = self.initial_delay.saturating_mul(1u32 << doublings);
        delay.min(self.max_delay)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
