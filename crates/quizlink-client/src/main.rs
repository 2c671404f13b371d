//! QuizLink monitor — entry point.
//!
//! A diagnostic CLI that connects to a quiz hub, subscribes to the channel,
//! and logs every event as it arrives: device status changes, gestures,
//! button presses, quiz progression, connection drops, and reconnect
//! attempts.  Useful for checking that a hub deployment is pushing what it
//! should without running the full consumer application.
//!
//! # Usage
//!
//! ```text
//! quizlink-monitor [OPTIONS]
//!
//! Options:
//!   --hub-url <URL>                    Quiz hub WebSocket URL
//!   --max-reconnect-attempts <N>       Redial ceiling per failure episode
//!   --reconnect-initial-delay-ms <MS>  First redial delay
//!   --reconnect-max-delay-ms <MS>      Backoff delay cap
//!   --config <PATH>                    Explicit settings file
//! ```
//!
//! # Configuration layering
//!
//! Values resolve in this order (later wins):
//!
//! 1. Built-in defaults.
//! 2. The TOML settings file (platform path, or `--config <PATH>`).
//! 3. Environment variables (`QUIZLINK_HUB_URL`, …).
//! 4. Explicit CLI arguments.
//!
//! Log verbosity comes from `RUST_LOG` when set, otherwise from the
//! `log_level` in the settings file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quizlink_client::application::QuizChannel;
use quizlink_client::domain::ChannelConfig;
use quizlink_client::infrastructure::settings::{self, Settings};
use quizlink_client::infrastructure::ChannelHandle;
use quizlink_core::{ChannelEvent, EventKind};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// QuizLink channel monitor.
///
/// Connects to a quiz hub and logs every pushed event until Ctrl+C.
#[derive(Debug, Parser)]
#[command(
    name = "quizlink-monitor",
    about = "Diagnostic monitor for the QuizLink hub channel",
    version
)]
struct Cli {
    /// WebSocket URL of the quiz hub (e.g., ws://127.0.0.1:3001/ws).
    #[arg(long, env = "QUIZLINK_HUB_URL")]
    hub_url: Option<String>,

    /// Ceiling on consecutive unexpected drops before the channel gives up.
    #[arg(long, env = "QUIZLINK_MAX_RECONNECT_ATTEMPTS")]
    max_reconnect_attempts: Option<u32>,

    /// Delay before the first redial of a failure episode, in milliseconds.
    #[arg(long, env = "QUIZLINK_RECONNECT_INITIAL_DELAY_MS")]
    reconnect_initial_delay_ms: Option<u64>,

    /// Upper bound on the backoff delay between redials, in milliseconds.
    #[arg(long, env = "QUIZLINK_RECONNECT_MAX_DELAY_MS")]
    reconnect_max_delay_ms: Option<u64>,

    /// Path to a TOML settings file.  Defaults to the platform settings path.
    #[arg(long, env = "QUIZLINK_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Resolves the effective [`ChannelConfig`]: the settings file provides
    /// the base values and explicit CLI/env arguments override them.
    fn into_channel_config(self, settings: &Settings) -> ChannelConfig {
        let base = settings.channel_config();
        ChannelConfig {
            hub_url: self.hub_url.unwrap_or(base.hub_url),
            max_reconnect_attempts: self
                .max_reconnect_attempts
                .unwrap_or(base.max_reconnect_attempts),
            reconnect_initial_delay: self
                .reconnect_initial_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.reconnect_initial_delay),
            reconnect_max_delay: self
                .reconnect_max_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(base.reconnect_max_delay),
        }
    }
}

// ── Event logging ─────────────────────────────────────────────────────────────

/// Logs one channel event at the level its severity deserves.
fn log_event(event: &ChannelEvent) {
    match event {
        ChannelEvent::Connection(ev) => {
            if ev.connected {
                info!("channel connected");
            } else {
                info!(
                    "channel disconnected (cause: {:?}, attempts: {})",
                    ev.cause, ev.reconnect_attempts
                );
            }
        }
        ChannelEvent::MicrobitStatus(status) => info!(
            "micro:bit status — connected: {}, port: {:?}, message: {}",
            status.connected, status.port_name, status.message
        ),
        ChannelEvent::MicrobitMovement(movement) => {
            info!("movement: {} (at {})", movement.movement, movement.timestamp)
        }
        ChannelEvent::MicrobitButton(button) => {
            info!("button: {} (at {})", button.button, button.timestamp)
        }
        ChannelEvent::QuizState(quiz) => info!(
            "quiz {} entered state {} (at {})",
            quiz.quiz_id, quiz.state, quiz.timestamp
        ),
        ChannelEvent::Error(error) => warn!("channel error: {}", error.message),
    }
}

/// Every kind the monitor subscribes to — all of them.
const ALL_KINDS: [EventKind; 6] = [
    EventKind::Connection,
    EventKind::MicrobitStatus,
    EventKind::MicrobitMovement,
    EventKind::MicrobitButton,
    EventKind::QuizState,
    EventKind::Error,
];

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Settings first: the log level default comes from them.
    let settings = match &cli.config {
        Some(path) => settings::load_settings_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => settings::load_settings().context("failed to load settings")?,
    };

    // RUST_LOG wins over the settings file when both are present.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(settings.monitor.log_level.clone())
        }))
        .init();

    let config = cli.into_channel_config(&settings);
    info!(
        "QuizLink monitor starting — hub={}, redial ceiling={}",
        config.hub_url, config.max_reconnect_attempts
    );

    let handle = ChannelHandle::new(config);

    // Log every event as it arrives, ahead of the facade's own bookkeeping.
    for kind in ALL_KINDS {
        handle.dispatcher().on(kind, log_event);
    }

    let channel = QuizChannel::attach(&handle);
    channel.connect().await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C signal")?;
    info!("received Ctrl+C — disconnecting");

    channel.disconnect().await;

    // Final state, serialized the way a UI binding would consume it.
    let snapshot = channel.snapshot();
    info!(
        "final snapshot: {}",
        serde_json::to_string(&snapshot).unwrap_or_else(|e| format!("<unserializable: {e}>"))
    );

    info!("QuizLink monitor stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
