//! Integration tests for the live channel path: a real WebSocket hub in
//! process, a real connection actor, and the facade observing the result.
//!
//! Each test binds an ephemeral-port listener, plays the hub side of the
//! protocol with `tokio_tungstenite::accept_async`, and asserts on what the
//! facade exposes.  Timing-dependent conditions are polled with a generous
//! deadline rather than asserted after fixed sleeps, so the tests stay
//! reliable on slow CI machines.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use quizlink_client::application::QuizChannel;
use quizlink_client::domain::ChannelConfig;
use quizlink_client::infrastructure::ChannelHandle;

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Channel configuration pointed at a local test hub, with backoff timing
/// shrunk so failure-path tests finish quickly.
fn test_config(port: u16) -> ChannelConfig {
    ChannelConfig {
        hub_url: format!("ws://127.0.0.1:{port}/ws"),
        max_reconnect_attempts: 3,
        reconnect_initial_delay: Duration::from_millis(20),
        reconnect_max_delay: Duration::from_millis(80),
    }
}

/// Polls `condition` every 10 ms until it holds, panicking after 5 seconds.
async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

const STATUS_COM3: &str =
    r#"{"type":"microbit_status","connected":true,"portName":"COM3","message":"ready"}"#;

// ── Tests ─────────────────────────────────────────────────────────────────────

/// The full happy path: connect, receive a device status push, observe it
/// through the facade.
#[tokio::test]
async fn test_status_push_reaches_the_facade() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(STATUS_COM3.to_string())).await.unwrap();
        // Hold the session open until the client goes away.
        while ws.next().await.is_some() {}
    });

    let handle = ChannelHandle::new(test_config(port));
    let channel = QuizChannel::attach(&handle);
    channel.connect().await;

    wait_for("socket to connect", || channel.is_socket_connected()).await;
    wait_for("device status to arrive", || channel.is_microbit_connected()).await;

    assert_eq!(
        channel.microbit_status().unwrap().port_name.as_deref(),
        Some("COM3")
    );
    assert!(channel.error().is_none());
    assert_eq!(channel.connection_state().reconnect_attempts, 0);
}

/// Frames of every server-pushed kind arrive in order and land in their
/// respective facade slots; a malformed frame in the middle is dropped
/// without disturbing the rest.
#[tokio::test]
async fn test_all_event_kinds_flow_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let frames = [
            STATUS_COM3,
            r#"{"type":"microbit_movement","movement":"tilt_left","timestamp":1}"#,
            "this frame is not json",
            r#"{"type":"microbit_button","button":"A","timestamp":2}"#,
            r#"{"type":"quiz_state","quizId":"q-17","state":"question","timestamp":3}"#,
        ];
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        while ws.next().await.is_some() {}
    });

    let handle = ChannelHandle::new(test_config(port));
    let channel = QuizChannel::attach(&handle);
    channel.connect().await;

    wait_for("quiz state to arrive", || channel.quiz_state().is_some()).await;

    assert!(channel.is_microbit_connected());
    assert_eq!(channel.last_movement().unwrap().movement, "tilt_left");
    assert_eq!(channel.last_button().unwrap().button, "A");
    assert_eq!(channel.quiz_state().unwrap().quiz_id, "q-17");
    // The garbage frame produced no event and no error.
    assert!(channel.error().is_none());
}

/// An unexpected hub-side close triggers an automatic redial, and a
/// successful redial resets the attempt counter.
#[tokio::test]
async fn test_unexpected_close_redials_automatically() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        // First session: accept the handshake, then hang up immediately.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        drop(ws);

        // Second session: the redial.  Identify it with a different port
        // name so the test can tell the sessions apart.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"microbit_status","connected":true,"portName":"COM4","message":"back"}"#
                .to_string(),
        ))
        .await
        .unwrap();
        while ws.next().await.is_some() {}
    });

    let handle = ChannelHandle::new(test_config(port));
    let channel = QuizChannel::attach(&handle);
    channel.connect().await;

    wait_for("redial to reach the second session", || {
        channel
            .microbit_status()
            .is_some_and(|s| s.port_name.as_deref() == Some("COM4"))
    })
    .await;

    // The redial succeeded, so the episode is over and the counter is reset.
    let state = channel.connection_state();
    assert!(state.connected);
    assert_eq!(state.reconnect_attempts, 0);
    // The loss set an error; the fresh status cleared it again.
    assert!(channel.error().is_none());
}

/// A deliberate disconnect closes the socket without a retry, without an
/// error, and without touching the attempt counter.
#[tokio::test]
async fn test_manual_disconnect_is_silent_and_final() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepts = Arc::new(AtomicUsize::new(0));

    let accepts_hub = Arc::clone(&accepts);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            accepts_hub.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut ws = accept_async(stream).await.unwrap();
                while ws.next().await.is_some() {}
            });
        }
    });

    let handle = ChannelHandle::new(test_config(port));
    let channel = QuizChannel::attach(&handle);
    channel.connect().await;
    wait_for("socket to connect", || channel.is_socket_connected()).await;

    channel.disconnect().await;
    wait_for("socket to close", || !channel.is_socket_connected()).await;

    // Give a would-be retry loop several backoff periods to (wrongly) fire.
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(accepts.load(Ordering::SeqCst), 1, "no redial may follow");
    assert!(!channel.is_socket_connected());
    assert!(channel.error().is_none(), "manual disconnect is not a fault");
    assert_eq!(channel.connection_state().reconnect_attempts, 0);
}

/// Two facades on one handle observe the same channel; detaching one leaves
/// the other (and the socket) untouched.
#[tokio::test]
async fn test_sibling_facades_share_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(STATUS_COM3.to_string())).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let handle = ChannelHandle::new(test_config(port));
    let mut first = QuizChannel::attach(&handle);
    let second = QuizChannel::attach(&handle);

    first.connect().await;
    wait_for("both facades to see the device", || {
        second.is_microbit_connected()
    })
    .await;
    assert!(first.is_microbit_connected());

    first.detach();

    // The socket stays up for the surviving facade.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(second.is_socket_connected());
    assert!(second.is_microbit_connected());
}
