//! Criterion benchmarks for the QuizLink frame router.
//!
//! Measures classification latency per frame kind, plus the cost of
//! rejecting malformed frames (the router sits on the hot inbound path, so
//! rejection must stay as cheap as acceptance).
//!
//! Run with:
//! ```bash
//! cargo bench --package quizlink-core --bench router_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quizlink_core::protocol::router::FrameRouter;

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn status_frame() -> String {
    r#"{"type":"microbit_status","connected":true,"portName":"COM3","message":"micro:bit ready","timestamp":1712345678901}"#
        .to_string()
}

fn movement_frame() -> String {
    r#"{"type":"microbit_movement","movement":"tilt_left","quizContext":{"sessionId":"s-9","questionIndex":2},"timestamp":1712345678901}"#
        .to_string()
}

fn button_frame() -> String {
    r#"{"type":"microbit_button","button":"A","timestamp":1712345678901}"#.to_string()
}

fn quiz_state_frame() -> String {
    r#"{"type":"quiz_state","quizId":"q-17","state":"question","currentQuestion":{"prompt":"2+2?","choices":[3,4,5]},"timestamp":1712345678901}"#
        .to_string()
}

fn unknown_type_frame() -> String {
    r#"{"type":"cpu_temperature","celsius":41}"#.to_string()
}

fn garbage_frame() -> String {
    "}}not json{{".to_string()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_route_known_kinds(c: &mut Criterion) {
    let router = FrameRouter::new();
    let mut group = c.benchmark_group("route_known");

    let frames = [
        ("microbit_status", status_frame()),
        ("microbit_movement", movement_frame()),
        ("microbit_button", button_frame()),
        ("quiz_state", quiz_state_frame()),
    ];

    for (name, frame) in &frames {
        group.bench_with_input(BenchmarkId::from_parameter(name), frame, |b, frame| {
            b.iter(|| router.route(black_box(frame)));
        });
    }
    group.finish();
}

fn bench_route_rejected_frames(c: &mut Criterion) {
    let router = FrameRouter::new();
    let mut group = c.benchmark_group("route_rejected");

    let frames = [
        ("unknown_type", unknown_type_frame()),
        ("garbage", garbage_frame()),
    ];

    for (name, frame) in &frames {
        group.bench_with_input(BenchmarkId::from_parameter(name), frame, |b, frame| {
            b.iter(|| router.route(black_box(frame)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_route_known_kinds, bench_route_rejected_frames);
criterion_main!(benches);
