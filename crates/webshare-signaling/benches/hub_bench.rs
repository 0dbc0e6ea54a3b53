//! Criterion microbenchmarks for signaling hot paths.
//!
//! Run with:
//!   cargo bench -p webshare-signaling
//!
//! HTML reports are written to `target/criterion/`.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use webshare_signaling::protocol::Inbound;
use webshare_signaling::SignalingHub;

const OFFER: &str = r#"{
    "type":"offer",
    "room":"bench-room",
    "offer":{"type":"offer","sdp":"v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\na=group:BUNDLE 0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\nc=IN IP4 0.0.0.0\r\na=ice-ufrag:abcd\r\na=ice-pwd:efghijklmnopqrstuvwx\r\na=fingerprint:sha-256 00:11:22:33\r\na=setup:actpass\r\na=mid:0\r\na=sctp-port:5000\r\n"}
}"#;

// ── Parsing ───────────────────────────────────────────────────────────────────

fn bench_parse_offer(c: &mut Criterion) {
    c.bench_function("protocol/parse_offer", |b| {
        b.iter(|| Inbound::parse(black_box(OFFER)).unwrap())
    });
}

fn bench_parse_join(c: &mut Criterion) {
    let join = r#"{"type":"join","room":"bench-room","deviceType":"desktop"}"#;
    c.bench_function("protocol/parse_join", |b| {
        b.iter(|| Inbound::parse(black_box(join)).unwrap())
    });
}

// ── Hub ───────────────────────────────────────────────────────────────────────

/// Relay an offer between two joined connections, draining the receiver so the
/// queue never fills.
fn bench_relay(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let hub = SignalingHub::default();
    let (a, _a_rx, mut b_rx) = rt.block_on(async {
        let (a, a_rx) = hub.connect().await;
        let (b, mut b_rx) = hub.connect().await;
        hub.handle_text(a, r#"{"type":"join","room":"bench-room"}"#).await;
        hub.handle_text(b, r#"{"type":"join","room":"bench-room"}"#).await;
        while b_rx.try_recv().is_ok() {}
        (a, a_rx, b_rx)
    });

    c.bench_function("hub/relay_offer", |bench| {
        bench.iter(|| {
            rt.block_on(hub.handle_text(a, black_box(OFFER)));
            b_rx.try_recv().unwrap();
        })
    });
}

/// Join and leave a fresh room.
fn bench_join_leave(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let hub = SignalingHub::default();

    c.bench_function("hub/join_disconnect", |bench| {
        bench.iter(|| {
            rt.block_on(async {
                let (id, _rx) = hub.connect().await;
                hub.handle_text(id, r#"{"type":"join","room":"bench-room"}"#).await;
                hub.disconnect(id).await;
            })
        })
    });
}

criterion_group!(
    benches,
    bench_parse_offer,
    bench_parse_join,
    bench_relay,
    bench_join_leave,
);
criterion_main!(benches);
