// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for inbound envelope dispatch, peer-call rendering
// and error-message encoding in the kamome-bridge crate.

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;

use kamome_bridge::messenger::{PeerCall, encode_uri_component};
use kamome_bridge::{Client, Command, ScriptChannel};
use kamome_core::types::CallbackId;

/// Channel that discards every script, so only dispatch cost is measured.
struct NullChannel;

impl ScriptChannel for NullChannel {
    fn evaluate(&self, script: String) {
        black_box(script);
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Benchmark a page request through parse, lookup, handler and settlement.
fn bench_receive(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let _guard = runtime.enter();

    let client = Client::new(Arc::new(NullChannel)).expect("client");
    client.add_command(Command::new("echo", |_, data, completion| {
        completion.resolve_data(data.unwrap_or_default());
    }));

    let message = r#"{"id":"r1","name":"echo","data":{"message":"Hello, Kamome!"}}"#;
    c.bench_function("receive (echo)", |b| {
        b.iter(|| {
            let result = client.receive(black_box(message));
            assert!(result.is_ok());
        });
    });

    let missing = r#"{"id":"r2","name":"missing","data":null}"#;
    c.bench_function("receive (command not added)", |b| {
        b.iter(|| {
            let result = client.receive(black_box(missing));
            assert!(result.is_ok());
        });
    });
}

/// Benchmark rendering the three peer calls to script text.
fn bench_render(c: &mut Criterion) {
    let receive = PeerCall::Receive {
        name: "greeting".into(),
        data: Some(json!({"greeting": "Hello!", "items": [1, 2, 3]})),
        callback_id: Some(CallbackId::generate("greeting")),
    };
    let complete = PeerCall::Complete {
        data: Some(json!({"message": "Hello, Kamome!"})),
        request_id: "r1".into(),
    };
    let error = PeerCall::Error {
        message: Some("Echo Error! ['\"+-._~\\@#$%^&*=,/?;:|{}]".into()),
        request_id: "r2".into(),
    };

    c.bench_function("render onReceive", |b| {
        b.iter(|| black_box(receive.to_script(black_box("window.KM"))));
    });
    c.bench_function("render onComplete", |b| {
        b.iter(|| black_box(complete.to_script(black_box("window.KM"))));
    });
    c.bench_function("render onError", |b| {
        b.iter(|| black_box(error.to_script(black_box("window.KM"))));
    });
}

/// Benchmark percent-encoding a 4 KiB mixed-character message.
fn bench_encode(c: &mut Criterion) {
    let message = "Échec: a/b?c=d&e ✓ ".repeat(200);

    c.bench_function("encode_uri_component (4 KiB)", |b| {
        b.iter(|| black_box(encode_uri_component(black_box(&message))));
    });
}

criterion_group!(benches, bench_receive, bench_render, bench_encode);
criterion_main!(benches);
