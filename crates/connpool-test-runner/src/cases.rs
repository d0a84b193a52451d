// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration cases exercising `connpool-core` and `connpool-reactor`
//! end to end, registered with the harness the same way the original
//! C test suite registered its ART/deque/UTF-8 cases.

use std::sync::Arc;

use connpool_core::{Art, Deque, Value};
use connpool_testkit::{register_test, Outcome};

fn art_seven_typed_entries() -> Outcome {
    let mut art = Art::new();
    let pairs: [(&str, Value); 5] = [
        ("key_str", Value::String("value".into())),
        ("key_int", Value::Int32(7)),
        ("key_bool", Value::Bool(true)),
        ("key_float", Value::Float(1.5)),
        ("key_mem", Value::Mem(vec![1, 2, 3])),
    ];
    for (k, v) in pairs {
        if let Err(e) = art.insert(k.as_bytes(), v) {
            return Outcome::Failed(format!("insert {k} failed: {e}"));
        }
    }
    if art.len() != 5 {
        return Outcome::Failed(format!("expected 5 entries, got {}", art.len()));
    }
    for (k, _) in pairs {
        if !art.contains_key(k.as_bytes()) {
            return Outcome::Failed(format!("missing key {k}"));
        }
    }
    Outcome::Passed
}

fn art_large_dictionary_round_trip() -> Outcome {
    let words = [
        "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
        "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon",
    ];
    let mut art = Art::new();
    for (i, w) in words.iter().enumerate() {
        if art.insert(w.as_bytes(), Value::Int32(i as i32)).is_err() {
            return Outcome::Failed(format!("insert {w} failed"));
        }
    }
    for (i, w) in words.iter().enumerate() {
        match art.search(w.as_bytes()) {
            Some(Value::Int32(v)) if *v == i as i32 => {}
            other => return Outcome::Failed(format!("{w} round-tripped to {other:?}")),
        }
    }
    Outcome::Passed
}

fn deque_fifo_and_tag_removal() -> Outcome {
    let dq = Deque::new(false);
    for i in 0..5 {
        let tag = if i % 2 == 0 { Some("even".to_string()) } else { None };
        if dq.add_tail(Value::Int32(i), tag).is_err() {
            return Outcome::Failed("push failed on an unbounded deque".into());
        }
    }
    let removed = dq.remove_by_tag("even");
    if removed != 3 {
        return Outcome::Failed(format!("expected to remove 3 tagged entries, removed {removed}"));
    }
    if dq.len() != 2 {
        return Outcome::Failed(format!("expected 2 remaining entries, got {}", dq.len()));
    }
    Outcome::Passed
}

fn utf8_rejects_truncated_sequence() -> Outcome {
    let truncated = [0xe2u8, 0x82];
    match connpool_core::utf8::validate(&truncated, "utf8_rejects_truncated_sequence") {
        None => Outcome::Passed,
        Some(_) => Outcome::Failed("truncated UTF-8 sequence was accepted".into()),
    }
}

fn reactor_event_loop_inits_and_tears_down() -> Outcome {
    #[cfg(target_os = "linux")]
    {
        use connpool_reactor::{Backend, HeapMessagePool, LoopConfig};
        let cfg = LoopConfig::new(Arc::new(HeapMessagePool)).with_backend(Backend::ReadinessLinux);
        match connpool_reactor::EventLoop::init(&cfg) {
            Ok(evloop) => {
                evloop.destroy();
                Outcome::Passed
            }
            Err(e) => Outcome::Failed(format!("event loop init failed: {e}")),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        Outcome::Skipped("epoll backend is Linux-only".into())
    }
}

register_test!("art_seven_typed_entries", "art", art_seven_typed_entries);
register_test!("art_large_dictionary_round_trip", "art", art_large_dictionary_round_trip);
register_test!("deque_fifo_and_tag_removal", "deque", deque_fifo_and_tag_removal);
register_test!("utf8_rejects_truncated_sequence", "utf8", utf8_rejects_truncated_sequence);
register_test!(
    "reactor_event_loop_inits_and_tears_down",
    "reactor",
    reactor_event_loop_inits_and_tears_down
);
