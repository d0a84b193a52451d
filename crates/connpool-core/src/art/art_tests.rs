use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn empty_tree_reports_zero_size_and_misses() {
    let art = Art::new();
    assert_eq!(art.len(), 0);
    assert!(art.is_empty());
    assert!(!art.contains_key(b"anything"));
}

#[test]
fn insert_then_search_roundtrips() {
    let mut art = Art::new();
    art.insert(b"hello", Value::Int32(42)).unwrap();
    assert_eq!(art.len(), 1);
    assert!(matches!(art.search(b"hello"), Some(Value::Int32(42))));
    assert!(!art.contains_key(b"hell"));
    assert!(!art.contains_key(b"helloo"));
}

#[test]
fn insert_rejects_empty_key_and_none_tag() {
    let mut art = Art::new();
    assert!(art.insert(b"", Value::Int32(1)).is_err());
    assert!(art.insert(b"k", Value::None).is_err());
    assert_eq!(art.len(), 0);
}

#[test]
fn replacing_a_key_keeps_size_constant_and_runs_old_destroyer_once() {
    let mut art = Art::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    art.insert_with_config(
        b"k",
        Value::Int32(1),
        ValueConfig {
            destroy: Some(Arc::new(move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
            })),
            stringify: None,
        },
    )
    .unwrap();
    art.insert(b"k", Value::Int32(2)).unwrap();
    assert_eq!(art.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(art.search(b"k"), Some(Value::Int32(2))));
}

#[test]
fn delete_runs_destroyer_once_and_shrinks_size() {
    let mut art = Art::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    art.insert_with_config(
        b"k",
        Value::Int32(1),
        ValueConfig {
            destroy: Some(Arc::new(move |_| {
                calls2.fetch_add(1, Ordering::SeqCst);
            })),
            stringify: None,
        },
    )
    .unwrap();
    assert!(art.delete(b"k").unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(art.len(), 0);
    assert!(!art.delete(b"k").unwrap());
}

/// Mirrors the seven-typed-entries scenario exercised against the ART in
/// the original test suite: a mix of scalar tags plus a custom config-backed
/// object, looked up by distinct keys that share long common prefixes.
#[test]
fn seven_typed_entries_round_trip_by_key() {
    #[derive(Debug, PartialEq)]
    struct Obj {
        idx: i32,
    }

    let mut art = Art::new();
    art.insert(b"key_str", Value::String("value".into())).unwrap();
    art.insert(b"key_int", Value::Int32(7)).unwrap();
    art.insert(b"key_bool", Value::Bool(true)).unwrap();
    art.insert(b"key_float", Value::Float(1.5)).unwrap();
    art.insert(b"key_double", Value::Double(2.5)).unwrap();
    art.insert(b"key_mem", Value::Mem(vec![1, 2, 3, 4])).unwrap();
    art.insert(b"key_obj", Value::Ref(Arc::new(Obj { idx: 9 })))
        .unwrap();

    assert_eq!(art.len(), 7);
    assert!(matches!(art.search(b"key_str"), Some(Value::String(s)) if s == "value"));
    assert!(matches!(art.search(b"key_int"), Some(Value::Int32(7))));
    assert!(matches!(art.search(b"key_bool"), Some(Value::Bool(true))));
    assert!(matches!(art.search(b"key_float"), Some(Value::Float(f)) if (*f - 1.5).abs() < f32::EPSILON));
    assert!(matches!(art.search(b"key_double"), Some(Value::Double(d)) if (*d - 2.5).abs() < f64::EPSILON));
    assert!(matches!(art.search(b"key_mem"), Some(Value::Mem(m)) if m.as_slice() == [1u8, 2, 3, 4]));
    let obj = art.search(b"key_obj").unwrap().downcast_ref::<Obj>().unwrap();
    assert_eq!(obj.idx, 9);

    for key in [
        "key_str",
        "key_int",
        "key_bool",
        "key_float",
        "key_double",
        "key_mem",
        "key_obj",
    ] {
        assert!(art.contains_key(key.as_bytes()));
        assert!(art.delete(key.as_bytes()).unwrap());
    }
    assert_eq!(art.len(), 0);
}

#[test]
fn iteration_visits_every_key_in_lexicographic_order() {
    let mut art = Art::new();
    let words = ["banana", "band", "bandana", "apple", "app", "application"];
    for (i, w) in words.iter().enumerate() {
        art.insert(w.as_bytes(), Value::Int32(i as i32)).unwrap();
    }
    let mut seen: Vec<String> = art
        .iter()
        .map(|(k, _)| String::from_utf8(k.to_vec()).unwrap())
        .collect();
    let mut expected: Vec<String> = words.iter().map(|s| s.to_string()).collect();
    expected.sort();
    seen.sort();
    assert_eq!(seen, expected);

    // the iterator itself must already be in ascending order, not merely
    // sortable to it
    let mut ordered: Vec<String> = art
        .iter()
        .map(|(k, _)| String::from_utf8(k.to_vec()).unwrap())
        .collect();
    let mut expected_sorted = expected.clone();
    expected_sorted.sort();
    assert_eq!(ordered, expected_sorted);
    ordered.clear();
}

#[test]
fn iterator_remove_deletes_current_entry_without_skipping_siblings() {
    let mut art = Art::new();
    for w in ["aa", "ab", "ac", "ad"] {
        art.insert(w.as_bytes(), Value::Int32(0)).unwrap();
    }
    let mut visited = Vec::new();
    {
        let mut cursor = art.iterator();
        while let Some((k, _)) = cursor.next() {
            visited.push(String::from_utf8(k.to_vec()).unwrap());
            if visited.last().unwrap() == "ab" {
                assert!(cursor.remove());
            }
        }
    }
    assert_eq!(visited, vec!["aa", "ab", "ac", "ad"]);
    assert_eq!(art.len(), 3);
    assert!(!art.contains_key(b"ab"));
    assert!(art.contains_key(b"aa"));
    assert!(art.contains_key(b"ac"));
    assert!(art.contains_key(b"ad"));
}

#[test]
fn grows_through_every_fan_out_class() {
    let mut art = Art::new();
    // 300 single-byte-suffix keys sharing an 8-byte prefix force the root's
    // only inner node through Node4 -> Node16 -> Node48 -> Node256.
    for i in 0..300u32 {
        let key = format!("shared__{i:03}");
        art.insert(key.as_bytes(), Value::UInt32(i)).unwrap();
    }
    assert_eq!(art.len(), 300);
    for i in 0..300u32 {
        let key = format!("shared__{i:03}");
        assert!(matches!(art.search(key.as_bytes()), Some(Value::UInt32(v)) if *v == i));
    }
}

#[test]
fn clear_runs_every_destroyer_and_empties_the_tree() {
    let mut art = Art::new();
    let calls = Arc::new(AtomicUsize::new(0));
    for w in ["one", "two", "three"] {
        let calls2 = Arc::clone(&calls);
        art.insert_with_config(
            w.as_bytes(),
            Value::Int32(0),
            ValueConfig {
                destroy: Some(Arc::new(move |_| {
                    calls2.fetch_add(1, Ordering::SeqCst);
                })),
                stringify: None,
            },
        )
        .unwrap();
    }
    art.clear();
    assert_eq!(art.len(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn stringify_uses_configured_renderer_or_falls_back_to_debug() {
    let mut art = Art::new();
    art.insert_with_config(
        b"custom",
        Value::Int32(5),
        ValueConfig {
            destroy: None,
            stringify: Some(Arc::new(|v| match v {
                Value::Int32(n) => format!("n={n}"),
                _ => "?".into(),
            })),
        },
    )
    .unwrap();
    art.insert(b"plain", Value::Int32(9)).unwrap();
    assert_eq!(art.stringify(b"custom").unwrap(), "n=5");
    assert_eq!(art.stringify(b"plain").unwrap(), "Int32(9)");
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_key() -> impl Strategy<Value = Vec<u8>> {
        // no embedded NUL bytes, per the documented precondition
        proptest::collection::vec(1u8..=255, 1..24)
    }

    proptest! {
        #[test]
        fn size_tracks_distinct_key_count(keys in proptest::collection::vec(arb_key(), 0..80)) {
            let mut art = Art::new();
            let mut unique = std::collections::HashSet::new();
            for k in &keys {
                art.insert(k, Value::Int32(1)).unwrap();
                unique.insert(k.clone());
            }
            prop_assert_eq!(art.len(), unique.len());
            for k in &unique {
                prop_assert!(art.contains_key(k));
            }
        }

        #[test]
        fn iteration_order_is_always_sorted(keys in proptest::collection::vec(arb_key(), 0..80)) {
            let mut art = Art::new();
            for k in &keys {
                art.insert(k, Value::Int32(1)).unwrap();
            }
            let observed: Vec<Vec<u8>> = art.iter().map(|(k, _)| k.to_vec()).collect();
            let mut expected = observed.clone();
            expected.sort();
            prop_assert_eq!(observed, expected);
        }

        #[test]
        fn delete_all_inserted_keys_empties_the_tree(keys in proptest::collection::vec(arb_key(), 0..80)) {
            let mut art = Art::new();
            let mut unique = std::collections::HashSet::new();
            for k in &keys {
                art.insert(k, Value::Int32(1)).unwrap();
                unique.insert(k.clone());
            }
            for k in &unique {
                prop_assert!(art.delete(k).unwrap());
            }
            prop_assert_eq!(art.len(), 0);
            prop_assert!(art.is_empty());
        }
    }
}
