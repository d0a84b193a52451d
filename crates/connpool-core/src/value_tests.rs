use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn tag_matches_variant() {
    assert_eq!(Value::None.tag(), ValueTag::None);
    assert_eq!(Value::Int32(1).tag(), ValueTag::Int32);
    assert_eq!(Value::Bool(true).tag(), ValueTag::Bool);
    assert_eq!(Value::String("x".into()).tag(), ValueTag::String);
    assert_eq!(Value::Mem(vec![1, 2, 3]).tag(), ValueTag::Mem);
    assert_eq!(Value::Json("{}".into()).tag(), ValueTag::Json);
}

#[derive(Debug, PartialEq)]
struct Obj {
    idx: i32,
    name: String,
}

#[test]
fn ref_downcasts_to_concrete_type() {
    let obj = Arc::new(Obj {
        idx: 1,
        name: "obj0".into(),
    });
    let v = Value::Ref(obj);
    let back = v.downcast_ref::<Obj>().expect("downcast should succeed");
    assert_eq!(back.idx, 1);
    assert_eq!(back.name, "obj0");
}

#[test]
fn ref_downcast_wrong_type_is_none() {
    let v = Value::Ref(Arc::new(42i32));
    assert!(v.downcast_ref::<Obj>().is_none());
}

#[test]
fn destroyer_runs_exactly_once_when_invoked() {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = Arc::clone(&calls);
    let cfg = ValueConfig {
        destroy: Some(Arc::new(move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        })),
        stringify: None,
    };
    let v = Value::Mem(vec![0; 10]);
    if let Some(destroy) = &cfg.destroy {
        destroy(&v);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
