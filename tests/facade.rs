use emitterify::{emitterify, json, AsEmitter, Emitter, Observable, Store, Target, Value};
use futures::StreamExt;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_version_info() {
    assert!(!emitterify::VERSION.is_empty());
    assert!(emitterify::BUILD_DATE.ends_with("UTC"));
}

#[test]
fn test_init_logging_twice_reports_error() {
    let _ = emitterify::init_logging();
    assert!(emitterify::init_logging().is_err());
}

#[test]
fn test_emitterify_unit_gives_fresh_emitter() {
    let emitter: Emitter = emitterify(());
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    emitter.on("change", move |_, _| counter.set(counter.get() + 1));

    emitter.emit("change", Value::Null);
    emitter.off("change", Target::All);
    emitter.emit("change", Value::Null);
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_store_lens_as_stream() {
    let store = Store::new(json!({ "count": 0 }));
    let lens = store.lens("count");
    let updates = lens.map(|record, _, _| record["value"].clone());
    let mut stream = updates.stream();

    assert!(futures::poll!(stream.next()).is_pending());
    store.set("count", 1).unwrap();
    assert_eq!(stream.next().await, Some(json!(1)));

    assert!(futures::poll!(stream.next()).is_pending());
    lens.unsubscribe();
    assert_eq!(stream.next().await, None);
    assert_eq!(store.emitter().listener_count("change"), 0);
}

#[test]
fn test_observable_from_facade() {
    let observable = Observable::new(|observer| {
        observer.next(42);
        None
    });
    assert_eq!(observable.subscribe().peek(), Some(json!(42)));
}
