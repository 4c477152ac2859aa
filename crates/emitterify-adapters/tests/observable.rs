use emitterify_adapters::Observable;
use emitterify_core::types::{shared, SharedVec, Teardown};
use emitterify_core::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_observable_chain_and_teardown() {
    let subscribed = Rc::new(Cell::new(false));
    let flag = subscribed.clone();
    let observable = Observable::new(move |observer| {
        flag.set(true);
        observer.next("foo");
        let flag = flag.clone();
        Some(Box::new(move || flag.set(false)) as Teardown)
    });

    let node = observable.subscribe();
    let lengths: SharedVec<Value> = shared(Vec::new());
    let sink = lengths.clone();
    node.map(|d, _, _| format!("{}bar", d.as_str().unwrap_or_default()))
        .filter(|d, _, _| d == "foobar")
        .reduce(|_, d, _, _| d.as_str().map_or(0, str::len), 0)
        .each(move |v, _, _| sink.borrow_mut().push(v.clone()));

    assert!(subscribed.get());
    node.next("foo");
    assert_eq!(*lengths.borrow(), vec![json!(6)]);

    node.source().unsubscribe();
    assert!(!subscribed.get());
}

#[test]
fn test_teardown_runs_once() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let observable = Observable::new(move |_| {
        let counter = counter.clone();
        Some(Box::new(move || counter.set(counter.get() + 1)) as Teardown)
    });

    let node = observable.subscribe();
    node.unsubscribe();
    node.unsubscribe();
    assert_eq!(runs.get(), 1);
}

#[tokio::test]
async fn test_subscription_awaits_first_value() {
    let observable = Observable::new(|observer| {
        observer.next(json!({ "ready": true }));
        None
    });

    let node = observable.subscribe();
    assert_eq!(node.await.ok(), Some(json!({ "ready": true })));
}
