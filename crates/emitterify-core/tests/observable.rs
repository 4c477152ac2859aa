use emitterify_core::types::{shared, SharedVec};
use emitterify_core::{json, AsEmitter, Emitter, Error, Node, Target, Value};

fn collect(node: &Node) -> SharedVec<Value> {
    let seen: SharedVec<Value> = shared(Vec::new());
    let sink = seen.clone();
    node.each(move |value, _, _| sink.borrow_mut().push(value.clone()));
    seen
}

fn is_odd(value: &Value) -> bool {
    value.as_i64().is_some_and(|d| d % 2 != 0)
}

#[test]
fn test_filter_then_map() {
    let emitter = Emitter::new();
    let tens = emitter
        .observe("change")
        .filter(|d, _, _| if is_odd(d) { d.clone() } else { json!(false) })
        .map(|d, _, _| d.as_i64().unwrap_or(0) * 10);
    let seen = collect(&tens);

    for d in 0..10 {
        emitter.emit("change", d);
    }
    assert_eq!(*seen.borrow(), vec![json!(10), json!(30), json!(50), json!(70), json!(90)]);
}

#[test]
fn test_filter_index_advances_on_passed_values_only() {
    let emitter = Emitter::new();
    let indices: SharedVec<u64> = shared(Vec::new());
    let sink = indices.clone();

    emitter
        .observe("change")
        .filter(|d, _, _| is_odd(d))
        .map(move |_, index, _| sink.borrow_mut().push(index));

    for d in 0..10 {
        emitter.emit("change", d);
    }
    assert_eq!(*indices.borrow(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_each_index_stays_zero_without_forwarding() {
    let node = Node::detached();
    let indices: SharedVec<u64> = shared(Vec::new());
    let sink = indices.clone();
    node.each(move |_, index, _| sink.borrow_mut().push(index));

    for d in 0..3 {
        node.next(d);
    }
    assert_eq!(*indices.borrow(), vec![0, 0, 0]);
}

#[test]
fn test_reduce_emits_snapshots() {
    let emitter = Emitter::new();
    let odds = emitter.observe("change").reduce(
        |mut acc, d, _, _| {
            if is_odd(d) {
                if let Some(items) = acc.as_array_mut() {
                    items.push(d.clone());
                }
            }
            acc
        },
        json!([]),
    );
    let seen = collect(&odds);

    for d in 0..10 {
        emitter.emit("change", d);
    }
    let seen = seen.borrow();
    assert_eq!(seen.len(), 10);
    assert_eq!(seen[0], json!([]));
    assert_eq!(seen[9], json!([1, 3, 5, 7, 9]));
}

#[test]
fn test_stopping_derived_node_leaves_siblings() {
    let emitter = Emitter::new();
    let source = emitter.observe("change");
    let a = source.map(|d, _, _| d.clone());
    let b = source.map(|d, _, _| d.clone());
    let seen_a = collect(&a);
    let seen_b = collect(&b);

    emitter.emit("change", 1);
    a.unsubscribe();
    emitter.emit("change", 2);

    assert_eq!(*seen_a.borrow(), vec![json!(1)]);
    assert_eq!(*seen_b.borrow(), vec![json!(1), json!(2)]);
    assert_eq!(source.child_count(), 1);
}

#[test]
fn test_stop_releases_nodes() {
    let emitter = Emitter::new();
    let source = emitter.observe("change");
    source.map(|d, _, _| d.clone()).filter(|d, _, _| d.clone());
    assert_eq!(emitter.node_count(), 3);

    source.unsubscribe();
    assert_eq!(emitter.node_count(), 0);
}

#[test]
fn test_stopping_namespaced_subscription_clears_slot() {
    let emitter = Emitter::new();
    let node = emitter.observe("foo.ns");
    assert_eq!(emitter.listener_count("foo"), 1);
    assert!(emitter.occupant("foo.ns").is_some());

    node.unsubscribe();
    assert_eq!(emitter.listener_count("foo"), 0);
    assert!(emitter.occupant("foo.ns").is_none());
}

#[test]
fn test_namespaced_observe_returns_live_node() {
    let emitter = Emitter::new();
    let first = emitter.observe("foo.ns");
    let second = emitter.observe("foo.ns");

    assert_eq!(first, second);
    assert_eq!(emitter.listener_count("foo"), 1);
}

#[test]
fn test_off_with_node() {
    let emitter = Emitter::new();
    let node = emitter.observe("change");
    emitter.on("change", |_, _| {});

    assert_eq!(emitter.off("change", &node), 1);
    assert_eq!(emitter.listener_count("change"), 1);
    assert!(node.is_active());

    emitter.emit("change", 1);
    assert_eq!(node.index(), 0);
    assert_eq!(emitter.off("change", Target::Node(node.id())), 0);

    assert_eq!(emitter.node_count(), 1);
    drop(node);
    assert_eq!(emitter.node_count(), 0);
}

#[test]
fn test_off_frees_unheld_nodes() {
    let emitter = Emitter::new();
    for _ in 0..50 {
        emitter.observe("x").map(|d, _, _| d.clone());
    }
    assert_eq!(emitter.node_count(), 100);

    assert_eq!(emitter.off("x", Target::All), 50);
    assert_eq!(emitter.node_count(), 0);
}

#[test]
fn test_held_node_survives_off_until_dropped() {
    let emitter = Emitter::new();
    let source = emitter.observe("x");
    let leaf = source.map(|d, _, _| d.clone());
    drop(source);

    emitter.off("x", Target::All);
    assert!(leaf.is_active());
    assert_eq!(leaf.next(3), json!(3));

    drop(leaf);
    assert_eq!(emitter.node_count(), 0);
}

#[test]
fn test_observe_once_delivers_single_value() {
    let emitter = Emitter::new();
    let node = emitter.observe_once("change");
    let seen = collect(&node);

    emitter.emit("change", 1);
    emitter.emit("change", 2);

    assert_eq!(*seen.borrow(), vec![json!(1)]);
    assert_eq!(emitter.listener_count("change"), 0);
}

#[tokio::test]
async fn test_spent_once_nodes_are_freed() {
    let emitter = Emitter::new();
    for i in 0..100 {
        let node = emitter.observe_once("x");
        emitter.emit("x", i);
        assert_eq!(node.await.ok(), Some(json!(i)));
    }
    assert_eq!(emitter.node_count(), 0);
    assert_eq!(emitter.listener_count("x"), 0);
}

#[test]
fn test_node_off_detaches_children() {
    let node = Node::detached();
    let a = node.map(|d, _, _| d.clone());
    let b = node.map(|d, _, _| d.clone());

    node.off(Some(&a));
    assert_eq!(node.children(), vec![b.clone()]);
    assert!(a.parent().is_none());

    node.off(None);
    assert_eq!(node.child_count(), 0);
    assert!(b.is_active());
}

#[test]
fn test_stop_collects_hook_replies_and_cascades() {
    let node = Node::detached();
    let child = node.map(|d, _, _| d.clone());
    node.emitter().on("stop", |_, args| format!("parent {}", args[0]));
    child.emitter().on("stop", |_, _| "child closed");

    let replies = node.stop("bye");
    assert_eq!(replies, vec![json!("parent \"bye\""), json!("child closed")]);
    assert!(!child.is_active());
}

#[test]
fn test_until_stops_source() {
    let emitter = Emitter::new();
    let source = emitter.observe("tick");
    let leaf = source.map(|d, _, _| d.clone());
    let stopper = emitter.observe("halt");
    leaf.until(&stopper);

    let seen = collect(&leaf);
    emitter.emit("tick", 1);
    emitter.emit("halt", "enough");
    emitter.emit("tick", 2);

    assert_eq!(*seen.borrow(), vec![json!(1)]);
    assert!(!source.is_active());
    assert_eq!(emitter.listener_count("tick"), 0);
    assert_eq!(stopper.child_count(), 0);
}

#[test]
fn test_until_trigger_leaves_with_stopped_source() {
    let emitter = Emitter::new();
    let stopper = emitter.observe("halt");

    for _ in 0..10 {
        let node = emitter.observe("tick");
        node.until(&stopper);
        node.unsubscribe();
    }
    assert_eq!(stopper.child_count(), 0);
    assert_eq!(emitter.node_count(), 1);
}

#[test]
fn test_unsubscribe_signals_before_stop() {
    let node = Node::detached();
    let order: SharedVec<&'static str> = shared(Vec::new());
    let first = order.clone();
    node.emitter().on("unsubscribe", move |_, _| first.borrow_mut().push("unsubscribe"));
    let second = order.clone();
    node.emitter().on("stop", move |_, _| second.borrow_mut().push("stop"));

    node.unsubscribe();
    assert_eq!(*order.borrow(), vec!["unsubscribe", "stop"]);
}

#[test]
fn test_stop_skips_unsubscribe_signal() {
    let node = Node::detached();
    let order: SharedVec<&'static str> = shared(Vec::new());
    let first = order.clone();
    node.emitter().on("unsubscribe", move |_, _| first.borrow_mut().push("unsubscribe"));
    let second = order.clone();
    node.emitter().on("stop", move |_, _| second.borrow_mut().push("stop"));

    node.stop("done");
    assert_eq!(*order.borrow(), vec!["stop"]);
}

#[test]
fn test_pipe_applies_custom_operator() {
    let node = Node::detached();
    let doubled = node.pipe(|n| n.map(|d, _, _| d.as_i64().unwrap_or(0) * 2));
    let seen = collect(&doubled);

    node.next(21);
    assert_eq!(*seen.borrow(), vec![json!(42)]);
}

#[tokio::test]
async fn test_await_resolves_first_value() {
    let emitter = Emitter::new();
    let node = emitter.observe("ready");

    let handle = node.clone();
    let waiter = async move { handle.await };
    emitter.emit("ready", json!([1, 2]));
    emitter.emit("ready", 3);

    assert_eq!(waiter.await.ok(), Some(json!([1, 2])));
}

#[tokio::test]
async fn test_await_after_stop_is_cancelled() {
    let node = Node::detached();
    let waiting = node.value();
    node.unsubscribe();

    let outcome = waiting.await;
    assert!(matches!(outcome, Err(Error::Cancelled { .. })));
}

#[tokio::test]
async fn test_value_is_pending_until_pushed() {
    let node = Node::detached();
    let mut waiting = node.value();

    assert!(futures::poll!(&mut waiting).is_pending());
    node.next("late");
    assert_eq!(waiting.await.ok(), Some(json!("late")));
}

#[tokio::test]
async fn test_rearm_settles_again() {
    let node = Node::detached();
    node.next(1);
    assert_eq!(node.value().await.ok(), Some(json!(1)));

    node.rearm();
    node.next(2);
    assert_eq!(node.value().await.ok(), Some(json!(2)));
}

#[tokio::test]
async fn test_unpromise_hands_out_stream() {
    let emitter = Emitter::new();
    let source = emitter.observe("change");

    let stream: Node = async { source.unpromise().await }.await;
    let seen = collect(&stream);
    emitter.emit("change", 5);

    assert_eq!(*seen.borrow(), vec![json!(5)]);
}
