//! Emitter implementation.
//!
//! Provides the [`Emitter`] handle with the four registry operations
//! (`on`, `once`, `off`, `emit`), the no-callback subscription forms that
//! hand out observable nodes, and the capability traits used to make other
//! values event-capable.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Deref;
use std::rc::Rc;

use super::listener::{Listener, ListenerId, ListenerKind, ListenerList, Target};
use crate::config::{EmitterConfig, WILDCARD};
use crate::fault::isolate;
use crate::observable::{self, Graph, Node, Owner};
use crate::types::{flatten_into, spread, IntoReply, ListenerFn, Shared};

/// Listener lists keyed by base event type
#[derive(Default)]
pub(crate) struct Registry {
    lists: HashMap<String, ListenerList>,
}

impl Registry {
    pub fn list(&self, id: &str) -> Option<&ListenerList> {
        self.lists.get(id)
    }

    pub fn list_mut(&mut self, id: &str) -> Option<&mut ListenerList> {
        self.lists.get_mut(id)
    }

    pub fn entry(&mut self, id: &str) -> &mut ListenerList {
        self.lists.entry(id.to_string()).or_default()
    }

    pub fn remove(&mut self, id: &str, listener: ListenerId) -> Option<Listener> {
        self.lists.get_mut(id)?.remove(listener)
    }
}

/// Shared state behind every handle of one emitter
pub(crate) struct Core {
    pub registry: RefCell<Registry>,
    pub graph: RefCell<Graph>,
    pub config: EmitterConfig,
}

/// An event-capable body
///
/// Cloning an `Emitter` clones the handle; all clones share the same
/// listener lists. Dispatch is synchronous and single-threaded: `emit` runs
/// every matching listener, in registration order, before it returns.
#[derive(Clone)]
pub struct Emitter {
    core: Rc<Core>,
}

impl Emitter {
    /// Create a new emitter with default configuration
    pub fn new() -> Self {
        Self::with_config(EmitterConfig::default())
    }

    /// Create a new emitter with custom configuration
    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            core: Rc::new(Core {
                registry: RefCell::new(Registry::default()),
                graph: RefCell::new(Graph::default()),
                config,
            }),
        }
    }

    pub(crate) fn core(&self) -> &Rc<Core> {
        &self.core
    }

    /// Get the current configuration
    pub fn config(&self) -> &EmitterConfig {
        &self.core.config
    }

    /// Whether two handles refer to the same emitter
    pub fn ptr_eq(&self, other: &Emitter) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    /// Register a callback for `kind` (`"name"` or `"name.namespace"`)
    ///
    /// Without a namespace the callback is appended, duplicates included.
    /// With a namespace it replaces whichever listener held that namespace.
    /// The callback receives this emitter and the payload arguments: an array
    /// payload is spread, anything else is the single argument.
    pub fn on<F, R>(&self, kind: &str, callback: F) -> ListenerId
    where
        F: Fn(&Emitter, &[Value]) -> R + 'static,
        R: IntoReply,
    {
        let callback: ListenerFn =
            Rc::new(move |ctx: &Emitter, args: &[Value]| callback(ctx, args).into_reply());
        self.register(kind, false, callback)
    }

    /// Register a callback that is removed before its first invocation
    pub fn once<F, R>(&self, kind: &str, callback: F) -> ListenerId
    where
        F: Fn(&Emitter, &[Value]) -> R + 'static,
        R: IntoReply,
    {
        let callback: ListenerFn =
            Rc::new(move |ctx: &Emitter, args: &[Value]| callback(ctx, args).into_reply());
        self.register(kind, true, callback)
    }

    /// Subscribe to `kind` and get an observable node instead of a callback
    ///
    /// Each call without a namespace yields a new, independent node. With a
    /// namespace, the live node already holding that namespace is returned.
    pub fn observe(&self, kind: &str) -> Node {
        self.subscribe(kind, false)
    }

    /// Like [`observe`](Self::observe), delivering a single value
    pub fn observe_once(&self, kind: &str) -> Node {
        self.subscribe(kind, true)
    }

    /// Remove listeners from `kind`
    ///
    /// - `Target::All` on `"name"` clears the whole list
    /// - `Target::All` on `"name.ns"` removes the namespace occupant only
    /// - a listener id or node removes just that entry
    ///
    /// Returns the number of removed listeners.
    pub fn off(&self, kind: &str, target: impl Into<Target>) -> usize {
        let (id, namespace) = self.core.config.split(kind);
        let removed: Vec<Listener> = {
            let mut registry = self.core.registry.borrow_mut();
            let Some(list) = registry.list_mut(id) else {
                return 0;
            };
            match (target.into(), namespace) {
                (Target::All, Some(ns)) => {
                    let occupant = list.occupant(ns).map(|l| l.id);
                    occupant.and_then(|l| list.remove(l)).into_iter().collect()
                }
                (Target::All, None) => list.clear(),
                (Target::Listener(listener), _) => list.remove(listener).into_iter().collect(),
                (Target::Node(node), _) => list.remove_node(node).into_iter().collect(),
            }
        };

        for listener in &removed {
            self.release(listener);
        }
        if !removed.is_empty() {
            tracing::debug!("Removed {} listener(s) from '{}'", removed.len(), kind);
        }
        removed.len()
    }

    /// Emit `payload` to every listener of `kind`, then to the wildcard
    ///
    /// Returns the listeners' return values, flattened one level.
    pub fn emit(&self, kind: &str, payload: impl Into<Value>) -> Vec<Value> {
        self.dispatch(kind, payload.into(), None)
    }

    /// Emit, skipping namespaced listeners whose namespace fails `filter`
    ///
    /// Listeners without a namespace and wildcard listeners always run.
    pub fn emit_filtered<F>(&self, kind: &str, payload: impl Into<Value>, filter: F) -> Vec<Value>
    where
        F: Fn(&str) -> bool,
    {
        self.dispatch(kind, payload.into(), Some(&filter))
    }

    /// Number of listeners registered under the base type of `kind`
    pub fn listener_count(&self, kind: &str) -> usize {
        let (id, _) = self.core.config.split(kind);
        self.core.registry.borrow().list(id).map_or(0, ListenerList::len)
    }

    /// The listener holding the namespace of `kind` (`"name.ns"`), if any
    pub fn occupant(&self, kind: &str) -> Option<ListenerId> {
        let (id, namespace) = self.core.config.split(kind);
        let registry = self.core.registry.borrow();
        registry.list(id)?.occupant(namespace?).map(|l| l.id)
    }

    /// Event types that currently have listeners, sorted
    pub fn event_types(&self) -> Vec<String> {
        let registry = self.core.registry.borrow();
        let mut types: Vec<String> = registry
            .lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        types.sort();
        types
    }

    /// Number of live nodes created from this emitter
    pub fn node_count(&self) -> usize {
        self.core.graph.borrow().len()
    }

    /// Drop every listener of every type
    pub(crate) fn clear(&self) {
        let lists = std::mem::take(&mut self.core.registry.borrow_mut().lists);
        for mut list in lists.into_values() {
            for listener in list.clear() {
                self.release(&listener);
            }
        }
    }

    fn register(&self, kind: &str, once: bool, callback: ListenerFn) -> ListenerId {
        let (id, namespace) = self.core.config.split(kind);
        let listener = Listener {
            id: ListenerId::new(),
            namespace: namespace.map(str::to_string),
            once,
            kind: ListenerKind::Callback(callback),
        };
        let listener_id = listener.id;

        let displaced = self.core.registry.borrow_mut().entry(id).push(listener);
        if let Some(displaced) = displaced {
            self.release(&displaced);
        }
        tracing::debug!("{} added to '{}'", listener_id, kind);
        listener_id
    }

    fn subscribe(&self, kind: &str, once: bool) -> Node {
        let (id, namespace) = self.core.config.split(kind);

        if let Some(ns) = namespace {
            let current = self
                .core
                .registry
                .borrow()
                .list(id)
                .and_then(|list| list.occupant(ns))
                .and_then(Listener::node);
            if let Some(node) = current.and_then(|node| Node::attach(&self.core, node)) {
                return node;
            }
        }

        let listener_id = ListenerId::new();
        let node = Node::create(
            &self.core,
            Owner::Registry {
                kind: id.to_string(),
                listener: listener_id,
            },
            None,
        );
        let listener = Listener {
            id: listener_id,
            namespace: namespace.map(str::to_string),
            once,
            kind: ListenerKind::Node(node.id()),
        };

        let displaced = self.core.registry.borrow_mut().entry(id).push(listener);
        if let Some(displaced) = displaced {
            self.release(&displaced);
        }
        tracing::debug!("{} observing '{}'", node.id(), kind);
        node
    }

    /// Forget the owner link of a node whose registry entry went away
    ///
    /// The node keeps running for whoever still holds it and is freed
    /// with its last handle.
    fn release(&self, listener: &Listener) {
        if let Some(node) = listener.node() {
            observable::release(&self.core, node);
        }
    }

    fn dispatch(
        &self,
        kind: &str,
        payload: Value,
        filter: Option<&dyn Fn(&str) -> bool>,
    ) -> Vec<Value> {
        let (id, _) = self.core.config.split(kind);
        if self.core.config.trace_dispatch {
            tracing::trace!(event = kind, "emit");
        }

        let mut replies = Vec::new();
        if id != WILDCARD {
            self.fan_out(id, kind, &payload, filter, &mut replies);
        }
        let descriptor = Value::Array(vec![Value::String(kind.to_string()), payload]);
        self.fan_out(WILDCARD, kind, &descriptor, None, &mut replies);
        replies
    }

    /// Deliver to one listener list.
    ///
    /// Works on a snapshot of ids and re-checks each one before delivery, so
    /// listeners removed mid-pass are skipped and none is reached twice.
    fn fan_out(
        &self,
        id: &str,
        event: &str,
        payload: &Value,
        filter: Option<&dyn Fn(&str) -> bool>,
        replies: &mut Vec<Value>,
    ) {
        let pending = match self.core.registry.borrow().list(id) {
            Some(list) => list.ids(),
            None => return,
        };

        for listener_id in pending {
            let selected = self
                .core
                .registry
                .borrow()
                .list(id)
                .and_then(|list| list.get(listener_id))
                .map(|l| (l.namespace.clone(), l.once));
            let Some((namespace, once)) = selected else {
                continue;
            };
            if let (Some(ns), Some(filter)) = (namespace.as_deref(), filter) {
                if !filter(ns) {
                    continue;
                }
            }

            // once listeners leave the list before they run
            let listener = {
                let mut registry = self.core.registry.borrow_mut();
                let Some(list) = registry.list_mut(id) else {
                    break;
                };
                if once {
                    list.remove(listener_id)
                } else {
                    list.get(listener_id).cloned()
                }
            };

            let Some(listener) = listener else {
                continue;
            };
            let spent = if once { listener.node() } else { None };
            if let Some(reply) = self.invoke(event, listener, payload) {
                flatten_into(replies, reply);
            }
            if let Some(node) = spent {
                observable::release(&self.core, node);
            }
        }
    }

    fn invoke(&self, event: &str, listener: Listener, payload: &Value) -> Option<Value> {
        match listener.kind {
            ListenerKind::Callback(callback) => {
                isolate(&self.core.config, event, || callback(self, spread(payload)))
            }
            ListenerKind::Node(id) => {
                Node::attach(&self.core, id).map(|node| node.next(payload.clone()))
            }
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types = match self.core.registry.try_borrow() {
            Ok(registry) => registry.lists.len(),
            Err(_) => 0,
        };
        f.debug_struct("Emitter")
            .field("event_types", &types)
            .field("config", &self.core.config)
            .finish()
    }
}

/// Anything that exposes an emitter
pub trait AsEmitter {
    /// The emitter backing this value
    fn emitter(&self) -> &Emitter;
}

impl AsEmitter for Emitter {
    fn emitter(&self) -> &Emitter {
        self
    }
}

/// A body made event-capable
///
/// Derefs to its [`Emitter`], so `on`/`once`/`off`/`emit` are available
/// directly; the wrapped value is reachable through [`body`](Self::body).
#[derive(Clone)]
pub struct Evented<B> {
    body: B,
    emitter: Emitter,
}

impl<B> Evented<B> {
    /// Wrap `body` with a fresh emitter
    pub fn new(body: B) -> Self {
        Self::with_config(body, EmitterConfig::default())
    }

    /// Wrap `body` with a fresh emitter using `config`
    pub fn with_config(body: B, config: EmitterConfig) -> Self {
        Self {
            body,
            emitter: Emitter::with_config(config),
        }
    }

    /// The wrapped value
    pub fn body(&self) -> &B {
        &self.body
    }

    /// The wrapped value, mutably
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// Split into the wrapped value and its emitter
    pub fn into_parts(self) -> (B, Emitter) {
        (self.body, self.emitter)
    }
}

impl<B> Deref for Evented<B> {
    type Target = Emitter;

    fn deref(&self) -> &Emitter {
        &self.emitter
    }
}

impl<B> AsEmitter for Evented<B> {
    fn emitter(&self) -> &Emitter {
        &self.emitter
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for Evented<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evented")
            .field("body", &self.body)
            .field("emitter", &self.emitter)
            .finish()
    }
}

/// Make a value event-capable
///
/// Already-capable values come back unchanged with their listeners intact.
pub trait Emitterify {
    /// The event-capable form
    type Output: AsEmitter;

    /// Attach the emitter capability
    fn emitterify(self) -> Self::Output;
}

impl Emitterify for () {
    type Output = Emitter;

    fn emitterify(self) -> Emitter {
        Emitter::new()
    }
}

impl Emitterify for Emitter {
    type Output = Emitter;

    fn emitterify(self) -> Emitter {
        self
    }
}

impl<B> Emitterify for Evented<B> {
    type Output = Evented<B>;

    fn emitterify(self) -> Evented<B> {
        self
    }
}

impl Emitterify for Value {
    type Output = Evented<Value>;

    fn emitterify(self) -> Evented<Value> {
        Evented::new(self)
    }
}

impl<T> Emitterify for Shared<T> {
    type Output = Evented<Shared<T>>;

    fn emitterify(self) -> Evented<Shared<T>> {
        Evented::new(self)
    }
}

/// Make `target` event-capable; pass `()` for a fresh emitter
pub fn emitterify<T: Emitterify>(target: T) -> T::Output {
    target.emitterify()
}
