//! Listener entries and the per-type listener list.

use std::collections::HashMap;
use uuid::Uuid;

use crate::observable::{Node, NodeId};
use crate::types::ListenerFn;

/// Handle for a registered listener
///
/// Returned by `on`/`once`; pass it to `off` to remove that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Create a new unique listener ID
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Listener({})", &self.0.to_string()[..8])
    }
}

/// What a listener delivers to
#[derive(Clone)]
pub(crate) enum ListenerKind {
    /// A plain callback, invoked with spread arguments.
    Callback(ListenerFn),
    /// An observable node, pushed the raw payload.
    Node(NodeId),
}

/// One entry in a listener list
#[derive(Clone)]
pub(crate) struct Listener {
    pub id: ListenerId,
    pub namespace: Option<String>,
    pub once: bool,
    pub kind: ListenerKind,
}

impl Listener {
    pub fn node(&self) -> Option<NodeId> {
        match self.kind {
            ListenerKind::Node(id) => Some(id),
            ListenerKind::Callback(_) => None,
        }
    }
}

/// Which listeners `off` removes
#[derive(Debug, Clone)]
pub enum Target {
    /// Every listener of the type, or the namespace occupant for `"type.ns"`.
    All,
    /// A single listener registered with `on`/`once`.
    Listener(ListenerId),
    /// A node registered with `observe`/`observe_once`.
    Node(NodeId),
}

impl From<ListenerId> for Target {
    fn from(id: ListenerId) -> Self {
        Target::Listener(id)
    }
}

impl From<&Node> for Target {
    fn from(node: &Node) -> Self {
        Target::Node(node.id())
    }
}

impl From<NodeId> for Target {
    fn from(id: NodeId) -> Self {
        Target::Node(id)
    }
}

/// Ordered listeners for one event type plus the namespace index.
///
/// `slots` maps a namespace to the id of the single entry that holds it.
/// Every mutation goes through this type so the two never drift apart.
#[derive(Default)]
pub(crate) struct ListenerList {
    entries: Vec<Listener>,
    slots: HashMap<String, ListenerId>,
}

impl ListenerList {
    /// Append a listener, returning the namespace occupant it displaced
    pub fn push(&mut self, listener: Listener) -> Option<Listener> {
        let displaced = listener
            .namespace
            .as_deref()
            .and_then(|ns| self.slots.get(ns).copied())
            .and_then(|id| self.remove(id));

        if let Some(ns) = &listener.namespace {
            self.slots.insert(ns.clone(), listener.id);
        }
        self.entries.push(listener);
        displaced
    }

    /// Remove one listener by id, clearing its namespace slot
    pub fn remove(&mut self, id: ListenerId) -> Option<Listener> {
        let position = self.entries.iter().position(|l| l.id == id)?;
        let listener = self.entries.remove(position);
        if let Some(ns) = &listener.namespace {
            if self.slots.get(ns) == Some(&id) {
                self.slots.remove(ns);
            }
        }
        Some(listener)
    }

    pub fn remove_node(&mut self, node: NodeId) -> Option<Listener> {
        let id = self.entries.iter().find(|l| l.node() == Some(node))?.id;
        self.remove(id)
    }

    pub fn clear(&mut self) -> Vec<Listener> {
        self.slots.clear();
        std::mem::take(&mut self.entries)
    }

    pub fn get(&self, id: ListenerId) -> Option<&Listener> {
        self.entries.iter().find(|l| l.id == id)
    }

    pub fn occupant(&self, namespace: &str) -> Option<&Listener> {
        self.slots.get(namespace).and_then(|id| self.get(*id))
    }

    /// Snapshot of the ids in dispatch order
    pub fn ids(&self) -> Vec<ListenerId> {
        self.entries.iter().map(|l| l.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
