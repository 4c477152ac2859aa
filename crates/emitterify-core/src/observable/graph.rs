//! Node arena.
//!
//! Every node lives in the graph of the emitter that created its root,
//! keyed by [`NodeId`]. Parent/child links and owner links are ids, so
//! detaching a node is a lookup and a removal rather than pointer surgery.

use serde_json::Value;
use std::collections::HashMap;
use std::task::Waker;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::registry::{Emitter, ListenerId};
use crate::types::OperatorFn;

/// Identifies a node within its emitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({})", &self.0.to_string()[..8])
    }
}

/// Where a node is held
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Owner {
    /// A listener entry in the emitter's registry.
    Registry { kind: String, listener: ListenerId },
    /// The child list of another node.
    Node(NodeId),
    /// Nothing; the node only receives what is pushed into it directly.
    Detached,
}

/// The single outstanding pull on a node
pub(crate) struct PendingPull {
    pub listener: NodeId,
    pub tx: oneshot::Sender<Value>,
}

pub(crate) struct NodeSlot {
    pub owner: Owner,
    pub children: Vec<NodeId>,
    pub operator: Option<OperatorFn>,
    pub index: u64,
    pub settled: Option<Value>,
    pub wakers: Vec<Waker>,
    pub hooks: Emitter,
    pub pull: Option<PendingPull>,
    /// Live [`Node`](super::Node) handles addressing this slot.
    pub handles: usize,
}

impl NodeSlot {
    pub fn new(owner: Owner, operator: Option<OperatorFn>, hooks: Emitter) -> Self {
        Self {
            owner,
            children: Vec::new(),
            operator,
            index: 0,
            settled: None,
            wakers: Vec::new(),
            hooks,
            pull: None,
            handles: 0,
        }
    }
}

#[derive(Default)]
pub(crate) struct Graph {
    slots: HashMap<NodeId, NodeSlot>,
}

impl Graph {
    pub fn insert(&mut self, id: NodeId, slot: NodeSlot) {
        self.slots.insert(id, slot);
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeSlot> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeSlot> {
        self.slots.get_mut(&id)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<NodeSlot> {
        self.slots.remove(&id)
    }

    /// Drop the owner link of `id`
    ///
    /// Returns true when nothing can reach the node anymore: no owner and
    /// no handle left.
    pub fn disown(&mut self, id: NodeId) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.owner = Owner::Detached;
                slot.handles == 0
            }
            None => false,
        }
    }

    pub fn retain_handle(&mut self, id: NodeId) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.handles += 1;
                true
            }
            None => false,
        }
    }

    /// Forget one handle of `id`; true when that left the node unreachable
    pub fn release_handle(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        slot.handles = slot.handles.saturating_sub(1);
        slot.handles == 0 && slot.owner == Owner::Detached
    }

    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.slots.get_mut(&parent) {
            Some(slot) => {
                slot.children.push(child);
                true
            }
            None => false,
        }
    }

    pub fn detach_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(slot) = self.slots.get_mut(&parent) else {
            return false;
        };
        let before = slot.children.len();
        slot.children.retain(|c| *c != child);
        slot.children.len() != before
    }

    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        self.slots
            .get_mut(&parent)
            .map(|slot| std::mem::take(&mut slot.children))
            .unwrap_or_default()
    }

    pub fn is_child(&self, parent: NodeId, child: NodeId) -> bool {
        self.slots
            .get(&parent)
            .is_some_and(|slot| slot.children.contains(&child))
    }

    /// Walk owner links up to the root of `id`'s chain
    pub fn source(&self, mut id: NodeId) -> NodeId {
        while let Some(Owner::Node(parent)) = self.slots.get(&id).map(|slot| &slot.owner) {
            if !self.slots.contains_key(parent) {
                break;
            }
            id = *parent;
        }
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
