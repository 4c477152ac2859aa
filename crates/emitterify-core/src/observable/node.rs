//! Observable node handle and its operators.

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

use super::graph::{NodeId, NodeSlot, Owner};
use super::settle::{Settled, Unpromised};
use crate::fault::isolate;
use crate::registry::{AsEmitter, Core, Emitter, Emitterify};
use crate::types::{flatten_into, truthy, IntoReply, OperatorFn};

/// A point in a derived stream
///
/// Created by [`Emitter::observe`] or by an operator on another node. Values
/// pushed with [`next`](Self::next) settle the node's value slot and flow to
/// its children. A node is also an event emitter (see [`AsEmitter`]): its
/// lifecycle signals `"unsubscribe"`, `"stop"` and `"pull"` are emitted there.
///
/// Handles are cheap to clone; all clones address the same node. A node that
/// has lost its owner (registry entry or parent) is freed with its last handle.
pub struct Node {
    pub(crate) core: Rc<Core>,
    pub(crate) id: NodeId,
    pub(crate) hooks: Emitter,
}

impl Node {
    pub(crate) fn create(core: &Rc<Core>, owner: Owner, operator: Option<OperatorFn>) -> Node {
        let id = NodeId::new();
        let hooks = Emitter::with_config(core.config.clone());
        let mut slot = NodeSlot::new(owner, operator, hooks.clone());
        slot.handles = 1;
        core.graph.borrow_mut().insert(id, slot);
        Node {
            core: core.clone(),
            id,
            hooks,
        }
    }

    /// Handle for a live node, `None` once it has been stopped
    pub(crate) fn attach(core: &Rc<Core>, id: NodeId) -> Option<Node> {
        let hooks = {
            let mut graph = core.graph.borrow_mut();
            let slot = graph.get_mut(id)?;
            slot.handles += 1;
            slot.hooks.clone()
        };
        Some(Node {
            core: core.clone(),
            id,
            hooks,
        })
    }

    /// Create a node that is not fed by any emitter
    ///
    /// Values arrive only through [`next`](Self::next).
    pub fn detached() -> Node {
        Node::create(Emitter::new().core(), Owner::Detached, None)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Number of values pushed into this node so far
    pub fn index(&self) -> u64 {
        self.core.graph.borrow().get(self.id).map_or(0, |slot| slot.index)
    }

    /// Whether the node has not been stopped
    pub fn is_active(&self) -> bool {
        self.core.graph.borrow().get(self.id).is_some()
    }

    pub fn child_count(&self) -> usize {
        self.core
            .graph
            .borrow()
            .get(self.id)
            .map_or(0, |slot| slot.children.len())
    }

    /// The live children, in delivery order
    pub fn children(&self) -> Vec<Node> {
        let ids = self
            .core
            .graph
            .borrow()
            .get(self.id)
            .map(|slot| slot.children.clone())
            .unwrap_or_default();
        ids.into_iter()
            .filter_map(|id| Node::attach(&self.core, id))
            .collect()
    }

    /// The node this one was derived from, if it is still attached
    pub fn parent(&self) -> Option<Node> {
        let owner = self.core.graph.borrow().get(self.id)?.owner.clone();
        match owner {
            Owner::Node(parent) => Node::attach(&self.core, parent),
            _ => None,
        }
    }

    /// The root of this node's chain
    pub fn source(&self) -> Node {
        let root = self.core.graph.borrow().source(self.id);
        Node::attach(&self.core, root).unwrap_or_else(|| self.clone())
    }

    /// Run `f` on every value, with the child's index and the child itself
    ///
    /// The lowest-level operator: nothing is forwarded unless `f` calls
    /// `next` on the child it is given. The index counts the values pushed
    /// into that child, so a callback that never forwards always sees `0`.
    pub fn each<F, R>(&self, f: F) -> Node
    where
        F: Fn(&Value, u64, &Node) -> R + 'static,
        R: IntoReply,
    {
        let operator: OperatorFn =
            Rc::new(move |value: &Value, index: u64, node: &Node| f(value, index, node).into_reply());
        self.derive(operator)
    }

    /// Push `f(value, index, child)` downstream
    pub fn map<F, R>(&self, f: F) -> Node
    where
        F: Fn(&Value, u64, &Node) -> R + 'static,
        R: IntoReply,
    {
        self.each(move |value, index, node| -> anyhow::Result<Value> {
            let mapped = f(value, index, node).into_reply()?;
            Ok(node.next(mapped))
        })
    }

    /// Push the value downstream when `f` returns something truthy
    pub fn filter<F, R>(&self, f: F) -> Node
    where
        F: Fn(&Value, u64, &Node) -> R + 'static,
        R: IntoReply,
    {
        self.each(move |value, index, node| -> anyhow::Result<Value> {
            let verdict = f(value, index, node).into_reply()?;
            if truthy(&verdict) {
                Ok(node.next(value.clone()))
            } else {
                Ok(verdict)
            }
        })
    }

    /// Fold every value into an accumulator and push each new accumulator
    pub fn reduce<F, R>(&self, f: F, seed: impl Into<Value>) -> Node
    where
        F: Fn(Value, &Value, u64, &Node) -> R + 'static,
        R: IntoReply,
    {
        let acc = RefCell::new(seed.into());
        self.each(move |value, index, node| -> anyhow::Result<Value> {
            let current = acc.borrow().clone();
            let folded = f(current, value, index, node).into_reply()?;
            acc.replace(folded.clone());
            Ok(node.next(folded))
        })
    }

    /// Hand this node to `f`, for custom operators
    pub fn pipe<T>(&self, f: impl FnOnce(&Node) -> T) -> T {
        f(self)
    }

    /// A forwarding child that awaits to itself instead of its value
    pub fn unpromise(&self) -> Unpromised {
        Unpromised::new(self.each(|value, _, node| node.next(value.clone())))
    }

    /// Remove `child` from this node's children, or all children with `None`
    pub fn off(&self, child: Option<&Node>) -> &Self {
        let removed = {
            let mut graph = self.core.graph.borrow_mut();
            match child {
                Some(child) => {
                    if graph.detach_child(self.id, child.id) {
                        vec![child.id]
                    } else {
                        Vec::new()
                    }
                }
                None => graph.take_children(self.id),
            }
        };

        for id in removed {
            release(&self.core, id);
        }
        self
    }

    /// Stop this node's source whenever `stop_source` produces a value
    ///
    /// The trigger is removed from `stop_source` once the source stops.
    pub fn until(&self, stop_source: &Node) -> &Self {
        if !self.is_active() {
            return self;
        }
        let target = self.clone();
        let trigger = stop_source.each(move |reason, _, _| target.source().stop(reason.clone()));
        self.source().emitter().once("stop", move |_, _| {
            trigger.unsubscribe();
        });
        self
    }

    /// Push a value: advance the index, settle the slot, feed the children
    ///
    /// Returns the value itself when there are no children, otherwise the
    /// children's results flattened one level. A stopped node ignores it.
    pub fn next(&self, value: impl Into<Value>) -> Value {
        let value = value.into();
        let (children, wakers) = {
            let mut graph = self.core.graph.borrow_mut();
            let Some(slot) = graph.get_mut(self.id) else {
                return Value::Null;
            };
            slot.index += 1;
            let wakers = if slot.settled.is_none() {
                slot.settled = Some(value.clone());
                std::mem::take(&mut slot.wakers)
            } else {
                Vec::new()
            };
            (slot.children.clone(), wakers)
        };
        for waker in wakers {
            waker.wake();
        }

        if children.is_empty() {
            return value;
        }

        let mut replies = Vec::new();
        for child in children {
            let wired = {
                let graph = self.core.graph.borrow();
                if !graph.is_child(self.id, child) {
                    continue;
                }
                graph
                    .get(child)
                    .map(|slot| (slot.operator.clone(), slot.index))
            };
            let Some((Some(operator), index)) = wired else {
                continue;
            };
            let Some(node) = Node::attach(&self.core, child) else {
                continue;
            };

            if let Some(reply) = isolate(&self.core.config, "next", || operator(&value, index, &node)) {
                flatten_into(&mut replies, reply);
            }
        }
        Value::Array(replies)
    }

    /// Cancel this node
    ///
    /// Detaches it from its owner, emits `"stop"` with `reason` on its own
    /// emitter, then stops each child. Returns what the `"stop"` handlers
    /// returned, children's included. Stopping twice is a no-op.
    pub fn stop(&self, reason: impl Into<Value>) -> Vec<Value> {
        self.cancel(reason.into(), false)
    }

    /// Stop without a reason, signalling `"unsubscribe"` before `"stop"`
    ///
    /// Children are stopped as with [`stop`](Self::stop).
    pub fn unsubscribe(&self) -> Vec<Value> {
        self.cancel(Value::Null, true)
    }

    fn cancel(&self, reason: Value, unsubscribing: bool) -> Vec<Value> {
        let Some(slot) = self.core.graph.borrow_mut().remove(self.id) else {
            return Vec::new();
        };

        match &slot.owner {
            Owner::Registry { kind, listener } => {
                let entry = self.core.registry.borrow_mut().remove(kind, *listener);
                drop(entry);
            }
            Owner::Node(parent) => {
                self.core.graph.borrow_mut().detach_child(*parent, self.id);
            }
            Owner::Detached => {}
        }
        tracing::debug!("{} stopped", self.id);

        let NodeSlot {
            children,
            wakers,
            pull,
            operator,
            ..
        } = slot;
        drop(pull);
        drop(operator);
        for waker in wakers {
            waker.wake();
        }

        let mut replies = Vec::new();
        if unsubscribing {
            replies.extend(self.hooks.emit("unsubscribe", Value::Null));
        }
        replies.extend(self.hooks.emit("stop", reason.clone()));
        for child in children {
            if let Some(child) = Node::attach(&self.core, child) {
                replies.extend(child.stop(reason.clone()));
            }
        }
        self.hooks.clear();
        replies
    }

    /// Await the value slot
    ///
    /// Resolves with the first value pushed since creation or the last
    /// [`rearm`](Self::rearm); every waiter sees the same value.
    pub fn value(&self) -> Settled {
        Settled::new(self.clone())
    }

    /// Clear the value slot so the next push settles it again
    pub fn rearm(&self) {
        if let Some(slot) = self.core.graph.borrow_mut().get_mut(self.id) {
            slot.settled = None;
        }
    }

    /// The settled value, if any, without waiting
    pub fn peek(&self) -> Option<Value> {
        self.core.graph.borrow().get(self.id)?.settled.clone()
    }

    fn derive(&self, operator: OperatorFn) -> Node {
        if self.is_active() {
            let child = Node::create(&self.core, Owner::Node(self.id), Some(operator));
            self.core.graph.borrow_mut().attach_child(self.id, child.id);
            child
        } else {
            tracing::debug!("{} is stopped; derived node will stay idle", self.id);
            Node::create(&self.core, Owner::Detached, Some(operator))
        }
    }
}

/// Free a node nothing can reach anymore, then any child left the same way
///
/// Unlike [`Node::stop`] this runs no hooks.
fn reclaim(core: &Rc<Core>, id: NodeId) {
    let Some(slot) = core.graph.borrow_mut().remove(id) else {
        return;
    };
    tracing::trace!("{} reclaimed", id);
    for &child in &slot.children {
        release(core, child);
    }
    drop(slot);
}

/// Drop the owner link of `id`, freeing it if no handle is left
pub(crate) fn release(core: &Rc<Core>, id: NodeId) {
    let orphaned = core.graph.borrow_mut().disown(id);
    if orphaned {
        reclaim(core, id);
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        self.core.graph.borrow_mut().retain_handle(self.id);
        Node {
            core: self.core.clone(),
            id: self.id,
            hooks: self.hooks.clone(),
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // a busy graph skips the count
        let orphaned = match self.core.graph.try_borrow_mut() {
            Ok(mut graph) => graph.release_handle(self.id),
            Err(_) => false,
        };
        if orphaned {
            reclaim(&self.core, self.id);
        }
    }
}

impl AsEmitter for Node {
    fn emitter(&self) -> &Emitter {
        &self.hooks
    }
}

impl Emitterify for Node {
    type Output = Node;

    fn emitterify(self) -> Node {
        self
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.core, &other.core)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (active, children) = match self.core.graph.try_borrow() {
            Ok(graph) => graph
                .get(self.id)
                .map_or((false, 0), |slot| (true, slot.children.len())),
            Err(_) => (true, 0),
        };
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("active", &active)
            .field("children", &children)
            .finish()
    }
}
