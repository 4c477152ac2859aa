//! Pull-based consumption of a push-based node.
//!
//! A [`Pull`] asks for exactly one value. While it is pending the node is
//! "waiting"; the next value pushed into the node resolves it. Nothing is
//! buffered: values pushed while no pull is outstanding are gone.

use futures::ready;
use futures::Stream;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use super::graph::{NodeId, PendingPull};
use super::node::Node;

impl Node {
    /// Request the next value pushed into this node
    ///
    /// Emits `"pull"` on this node's emitter, and on its source's emitter
    /// when that is a different node, so producers can push on demand.
    /// Issuing a new pull while one is pending supersedes the old one,
    /// which then resolves with `None`.
    pub fn pull(&self) -> Pull {
        let (tx, rx) = oneshot::channel();
        if !self.is_active() {
            return Pull::new(self.clone(), None, rx);
        }

        let listener = self.each(|value, _, listener| {
            if let Some(owner) = listener.parent() {
                owner.settle_pull(listener.id, value.clone());
            }
        });

        let superseded = self
            .core
            .graph
            .borrow_mut()
            .get_mut(self.id)
            .and_then(|slot| slot.pull.replace(PendingPull { listener: listener.id, tx }));
        if let Some(superseded) = superseded {
            tracing::debug!("{} pull superseded", self.id);
            self.drop_pull(superseded);
        }

        self.hooks.emit("pull", Value::Null);
        let source = self.source();
        if source != *self {
            source.hooks.emit("pull", Value::Null);
        }

        Pull::new(self.clone(), Some(listener.id), rx)
    }

    /// Consume this node as a [`Stream`], one pull at a time
    ///
    /// The stream ends when the node is stopped.
    pub fn stream(&self) -> Bridge {
        Bridge {
            node: self.clone(),
            pending: None,
            ended: false,
        }
    }

    /// Whether a pull is pending
    pub fn is_waiting(&self) -> bool {
        self.core
            .graph
            .borrow()
            .get(self.id)
            .is_some_and(|slot| slot.pull.is_some())
    }

    fn settle_pull(&self, listener: NodeId, value: Value) {
        let Some(pending) = self.take_pull(listener) else {
            return;
        };
        if let Some(listener) = Node::attach(&self.core, pending.listener) {
            listener.unsubscribe();
        }
        // the receiver may already be gone
        let _ = pending.tx.send(value);
    }

    fn withdraw_pull(&self, listener: NodeId) {
        if let Some(pending) = self.take_pull(listener) {
            self.drop_pull(pending);
        }
    }

    fn take_pull(&self, listener: NodeId) -> Option<PendingPull> {
        let mut graph = self.core.graph.borrow_mut();
        let slot = graph.get_mut(self.id)?;
        if slot.pull.as_ref().is_some_and(|p| p.listener == listener) {
            slot.pull.take()
        } else {
            None
        }
    }

    fn drop_pull(&self, pending: PendingPull) {
        let PendingPull { listener, tx } = pending;
        drop(tx);
        if let Some(listener) = Node::attach(&self.core, listener) {
            listener.unsubscribe();
        }
    }
}

/// Future for one pulled value
///
/// Resolves with `Some(value)`, or `None` if the node was stopped or the
/// pull was superseded. Dropping it before it resolves withdraws the pull.
pub struct Pull {
    node: Node,
    listener: Option<NodeId>,
    rx: oneshot::Receiver<Value>,
    done: bool,
}

impl Pull {
    fn new(node: Node, listener: Option<NodeId>, rx: oneshot::Receiver<Value>) -> Self {
        Self {
            node,
            listener,
            rx,
            done: false,
        }
    }
}

impl Future for Pull {
    type Output = Option<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = ready!(Pin::new(&mut self.rx).poll(cx));
        self.done = true;
        Poll::Ready(outcome.ok())
    }
}

impl Drop for Pull {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(listener) = self.listener {
            self.node.withdraw_pull(listener);
        }
    }
}

impl std::fmt::Debug for Pull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pull")
            .field("node", &self.node.id)
            .field("done", &self.done)
            .finish()
    }
}

/// A node seen as a [`Stream`] of values
#[derive(Debug)]
pub struct Bridge {
    node: Node,
    pending: Option<Pull>,
    ended: bool,
}

impl Bridge {
    /// The node being consumed
    pub fn node(&self) -> &Node {
        &self.node
    }
}

impl Stream for Bridge {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        let this = &mut *self;
        if this.ended {
            return Poll::Ready(None);
        }
        if this.pending.is_none() {
            this.pending = Some(this.node.pull());
        }

        let item = match this.pending.as_mut() {
            Some(pull) => ready!(Pin::new(pull).poll(cx)),
            None => None,
        };
        this.pending = None;
        if item.is_none() {
            this.ended = true;
        }
        Poll::Ready(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    #[test]
    fn test_pull_resolves_with_next_value() {
        let node = Node::detached();
        let pull = node.pull();
        assert!(node.is_waiting());

        node.next(1);
        assert!(!node.is_waiting());
        assert_eq!(pull.now_or_never(), Some(Some(json!(1))));
    }

    #[test]
    fn test_pull_listener_leaves_no_child() {
        let node = Node::detached();
        let pull = node.pull();
        assert_eq!(node.child_count(), 1);

        node.next(1);
        assert_eq!(node.child_count(), 0);
        drop(pull);
    }

    #[test]
    fn test_dropped_pull_is_withdrawn() {
        let node = Node::detached();
        drop(node.pull());

        assert!(!node.is_waiting());
        assert_eq!(node.child_count(), 0);
    }

    #[test]
    fn test_pull_on_stopped_node_ends() {
        let node = Node::detached();
        node.unsubscribe();

        assert_eq!(node.pull().now_or_never(), Some(None));
    }
}
