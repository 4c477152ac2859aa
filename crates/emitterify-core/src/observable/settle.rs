//! Awaiting a node's value slot.

use serde_json::Value;
use std::future::{Future, IntoFuture};
use std::ops::Deref;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::node::Node;
use crate::error::{Error, Result};

/// Future for a node's first value
///
/// Resolves with the settled value, or [`Error::Cancelled`] if the node is
/// stopped before anything arrives.
#[derive(Debug)]
pub struct Settled {
    node: Node,
}

impl Settled {
    pub(crate) fn new(node: Node) -> Self {
        Self { node }
    }
}

impl Future for Settled {
    type Output = Result<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut graph = self.node.core.graph.borrow_mut();
        let Some(slot) = graph.get_mut(self.node.id) else {
            return Poll::Ready(Err(Error::Cancelled { node: self.node.id }));
        };
        if let Some(value) = &slot.settled {
            return Poll::Ready(Ok(value.clone()));
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl IntoFuture for Node {
    type Output = Result<Value>;
    type IntoFuture = Settled;

    fn into_future(self) -> Settled {
        Settled::new(self)
    }
}

/// A node that awaits to itself rather than to its value
///
/// Returned by [`Node::unpromise`], for handing a stream out of an `async`
/// block without the block waiting on its first value.
#[derive(Debug, Clone)]
pub struct Unpromised(Node);

impl Unpromised {
    pub(crate) fn new(node: Node) -> Self {
        Self(node)
    }

    pub fn into_node(self) -> Node {
        self.0
    }
}

impl Deref for Unpromised {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl From<Unpromised> for Node {
    fn from(unpromised: Unpromised) -> Node {
        unpromised.0
    }
}

impl IntoFuture for Unpromised {
    type Output = Node;
    type IntoFuture = std::future::Ready<Node>;

    fn into_future(self) -> Self::IntoFuture {
        std::future::ready(self.0)
    }
}
