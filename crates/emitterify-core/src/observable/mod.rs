//! Observable nodes
//!
//! A [`Node`] is handed out by [`Emitter::observe`](crate::Emitter::observe)
//! and grows a tree of derived nodes through its operators:
//!
//! ```
//! use emitterify_core::{json, Emitter};
//!
//! let emitter = Emitter::new();
//! let evens = emitter
//!     .observe("tick")
//!     .filter(|v, _, _| v.as_i64().unwrap_or(1) % 2 == 0)
//!     .map(|v, _, _| v.as_i64().unwrap_or(0) * 10);
//!
//! emitter.emit("tick", 1);
//! emitter.emit("tick", 2);
//! assert_eq!(evens.peek(), Some(json!(20)));
//! ```
//!
//! Nodes can be awaited for their first value, pulled one value at a time,
//! or consumed as a [`futures::Stream`] through [`Node::stream`].

mod bridge;
mod graph;
mod node;
mod settle;

pub use bridge::{Bridge, Pull};
pub(crate) use graph::{Graph, Owner};
pub use graph::NodeId;
pub use node::Node;
pub(crate) use node::release;
pub use settle::{Settled, Unpromised};
