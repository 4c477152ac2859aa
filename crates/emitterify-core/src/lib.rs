//! # emitterify-core
//!
//! Event-emitter primitives: a namespaced listener registry with wildcard
//! delivery, observable nodes that derive streams from a subscription, and a
//! push/pull bridge that lets a pull-based consumer drive a push producer.
//!
//! Everything here is single-threaded; handles are `Rc`-based and `!Send`.

pub mod config;
pub mod error;
mod fault;
pub mod observable;
pub mod registry;
pub mod types;

pub use config::{EmitterConfig, WILDCARD};
pub use error::{DispatchError, Error, Result};
pub use observable::{Bridge, Node, NodeId, Pull, Settled, Unpromised};
pub use registry::{emitterify, AsEmitter, Emitter, Emitterify, Evented, ListenerId, Target};
pub use types::{truthy, IntoReply};

pub use serde_json::{json, Value};
