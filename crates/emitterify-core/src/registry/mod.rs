//! # Listener Registry
//!
//! Per event type, an ordered list of listeners plus a namespace index that
//! holds at most one listener per namespace. The reserved type `"*"`
//! receives every emission as a `[type, payload]` pair.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use emitterify_core::{Emitter, Target};
//!
//! let emitter = Emitter::new();
//! let id = emitter.on("change", |_, args| println!("changed: {:?}", args));
//! emitter.on("change.audit", |_, _| "audited");
//!
//! emitter.emit("change", 1);
//! emitter.off("change", id);
//! emitter.off("change", Target::All);
//! ```

mod emitter;
mod listener;

pub use emitter::{emitterify, AsEmitter, Emitter, Emitterify, Evented};
pub(crate) use emitter::Core;
pub use listener::{ListenerId, Target};
