//! Type aliases for commonly used complex types.
//!
//! The emitter is single-threaded: listener lists, the node arena and the
//! per-node value slots are shared through `Rc<RefCell<T>>`. These aliases
//! give those shapes, and the callback shapes stored in them, meaningful names.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use emitterify_core::types::*;
//!
//! // Instead of: Rc<RefCell<Vec<Value>>>
//! let seen: SharedVec<Value> = shared(Vec::new());
//! ```

use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

use crate::observable::Node;
use crate::registry::Emitter;

// =============================================================================
// SINGLE-THREADED SHARED TYPES (Rc<RefCell<T>>)
// =============================================================================

/// A reference-counted, interior-mutable wrapper for single-threaded sharing.
///
/// # Example
/// ```rust,ignore
/// let count: Shared<u32> = shared(0);
/// *count.borrow_mut() += 1;
/// ```
pub type Shared<T> = Rc<RefCell<T>>;

/// An optional shared reference, for lazily-initialized shared state.
pub type SharedOption<T> = Rc<RefCell<Option<T>>>;

/// A shared vector for single-threaded collection management.
pub type SharedVec<T> = Rc<RefCell<Vec<T>>>;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// A registered listener callback.
///
/// Receives the emitter it was registered on and the (spread) payload
/// arguments. Stored behind `Rc` so dispatch can clone it out of the
/// listener list before invoking it.
pub type ListenerFn = Rc<dyn Fn(&Emitter, &[Value]) -> anyhow::Result<Value>>;

/// The receiver wired into a node by an operator.
///
/// Called with the upstream value, the receiving node's index and the
/// receiving node itself.
pub type OperatorFn = Rc<dyn Fn(&Value, u64, &Node) -> anyhow::Result<Value>>;

/// A cleanup action run once when a subscription is torn down.
pub type Teardown = Box<dyn FnOnce()>;

// =============================================================================
// CONSTRUCTOR HELPERS
// =============================================================================

/// Create a new `Shared<T>` from a value.
#[inline]
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

/// Create a new `SharedOption<T>` initialized to `None`.
#[inline]
pub fn shared_none<T>() -> SharedOption<T> {
    Rc::new(RefCell::new(None))
}

/// Create a new `SharedOption<T>` initialized to `Some(value)`.
#[inline]
pub fn shared_some<T>(value: T) -> SharedOption<T> {
    Rc::new(RefCell::new(Some(value)))
}
