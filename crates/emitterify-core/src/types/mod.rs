//! Type system utilities and aliases.
//!
//! ## Modules
//!
//! - [`aliases`]: Type aliases for `Rc<RefCell<T>>` and the callback shapes
//! - [`value`]: Payload helpers (truthiness, argument spreading, reply conversion)

pub mod aliases;
pub mod value;

pub use aliases::*;
pub use value::*;
