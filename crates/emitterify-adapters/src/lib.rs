//! Emitterify adapters
//!
//! Higher-level constructions on top of `emitterify-core`:
//! - [`Observable`]: a producer function turned into per-subscription nodes
//! - [`Store`]: a JSON document announcing its writes, with path lenses

pub mod error;
pub mod lens;
pub mod observable;

pub use error::StoreError;
pub use lens::{within, Change, ChangeKind, Store, PATH_SEPARATOR};
pub use observable::Observable;
