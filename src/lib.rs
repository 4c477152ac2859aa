//! # Emitterify
//!
//! Make any value event-capable:
//! - Namespaced listener registry with `on`/`once`/`off`/`emit` and a `"*"` wildcard
//! - Observable nodes derived from a subscription (`map`, `filter`, `reduce`, `each`)
//! - Push/pull bridge consuming a node as a `futures::Stream`
//!
//! ## Architecture
//!
//! Emitterify is organized as a workspace with multiple crates:
//!
//! 1. **emitterify-core** - Listener registry, node arena, futures and streams
//! 2. **emitterify-adapters** - `Observable` constructor, JSON `Store` with lenses
//! 3. **emitterify** - This facade: re-exports plus logging setup

pub use emitterify_core::{config, error, observable, registry, types};

pub use emitterify_core::{
    emitterify, json, truthy, AsEmitter, Bridge, DispatchError, Emitter, EmitterConfig,
    Emitterify, Error, Evented, IntoReply, ListenerId, Node, NodeId, Pull, Result, Settled,
    Target, Unpromised, Value, WILDCARD,
};

pub use emitterify_adapters::{Change, ChangeKind, Observable, Store, StoreError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
///
/// Listener faults are reported under the `emitterify` target at WARN.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
