//! Producer-driven observables.
//!
//! An [`Observable`] wraps a producer function. Each call to
//! [`subscribe`](Observable::subscribe) runs the producer against a fresh
//! node; whatever teardown the producer hands back runs once when that node
//! is stopped.

use emitterify_core::types::{shared_none, SharedOption, Teardown};
use emitterify_core::{AsEmitter, Emitter, EmitterConfig, Node};
use std::rc::Rc;

type Producer = Rc<dyn Fn(&Node) -> Option<Teardown>>;

/// A cold stream defined by its producer
#[derive(Clone)]
pub struct Observable {
    producer: Producer,
    config: EmitterConfig,
}

impl Observable {
    /// Create an observable from `producer`
    ///
    /// The producer receives the subscription node and pushes values into it
    /// with `next`. It may return a teardown to release what it set up.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn(&Node) -> Option<Teardown> + 'static,
    {
        Self::with_config(producer, EmitterConfig::default())
    }

    /// Create an observable whose subscriptions use `config`
    pub fn with_config<F>(producer: F, config: EmitterConfig) -> Self
    where
        F: Fn(&Node) -> Option<Teardown> + 'static,
    {
        Self {
            producer: Rc::new(producer),
            config,
        }
    }

    /// Start a new subscription and return its node
    pub fn subscribe(&self) -> Node {
        let emitter = Emitter::with_config(self.config.clone());
        let node = emitter.observe("value");

        let teardown: SharedOption<Teardown> = shared_none();
        let pending = teardown.clone();
        node.emitter().once("stop", move |_, _| {
            let teardown = pending.borrow_mut().take();
            if let Some(teardown) = teardown {
                teardown();
            }
        });

        let cleanup = (self.producer)(&node);
        if node.is_active() {
            *teardown.borrow_mut() = cleanup;
        } else if let Some(cleanup) = cleanup {
            // stopped from inside the producer
            cleanup();
        }
        tracing::debug!("{} subscribed", node.id());
        node
    }
}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
