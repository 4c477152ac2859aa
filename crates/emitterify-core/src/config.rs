//! Emitter configuration
//!
//! Every [`Emitter`](crate::Emitter) carries an [`EmitterConfig`]. Nodes
//! created from an emitter, and the lifecycle emitters inside those nodes,
//! inherit it. The configuration can be built in code or loaded from JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// The reserved event type that receives every emission.
pub const WILDCARD: &str = "*";

/// Configuration for an emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Separator between an event name and its namespace (`"change.ns"`).
    pub separator: char,
    /// Tag attached to listener fault reports.
    pub fault_tag: String,
    /// Whether a panicking listener is caught and reported like an error.
    ///
    /// On by default. Turning it off lets a panic unwind out of `emit` and
    /// `next`, abandoning the rest of that fan-out; errors returned by
    /// listeners are still isolated either way.
    pub catch_panics: bool,
    /// Whether every emission is logged at TRACE level.
    pub trace_dispatch: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            separator: '.',
            fault_tag: "emitterify".to_string(),
            catch_panics: true,
            trace_dispatch: false,
        }
    }
}

impl EmitterConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&content)?;
        tracing::debug!("Loaded emitter config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_whitespace() || WILDCARD.contains(self.separator) {
            return Err(Error::config(format!(
                "separator {:?} cannot be whitespace or the wildcard",
                self.separator
            )));
        }
        if self.fault_tag.trim().is_empty() {
            return Err(Error::config("fault tag cannot be empty"));
        }
        Ok(())
    }

    /// Split an event type into its base id and optional namespace.
    ///
    /// Splits at the first separator; an empty namespace counts as none.
    pub fn split<'a>(&self, kind: &'a str) -> (&'a str, Option<&'a str>) {
        match kind.split_once(self.separator) {
            Some((id, ns)) if !ns.is_empty() => (id, Some(ns)),
            Some((id, _)) => (id, None),
            None => (kind, None),
        }
    }
}
