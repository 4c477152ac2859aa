//! Per-listener fault isolation.
//!
//! Every listener and operator runs through [`isolate`]. An `Err` return or a
//! caught panic is reported through `tracing` and swallowed, so one faulty
//! listener never stops delivery to the others.

use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::config::EmitterConfig;
use crate::error::DispatchError;

/// Run one listener, returning its reply or `None` if it faulted.
pub(crate) fn isolate<F>(config: &EmitterConfig, event: &str, f: F) -> Option<Value>
where
    F: FnOnce() -> anyhow::Result<Value>,
{
    let outcome = if config.catch_panics {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(outcome) => outcome.map_err(|source| DispatchError::Rejected {
                event: event.to_string(),
                source,
            }),
            Err(payload) => Err(DispatchError::Panicked {
                event: event.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    } else {
        f().map_err(|source| DispatchError::Rejected {
            event: event.to_string(),
            source,
        })
    };

    match outcome {
        Ok(reply) => Some(reply),
        Err(fault) => {
            report(config, &fault);
            None
        }
    }
}

fn report(config: &EmitterConfig, fault: &DispatchError) {
    tracing::warn!(
        target: "emitterify",
        tag = %config.fault_tag,
        event = fault.event(),
        "{}",
        fault
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passes_reply_through() {
        let config = EmitterConfig::default();
        assert_eq!(isolate(&config, "x", || Ok(json!(1))), Some(json!(1)));
    }

    #[test]
    fn test_swallows_error() {
        let config = EmitterConfig::default();
        assert_eq!(isolate(&config, "x", || Err(anyhow::anyhow!("bad"))), None);
    }

    #[test]
    fn test_catches_panic() {
        let config = EmitterConfig::default();
        let reply = isolate(&config, "x", || -> anyhow::Result<Value> { panic!("boom") });
        assert_eq!(reply, None);
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42u8), "non-string panic payload");
    }
}
