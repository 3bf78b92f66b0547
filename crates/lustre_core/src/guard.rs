//! Fault containment for user callbacks and widget probes
//!
//! Matching and resolution are total: a misbehaving widget adapter, condition
//! or custom matcher must never unwind out of the engine. Every call into
//! host-provided code during matching goes through one of these helpers.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::widget::WidgetResult;

/// Run `f`, converting a panic into `None`
pub fn contain<T>(what: &str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            warn!(
                callback = what,
                reason = %panic_message(payload.as_ref()),
                "callback panicked, treating as non-match"
            );
            None
        }
    }
}

/// Run a fallible widget probe; errors and panics become `None`
pub fn try_probe<T>(what: &str, f: impl FnOnce() -> WidgetResult<T>) -> Option<T> {
    match contain(what, f)? {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(probe = what, error = %err, "widget probe failed");
            None
        }
    }
}

/// Run a boolean widget probe; any fault reads as `false`
pub fn probe(what: &str, f: impl FnOnce() -> WidgetResult<bool>) -> bool {
    try_probe(what, f).unwrap_or(false)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
