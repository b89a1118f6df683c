//! Panic capture for user code run by the engine.
//!
//! Panics raised while the engine is capturing are not printed by the default
//! hook; their location is remembered so failures can carry a trace line.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Once;
use thiserror::Error;

static PANIC_HOOK_INIT: Once = Once::new();

thread_local! {
    static CAPTURE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// A panic raised by user code, turned into a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Panicked {
    pub message: String,
    pub location: Option<String>,
}

impl Panicked {
    fn from_payload(payload: Box<dyn Any + Send>, location: Option<String>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Panicked { message, location }
    }

    /// Trace lines for a report: the panic kind and where it happened.
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![format!("panicked: {}", self.message)];
        if let Some(location) = &self.location {
            lines.push(format!("    at {location}"));
        }
        lines
    }
}

fn install_panic_hook() {
    PANIC_HOOK_INIT.call_once(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            if CAPTURE_DEPTH.with(Cell::get) > 0 {
                let location = panic_info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                tracing::debug!("captured panic: {}", panic_info);
                LAST_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                default_hook(panic_info);
            }
        }));
    });
}

/// Runs `f`, turning a panic into [`Panicked`].
pub(crate) fn catch<T>(f: impl FnOnce() -> T) -> Result<T, Panicked> {
    install_panic_hook();
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() - 1));
    outcome.map_err(|payload| {
        let location = LAST_LOCATION.with(|slot| slot.borrow_mut().take());
        Panicked::from_payload(payload, location)
    })
}
