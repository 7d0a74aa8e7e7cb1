//! Named event delivery
//!
//! Event sources (OS signals, UI notifications, timers) emit by name; each
//! connected [`Callback`] receives the same argument list, in connection
//! order.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use refract_core::{Callback, ReflectResult, Value};

/// Event name → connected callbacks
#[derive(Debug, Default)]
pub struct EventDispatcher {
    handlers: RwLock<FxHashMap<String, Vec<Callback>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no connections
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `callback` to `event`.
    ///
    /// Returns `false` (and connects nothing) for an invalid callback.
    pub fn connect(&self, event: &str, callback: Callback) -> bool {
        if !callback.is_valid() {
            tracing::warn!(event, "Refusing to connect invalid callback");
            return false;
        }
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(callback);
        tracing::debug!(event, "Connected handler");
        true
    }

    /// Disconnect every connection of `callback` from `event`.
    ///
    /// Returns the number of connections removed.
    pub fn disconnect(&self, event: &str, callback: &Callback) -> usize {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|c| c != callback);
        let removed = before - list.len();
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Disconnect everything from `event`
    pub fn disconnect_all(&self, event: &str) -> usize {
        self.handlers
            .write()
            .remove(event)
            .map_or(0, |list| list.len())
    }

    /// Deliver `args` to every handler of `event`.
    ///
    /// Handlers run outside the lock, so they may connect or emit. One
    /// result per handler, in connection order; a failing handler does not
    /// stop the rest.
    pub fn emit(&self, event: &str, args: &[Value]) -> Vec<ReflectResult<Value>> {
        let handlers = match self.handlers.read().get(event) {
            Some(list) => list.clone(),
            None => return Vec::new(),
        };
        handlers
            .iter()
            .map(|handler| {
                let result = handler.invoke(args);
                if let Err(e) = &result {
                    tracing::warn!(event, error = %e, "Event handler failed");
                }
                result
            })
            .collect()
    }

    /// Number of handlers connected to `event`
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    /// Events with at least one handler, sorted
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> = self.handlers.read().keys().cloned().collect();
        events.sort_unstable();
        events
    }
}
