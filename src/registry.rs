//! Subscriber registry and fan-out.
//!
//! Maps event type names to ordered lists of callbacks. Insertion order is
//! invocation order, and every subscription is a separate entry, so
//! registering the same closure twice invokes it twice.
//!
//! # Dispatch
//!
//! [`EventRegistry::emit`] snapshots the callbacks for a type, releases the
//! lock, then invokes them in order. Callbacks may therefore call
//! [`EventRegistry::on`] or [`EventRegistry::off`] themselves; changes apply
//! from the next emission. A panicking callback is caught and logged and
//! does not stop delivery to the callbacks after it.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{error, trace, warn};

use crate::identifiers::SubscriptionId;
use crate::protocol::ChannelEvent;

// ============================================================================
// Types
// ============================================================================

/// Untyped subscriber callback, invoked with the envelope's `data`.
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// One registered subscription.
struct Entry {
    id: SubscriptionId,
    callback: Callback,
}

// ============================================================================
// EventRegistry
// ============================================================================

/// Event type → ordered subscriber list.
#[derive(Default)]
pub struct EventRegistry {
    listeners: Mutex<FxHashMap<String, Vec<Entry>>>,
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let mut map = f.debug_map();
        for (event_type, entries) in listeners.iter() {
            map.entry(event_type, &entries.len());
        }
        map.finish()
    }
}

impl EventRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback for `event_type`.
    pub fn on<F>(&self, event_type: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        let event_type = event_type.into();

        trace!(%id, event_type = %event_type, "Subscriber added");

        self.listeners
            .lock()
            .entry(event_type)
            .or_default()
            .push(Entry {
                id,
                callback: Arc::new(callback),
            });

        id
    }

    /// Appends a typed callback for `E::NAME`.
    ///
    /// Payloads that do not decode as `E` are logged and skipped for this
    /// subscriber only.
    pub fn subscribe<E, F>(&self, callback: F) -> SubscriptionId
    where
        E: ChannelEvent,
        F: Fn(E) + Send + Sync + 'static,
    {
        self.on(E::NAME, move |data: &Value| match E::decode(data) {
            Ok(event) => callback(event),
            Err(e) => warn!(
                event_type = E::NAME,
                error = %e,
                "Payload does not match event schema"
            ),
        })
    }

    /// Removes subscriptions for `event_type`.
    ///
    /// With `Some(id)` only that subscription is removed; with `None` every
    /// subscription for the type is. Returns how many were removed.
    pub fn off(&self, event_type: &str, subscription: Option<SubscriptionId>) -> usize {
        let mut listeners = self.listeners.lock();

        let Some(id) = subscription else {
            return listeners.remove(event_type).map_or(0, |entries| entries.len());
        };

        let Some(entries) = listeners.get_mut(event_type) else {
            return 0;
        };

        let Some(index) = entries.iter().position(|entry| entry.id == id) else {
            return 0;
        };

        entries.remove(index);
        if entries.is_empty() {
            listeners.remove(event_type);
        }

        1
    }

    /// Invokes every callback for `event_type` with `data`, in order.
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn emit(&self, event_type: &str, data: &Value) -> usize {
        let callbacks: Vec<Callback> = match self.listeners.lock().get(event_type) {
            Some(entries) => entries.iter().map(|entry| Arc::clone(&entry.callback)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(data))) {
                Ok(()) => delivered += 1,
                Err(panic) => error!(
                    event_type,
                    panic = panic_message(panic.as_ref()),
                    "Error in event callback"
                ),
            }
        }

        delivered
    }

    /// Serializes `event` and emits it under `E::NAME`.
    pub fn emit_event<E: ChannelEvent>(&self, event: &E) -> usize {
        match serde_json::to_value(event) {
            Ok(data) => self.emit(E::NAME, &data),
            Err(e) => {
                warn!(event_type = E::NAME, error = %e, "Failed to serialize local event");
                0
            }
        }
    }

    /// Returns the number of subscriptions for `event_type`.
    #[must_use]
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.lock().get(event_type).map_or(0, Vec::len)
    }

    /// Returns `true` if no event type has subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================
