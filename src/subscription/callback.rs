// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for link notifications.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateChange;

/// Unique identifier for a subscription.
///
/// IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Plain change signal; the receiver re-reads the snapshot it cares about.
type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Typed callback receiving the change that was just applied.
type StateChangedCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Callback fired when the connection drops.
type DisconnectedCallback = Arc<dyn Fn() + Send + Sync>;

/// Registry for link notification callbacks.
///
/// Callbacks are copied out of the registry before they run, so a callback
/// may subscribe or unsubscribe without deadlocking, and dispatch may happen
/// from any task.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Change signal callbacks (every mutation and every disconnect).
    change_callbacks: RwLock<HashMap<SubscriptionId, ChangeCallback>>,
    /// Typed state change callbacks.
    state_changed_callbacks: RwLock<HashMap<SubscriptionId, StateChangedCallback>>,
    /// Disconnect callbacks.
    disconnected_callbacks: RwLock<HashMap<SubscriptionId, DisconnectedCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            change_callbacks: RwLock::new(HashMap::new()),
            state_changed_callbacks: RwLock::new(HashMap::new()),
            disconnected_callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a change signal callback.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.change_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback receiving each applied state change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for connection loss.
    pub fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.disconnected_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.change_callbacks.write().remove(&id).is_some()
            || self.state_changed_callbacks.write().remove(&id).is_some()
            || self.disconnected_callbacks.write().remove(&id).is_some()
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches an applied state change, then the change signal.
    pub fn dispatch(&self, change: &StateChange) {
        let typed: Vec<_> = self.state_changed_callbacks.read().values().cloned().collect();
        for callback in typed {
            callback(change);
        }
        self.notify();
    }

    /// Dispatches a connection loss, then the change signal.
    pub fn dispatch_disconnected(&self) {
        let callbacks: Vec<_> = self.disconnected_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback();
        }
        self.notify();
    }

    /// Fires the change signal alone.
    pub fn notify(&self) {
        let callbacks: Vec<_> = self.change_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.change_callbacks.read().len()
            + self.state_changed_callbacks.read().len()
            + self.disconnected_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    use crate::types::Volume;

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId::new(42).to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn dispatch_fires_typed_and_signal_once() {
        let registry = CallbackRegistry::new();
        let signals = Arc::new(AtomicU32::new(0));
        let received = Arc::new(RwLock::new(Vec::new()));

        let s = Arc::clone(&signals);
        registry.on_change(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let r = Arc::clone(&received);
        registry.on_state_changed(move |change| r.write().push(change.clone()));

        registry.dispatch(&StateChange::Volume(Volume::new(5).unwrap()));

        assert_eq!(signals.load(Ordering::SeqCst), 1);
        assert_eq!(
            *received.read(),
            vec![StateChange::Volume(Volume::new(5).unwrap())]
        );
    }

    #[test]
    fn disconnect_fires_signal() {
        let registry = CallbackRegistry::new();
        let signals = Arc::new(AtomicU32::new(0));
        let drops = Arc::new(AtomicU32::new(0));

        let s = Arc::clone(&signals);
        registry.on_change(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let d = Arc::clone(&drops);
        registry.on_disconnected(move || {
            d.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch_disconnected();
        assert_eq!(signals.load(Ordering::SeqCst), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let id = registry.on_change(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify();
        assert!(registry.unsubscribe(id));
        registry.notify();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!registry.unsubscribe(id));
    }

    #[test]
    fn callback_may_subscribe_during_dispatch() {
        let registry = Arc::new(CallbackRegistry::new());
        let inner = Arc::clone(&registry);
        registry.on_change(move || {
            inner.on_change(|| {});
        });

        registry.notify();
        assert_eq!(registry.callback_count(), 2);
    }
}
