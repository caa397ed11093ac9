// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that emit link notifications.

use crate::state::StateChange;
use crate::subscription::SubscriptionId;

/// Trait for types that support notification subscriptions.
///
/// Callbacks run synchronously on whatever task produced the notification,
/// usually the connection's reader task. They must not block; a receiver that
/// needs to do real work should hand off to its own task.
pub trait Subscribable {
    /// Subscribes to the change signal.
    ///
    /// Fired once for every parsed reply and once when the connection drops.
    /// It carries no payload: read the current snapshot when it fires.
    fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static;

    /// Subscribes to typed state changes.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static;

    /// Subscribes to connection loss.
    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
