// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for link notifications.
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that stores callbacks and dispatches notifications
//! - [`Subscribable`] - Trait for types that support subscriptions
//!
//! # Usage
//!
//! ```no_run
//! use mcintosh_lib::{DeviceLink, LinkConfig};
//! use mcintosh_lib::subscription::Subscribable;
//!
//! let link = DeviceLink::new(LinkConfig::new("192.168.1.60"));
//! let observer = link.clone();
//! let sub_id = link.on_change(move || {
//!     println!("volume is now {}", observer.volume());
//! });
//!
//! link.unsubscribe(sub_id);
//! ```

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;
