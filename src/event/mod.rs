// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for supervisor activity.
//!
//! The [`EventBus`] uses tokio's broadcast channel so any number of
//! subscribers can follow state updates, connection transitions and
//! reconnect progress without registering callbacks on the link.
//!
//! # Examples
//!
//! ```
//! use mcintosh_lib::event::{EventBus, SupervisorEvent};
//!
//! let bus = EventBus::new();
//!
//! // Subscribe to events
//! let mut rx = bus.subscribe();
//!
//! // Publish an event
//! bus.publish(SupervisorEvent::connected());
//! assert!(rx.try_recv().unwrap().is_connection());
//! ```

mod event_bus;
mod supervisor_event;

pub use event_bus::EventBus;
pub use supervisor_event::SupervisorEvent;
