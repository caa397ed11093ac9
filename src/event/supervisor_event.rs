// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supervisor event types.

use serde::{Deserialize, Serialize};

use crate::state::DeviceState;

/// Events emitted by the connection supervisor.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::event::SupervisorEvent;
///
/// let lost = SupervisorEvent::disconnected();
/// assert!(lost.is_connection());
///
/// let failed = SupervisorEvent::update_failed("device is not connected");
/// assert!(!failed.is_connection());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SupervisorEvent {
    /// The link reported a new snapshot while connected.
    StateUpdated {
        /// The complete state after the change.
        state: DeviceState,
    },

    /// The link connected or lost its connection.
    ConnectionChanged {
        /// Whether the link is now connected.
        connected: bool,
    },

    /// A reconnect loop was started.
    ReconnectStarted,

    /// The reconnect loop re-established the connection.
    Reconnected {
        /// Number of connect attempts the loop made, including the last one.
        attempts: u32,
    },

    /// A poll cycle did not complete.
    UpdateFailed {
        /// Human-readable failure description.
        reason: String,
    },
}

impl SupervisorEvent {
    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Returns `true` if this event concerns reconnection progress.
    #[must_use]
    pub fn is_reconnect(&self) -> bool {
        matches!(self, Self::ReconnectStarted | Self::Reconnected { .. })
    }

    /// Returns the state carried by a [`StateUpdated`](Self::StateUpdated) event.
    #[must_use]
    pub fn state(&self) -> Option<&DeviceState> {
        match self {
            Self::StateUpdated { state } => Some(state),
            _ => None,
        }
    }

    /// Creates a connected event.
    #[must_use]
    pub fn connected() -> Self {
        Self::ConnectionChanged { connected: true }
    }

    /// Creates a disconnected event.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::ConnectionChanged { connected: false }
    }

    /// Creates a state updated event.
    #[must_use]
    pub fn state_updated(state: DeviceState) -> Self {
        Self::StateUpdated { state }
    }

    /// Creates an update failed event.
    #[must_use]
    pub fn update_failed(reason: impl Into<String>) -> Self {
        Self::UpdateFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateChange;
    use crate::types::Volume;

    #[test]
    fn connection_events() {
        assert!(SupervisorEvent::connected().is_connection());
        assert!(SupervisorEvent::disconnected().is_connection());
        assert!(!SupervisorEvent::ReconnectStarted.is_connection());
    }

    #[test]
    fn reconnect_events() {
        assert!(SupervisorEvent::ReconnectStarted.is_reconnect());
        assert!(SupervisorEvent::Reconnected { attempts: 3 }.is_reconnect());
        assert!(!SupervisorEvent::update_failed("x").is_reconnect());
    }

    #[test]
    fn state_updated_carries_snapshot() {
        let mut state = DeviceState::new();
        state.apply(&StateChange::Volume(Volume::clamped(40)));

        let event = SupervisorEvent::state_updated(state.clone());
        assert_eq!(event.state(), Some(&state));
        assert_eq!(SupervisorEvent::connected().state(), None);
    }

    #[test]
    fn serializes_with_event_tag() {
        let json = serde_json::to_value(SupervisorEvent::Reconnected { attempts: 2 }).unwrap();
        assert_eq!(json["event"], "reconnected");
        assert_eq!(json["attempts"], 2);
    }
}
