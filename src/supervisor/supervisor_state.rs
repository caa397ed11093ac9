// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lifecycle state of a connection supervisor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a [`ConnectionSupervisor`](super::ConnectionSupervisor) is in its
/// lifecycle.
///
/// ```text
/// Idle ──start──▶ Polling ◀──reconnected── Reconnecting
///   │               │                          ▲
///   │               └────────link lost─────────┘
///   └──start failed────────────────────────────┘
///
/// any ──shutdown──▶ ShuttingDown
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Created, not started.
    #[default]
    Idle,
    /// Connected; periodic refreshes are running.
    Polling,
    /// A reconnect loop is trying to restore the link.
    Reconnecting,
    /// Shut down. Terminal.
    ShuttingDown,
}

impl SupervisorState {
    /// Returns true once the supervisor has been shut down.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ShuttingDown)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Reconnecting => "reconnecting",
            Self::ShuttingDown => "shutting down",
        };
        f.write_str(name)
    }
}
