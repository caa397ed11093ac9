// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State change representation.
//!
//! Each reply the device sends updates exactly one field, so a change is
//! always a single variant. There is no batching: replies arrive and are
//! applied one at a time, in stream order.

use serde::{Deserialize, Serialize};

use crate::types::Volume;

/// A single update to the tracked device state.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::state::StateChange;
/// use mcintosh_lib::types::Volume;
///
/// let change = StateChange::Volume(Volume::new(20).unwrap());
/// assert_eq!(change.field(), "volume");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum StateChange {
    /// Power state reported (`true` is on).
    Power(bool),

    /// Volume level reported.
    Volume(Volume),

    /// Mute state reported (`true` is muted).
    Mute(bool),

    /// Active input reported, as a display name when the token is mapped.
    Source(String),
}

impl StateChange {
    /// Returns the name of the field this change updates.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::Power(_) => "power",
            Self::Volume(_) => "volume",
            Self::Mute(_) => "muted",
            Self::Source(_) => "source",
        }
    }
}
