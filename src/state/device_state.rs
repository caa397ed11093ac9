// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state tracking.

use serde::{Deserialize, Serialize};

use crate::types::Volume;

use super::StateChange;

/// Last known state of the preamplifier.
///
/// The defaults (off, volume 0, unmuted, no source) stand until the device
/// reports otherwise. Values are never cleared on disconnect; they go stale
/// until the next status query refreshes them.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::state::{DeviceState, StateChange};
///
/// let mut state = DeviceState::new();
/// assert!(!state.power());
/// assert_eq!(state.volume().value(), 0);
/// assert!(state.source().is_none());
///
/// state.apply(&StateChange::Source("USB".to_string()));
/// assert_eq!(state.source(), Some("USB"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    power: bool,
    volume: Volume,
    muted: bool,
    source: Option<String>,
}

impl DeviceState {
    /// Creates a new state with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the device is powered on.
    #[must_use]
    pub fn power(&self) -> bool {
        self.power
    }

    /// Returns the volume level.
    #[must_use]
    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Returns `true` if the outputs are muted.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Returns the active input, if reported.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Applies a state change and returns whether the value actually changed.
    pub fn apply(&mut self, change: &StateChange) -> bool {
        match change {
            StateChange::Power(on) => replace(&mut self.power, *on),
            StateChange::Volume(volume) => replace(&mut self.volume, *volume),
            StateChange::Mute(muted) => replace(&mut self.muted, *muted),
            StateChange::Source(source) => {
                if self.source.as_deref() == Some(source.as_str()) {
                    false
                } else {
                    self.source = Some(source.clone());
                    true
                }
            }
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_defaults() {
        let state = DeviceState::new();
        assert!(!state.power());
        assert_eq!(state.volume(), Volume::MIN);
        assert!(!state.is_muted());
        assert!(state.source().is_none());
    }

    #[test]
    fn apply_updates_only_the_named_field() {
        let mut state = DeviceState::new();
        let before = state.clone();

        assert!(state.apply(&StateChange::Volume(Volume::new(40).unwrap())));
        assert_eq!(state.volume().value(), 40);
        assert_eq!(state.power(), before.power());
        assert_eq!(state.is_muted(), before.is_muted());
        assert_eq!(state.source(), before.source());
    }

    #[test]
    fn apply_same_value_reports_unchanged() {
        let mut state = DeviceState::new();
        assert!(state.apply(&StateChange::Mute(true)));
        assert!(!state.apply(&StateChange::Mute(true)));
        assert!(state.is_muted());
    }

    #[test]
    fn apply_source_replaces_previous() {
        let mut state = DeviceState::new();
        state.apply(&StateChange::Source("USB".to_string()));
        assert!(state.apply(&StateChange::Source("MCT".to_string())));
        assert_eq!(state.source(), Some("MCT"));
    }
}
