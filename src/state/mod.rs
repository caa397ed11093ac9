// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state management types.
//!
//! [`DeviceState`] holds the latest value the preamplifier reported for each
//! tracked field, and [`StateChange`] is a single parsed update to one of
//! them.
//!
//! # Examples
//!
//! ```
//! use mcintosh_lib::state::{DeviceState, StateChange};
//!
//! let mut state = DeviceState::new();
//! state.apply(&StateChange::Power(true));
//!
//! assert!(state.power());
//! ```

mod device_state;
mod state_change;

pub use device_state::DeviceState;
pub use state_change::StateChange;
