// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power control command.

use crate::command::{Command, flag};

/// Command to switch the preamplifier between standby and operate.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::command::{Command, PowerCommand};
///
/// assert_eq!(PowerCommand::on().payload(), Some("1".to_string()));
/// assert_eq!(PowerCommand::off().to_wire_text(), "PWR 0");
/// assert_eq!(PowerCommand::Get.payload(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// Query the current power state.
    Get,
    /// Set the power state (`true` is on).
    Set(bool),
}

impl PowerCommand {
    /// Creates a command to power the device on.
    #[must_use]
    pub const fn on() -> Self {
        Self::Set(true)
    }

    /// Creates a command to put the device in standby.
    #[must_use]
    pub const fn off() -> Self {
        Self::Set(false)
    }
}

impl Command for PowerCommand {
    fn name(&self) -> &'static str {
        "PWR"
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Get => None,
            Self::Set(on) => Some(flag(*on)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_off() {
        assert_eq!(PowerCommand::on(), PowerCommand::Set(true));
        assert_eq!(PowerCommand::on().to_wire_text(), "PWR 1");
        assert_eq!(PowerCommand::off().to_wire_text(), "PWR 0");
    }
}
