// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume commands.

use crate::command::Command;
use crate::types::Volume;

/// Command to query, set, or step the volume.
///
/// A step moves the volume by one percent; the device reports the
/// resulting level with its own `VOL` reply.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::command::{Command, VolumeCommand};
/// use mcintosh_lib::types::Volume;
///
/// assert_eq!(VolumeCommand::Set(Volume::MAX).to_wire_text(), "VOL 100");
/// assert_eq!(VolumeCommand::Up.to_wire_text(), "VOL U");
/// assert_eq!(VolumeCommand::Down.to_wire_text(), "VOL D");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeCommand {
    /// Query the current volume.
    Get,
    /// Set an absolute volume.
    Set(Volume),
    /// Increase volume by one step.
    Up,
    /// Decrease volume by one step.
    Down,
}

impl Command for VolumeCommand {
    fn name(&self) -> &'static str {
        "VOL"
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Get => None,
            Self::Set(volume) => Some(volume.value().to_string()),
            Self::Up => Some("U".to_string()),
            Self::Down => Some("D".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_set_payload() {
        let cmd = VolumeCommand::Set(Volume::new(7).unwrap());
        assert_eq!(cmd.payload(), Some("7".to_string()));
        assert_eq!(VolumeCommand::Set(Volume::MIN).to_wire_text(), "VOL 0");
    }
}
