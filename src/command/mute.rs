// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mute command.

use crate::command::{Command, flag};

/// Command to mute or unmute the outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteCommand {
    /// Query the current mute state.
    Get,
    /// Set the mute state (`true` is muted).
    Set(bool),
}

impl Command for MuteCommand {
    fn name(&self) -> &'static str {
        "MUT"
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Get => None,
            Self::Set(muted) => Some(flag(*muted)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mute_payloads() {
        assert_eq!(MuteCommand::Set(true).payload(), Some("1".to_string()));
        assert_eq!(MuteCommand::Set(false).payload(), Some("0".to_string()));
        assert_eq!(MuteCommand::Get.payload(), None);
    }
}
