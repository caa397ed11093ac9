// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input selection command.

use crate::command::Command;

/// Command to query or select the active input.
///
/// The payload is a protocol token; translating display names is the job of
/// [`SourceMap`](crate::types::SourceMap).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Query the active input.
    Get,
    /// Select the input with the given protocol token.
    Select(String),
}

impl InputCommand {
    /// Creates a command to select an input by token.
    #[must_use]
    pub fn select(token: impl Into<String>) -> Self {
        Self::Select(token.into())
    }
}

impl Command for InputCommand {
    fn name(&self) -> &'static str {
        "INP"
    }

    fn payload(&self) -> Option<String> {
        match self {
            Self::Get => None,
            Self::Select(token) => Some(token.clone()),
        }
    }
}
