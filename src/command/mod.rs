// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preamplifier command definitions.
//!
//! Typed representations of the four commands the control protocol offers.
//! Every command is a tag optionally followed by a value; a bare tag asks the
//! device to report the current value.
//!
//! | Command Type | Tag | Purpose | Example |
//! |-------------|-----|---------|---------|
//! | [`PowerCommand`] | `PWR` | Standby / operate | `PWR 1` |
//! | [`VolumeCommand`] | `VOL` | Absolute or stepped volume | `VOL 35`, `VOL U` |
//! | [`MuteCommand`] | `MUT` | Output mute | `MUT 0` |
//! | [`InputCommand`] | `INP` | Input selection | `INP 14` |
//!
//! # Examples
//!
//! ```
//! use mcintosh_lib::command::{Command, PowerCommand, VolumeCommand};
//! use mcintosh_lib::types::Volume;
//!
//! assert_eq!(PowerCommand::on().to_wire_text(), "PWR 1");
//! assert_eq!(VolumeCommand::Set(Volume::new(35).unwrap()).to_wire_text(), "VOL 35");
//! assert_eq!(VolumeCommand::Get.to_wire_text(), "VOL");
//! ```

mod input;
mod mute;
mod power;
mod volume;

pub use input::InputCommand;
pub use mute::MuteCommand;
pub use power::PowerCommand;
pub use volume::VolumeCommand;

/// A command that can be sent to the preamplifier.
pub trait Command {
    /// Returns the protocol tag, e.g. `"PWR"`.
    fn name(&self) -> &'static str;

    /// Returns the command value, if any.
    ///
    /// Queries have no value.
    fn payload(&self) -> Option<String>;

    /// Returns the unframed command text, e.g. `VOL 35` or `MUT`.
    fn to_wire_text(&self) -> String {
        match self.payload() {
            Some(p) => format!("{} {}", self.name(), p),
            None => self.name().to_string(),
        }
    }
}

/// Encodes a boolean the way the device expects it.
pub(crate) fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
