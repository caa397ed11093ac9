// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for preamplifier control.
//!
//! - [`Volume`] - Volume level (0-100%)
//! - [`SourceMap`] - Input display name to protocol token catalog

mod source;
mod volume;

pub use source::{SourceEntry, SourceMap};
pub use volume::Volume;
