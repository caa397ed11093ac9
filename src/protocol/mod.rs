// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol for the preamplifier's TCP control port.
//!
//! - [`Framing`] and [`FrameDecoder`]: delimiting messages in the byte stream
//! - [`Reply`]: parsing a single unframed message into a typed value

mod framing;
mod reply;

pub use framing::{FrameDecoder, Framing, MAX_BUFFER_LEN};
pub use reply::Reply;
