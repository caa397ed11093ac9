// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background reader task for an open connection.

use std::sync::Weak;

use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::protocol::{FrameDecoder, Framing};

use super::{BoxedReader, LinkInner};

/// Bytes requested per socket read.
const READ_CHUNK: usize = 1024;

/// Reads the stream until EOF, error, or cancellation.
///
/// Each complete message is handed to the link as soon as it is decoded.
/// Whatever ends the loop, the task's last act is to report itself finished,
/// which marks the link disconnected and fires the change notification.
pub(super) async fn run(
    link: Weak<LinkInner>,
    mut reader: BoxedReader,
    framing: Framing,
    cancel: CancellationToken,
    generation: u64,
    address: String,
) {
    let mut decoder = FrameDecoder::new(framing);
    let mut buf = [0u8; READ_CHUNK];

    tracing::debug!(%address, generation, "Reader started");

    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(%address, "Reader cancelled");
                break;
            }
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                tracing::warn!(%address, "Connection closed by device");
                break;
            }
            Ok(n) => {
                let Some(inner) = link.upgrade() else {
                    break;
                };
                for message in decoder.decode(&buf[..n]) {
                    inner.handle_message(&message);
                }
            }
            Err(e) => {
                tracing::error!(%address, error = %e, "Error reading from device");
                break;
            }
        }
    }

    if let Some(inner) = link.upgrade() {
        inner.reader_finished(generation);
    }
}
