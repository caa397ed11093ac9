// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stream framing for the control protocol.
//!
//! The device writes replies to an unbounded byte stream with no length
//! prefix. Depending on the firmware revision, replies are either wrapped in
//! parentheses (`(VOL 35)`) or terminated by a line break (`VOL 35\r\n`).
//! [`FrameDecoder`] accumulates raw reads and yields complete messages in
//! arrival order, no matter how the reads split or batch them.

use serde::{Deserialize, Serialize};

/// Size at which an unterminated buffer is treated as corrupt and dropped.
pub const MAX_BUFFER_LEN: usize = 4096;

/// How messages are delimited on the wire.
///
/// The two variants belong to different protocol revisions of the same
/// device family; the right one has to be configured per device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Messages wrapped as `(MESSAGE)`; commands are sent as `(COMMAND)\r\n`.
    #[default]
    Parenthesized,
    /// Messages terminated by `\r\n`; commands are sent as `COMMAND\r\n`.
    Line,
}

impl Framing {
    /// Frames a command for transmission.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcintosh_lib::protocol::Framing;
    ///
    /// assert_eq!(Framing::Parenthesized.encode("PWR 1"), b"(PWR 1)\r\n");
    /// assert_eq!(Framing::Line.encode("PWR 1"), b"PWR 1\r\n");
    /// ```
    #[must_use]
    pub fn encode(self, command: &str) -> Vec<u8> {
        match self {
            Self::Parenthesized => format!("({command})\r\n").into_bytes(),
            Self::Line => format!("{command}\r\n").into_bytes(),
        }
    }
}

/// Incremental decoder that extracts framed messages from raw reads.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::protocol::{FrameDecoder, Framing};
///
/// let mut decoder = FrameDecoder::new(Framing::Parenthesized);
/// assert!(decoder.decode(b"(VO").is_empty());
/// assert_eq!(decoder.decode(b"L 5)(PWR 1)"), ["VOL 5", "PWR 1"]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: Vec<u8>,
    max_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder with the default overflow ceiling.
    #[must_use]
    pub fn new(framing: Framing) -> Self {
        Self::with_max_len(framing, MAX_BUFFER_LEN)
    }

    /// Creates a decoder with a custom overflow ceiling.
    #[must_use]
    pub fn with_max_len(framing: Framing, max_len: usize) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
            max_len,
        }
    }

    /// Returns the framing this decoder expects.
    #[must_use]
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Returns the number of buffered bytes not yet part of a complete message.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one read into the decoder and returns every message it completed.
    ///
    /// Non-ASCII bytes are dropped. If the leftover after extraction exceeds
    /// the ceiling, the whole buffer is discarded.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer
            .extend(bytes.iter().copied().filter(u8::is_ascii));

        let mut messages = Vec::new();
        while let Some(message) = self.next_message() {
            if !message.is_empty() {
                messages.push(message);
            }
        }

        if self.buffer.len() > self.max_len {
            tracing::warn!(
                len = self.buffer.len(),
                head = %String::from_utf8_lossy(&self.buffer[..self.buffer.len().min(100)]),
                "Receive buffer overflow, clearing"
            );
            self.buffer.clear();
        }

        messages
    }

    fn next_message(&mut self) -> Option<String> {
        match self.framing {
            Framing::Parenthesized => {
                let start = self.buffer.iter().position(|&b| b == b'(')?;
                let end = start + self.buffer[start..].iter().position(|&b| b == b')')?;
                let message = String::from_utf8_lossy(&self.buffer[start + 1..end]).into_owned();
                self.buffer.drain(..=end);
                Some(message)
            }
            Framing::Line => {
                let end = self.buffer.iter().position(|&b| b == b'\n')?;
                let line = &self.buffer[..end];
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                let message = String::from_utf8_lossy(line).trim().to_string();
                self.buffer.drain(..=end);
                Some(message)
            }
        }
    }
}
