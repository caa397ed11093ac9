// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `McIntosh` library.
//!
//! Failures are grouped by where they happen: value validation before a
//! command is sent, the TCP transport, parsing of device replies, and the
//! supervisor's update cycle. None of them are fatal to the link; a failed
//! connect or write is an ordinary outcome that the supervisor recovers from.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred on the TCP transport.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// The link is not connected; nothing was written.
    #[error("device is not connected")]
    NotConnected,

    /// A supervisor update cycle did not complete.
    #[error("update failed: {0}")]
    UpdateFailed(String),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: u16,
        /// Maximum allowed value.
        max: u16,
        /// The actual value that was provided.
        actual: u16,
    },

    /// The input source is neither a configured name nor a known token.
    #[error("unknown input source: {0}")]
    UnknownSource(String),
}

/// Errors related to the TCP connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Connection to the device failed (refused, unreachable, DNS).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation timed out.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Socket I/O failed, or the device closed the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid host or port.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to parsing device replies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The reply carried no tag at all.
    #[error("empty reply")]
    Empty,

    /// The reply tag is not one this library tracks.
    #[error("unknown reply tag: {0}")]
    UnknownTag(String),

    /// A recognized tag arrived without its value.
    #[error("missing argument for {0}")]
    MissingArgument(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
