// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of unframed device replies.
//!
//! A reply is a tag followed by a value, separated by whitespace. Replies
//! carry no request identifier: a `VOL` reply updates the volume whether it
//! answers a query, a set, a step, or a change made at the front panel.

use crate::error::ParseError;
use crate::state::StateChange;
use crate::types::{SourceMap, Volume};

/// A recognized device reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `PWR 1|0`
    Power(bool),
    /// `VOL <0-100>`
    Volume(Volume),
    /// `MUT 1|0`
    Mute(bool),
    /// `INP <token>`
    Input(String),
}

impl Reply {
    /// Parses one unframed message.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnknownTag` for messages this library does not
    /// track, `ParseError::MissingArgument` for a bare tag, and
    /// `ParseError::InvalidValue` for a malformed value.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcintosh_lib::protocol::Reply;
    ///
    /// assert_eq!(Reply::parse("PWR 1").unwrap(), Reply::Power(true));
    /// assert_eq!(Reply::parse("inp 14").unwrap(), Reply::Input("14".to_string()));
    /// assert!(Reply::parse("VOL abc").is_err());
    /// ```
    pub fn parse(message: &str) -> Result<Self, ParseError> {
        let mut parts = message.split_whitespace();
        let tag = parts.next().ok_or(ParseError::Empty)?.to_ascii_uppercase();
        let args: Vec<&str> = parts.collect();

        let reply = match tag.as_str() {
            "PWR" => Self::Power(parse_flag("power", first_arg(&tag, &args)?)?),
            "VOL" => Self::Volume(first_arg(&tag, &args)?.parse()?),
            "MUT" => Self::Mute(parse_flag("mute", first_arg(&tag, &args)?)?),
            "INP" => {
                first_arg(&tag, &args)?;
                Self::Input(args.join(" "))
            }
            _ => return Err(ParseError::UnknownTag(tag)),
        };
        Ok(reply)
    }

    /// Converts the reply into a state change, mapping input tokens to
    /// display names where the catalog knows them.
    #[must_use]
    pub fn into_change(self, sources: &SourceMap) -> StateChange {
        match self {
            Self::Power(on) => StateChange::Power(on),
            Self::Volume(volume) => StateChange::Volume(volume),
            Self::Mute(muted) => StateChange::Mute(muted),
            Self::Input(token) => StateChange::Source(sources.display_name(&token)),
        }
    }
}

fn first_arg<'a>(tag: &str, args: &[&'a str]) -> Result<&'a str, ParseError> {
    args.first()
        .copied()
        .ok_or_else(|| ParseError::MissingArgument(tag.to_string()))
}

fn parse_flag(field: &str, value: &str) -> Result<bool, ParseError> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(ParseError::InvalidValue {
            field: field.to_string(),
            message: format!("expected 1 or 0, got {other}"),
        }),
    }
}
