// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input source catalog.
//!
//! The device selects and reports inputs by protocol token (`INP 4`), while
//! users pick them by name (`UNBAL 1`). The mapping between the two differs
//! between firmware revisions, so it is data rather than code: the C2800
//! catalog is provided as a default and any other catalog can be loaded from
//! configuration.

use serde::{Deserialize, Serialize};

/// One entry of an input source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Human readable name shown to users.
    pub name: String,
    /// Token sent to and reported by the device.
    pub token: String,
}

impl SourceEntry {
    /// Creates a new catalog entry.
    #[must_use]
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }
}

/// Bidirectional mapping between input display names and protocol tokens.
///
/// Entries keep their configured order, which is the order
/// [`names`](Self::names) reports them in.
///
/// # Examples
///
/// ```
/// use mcintosh_lib::types::SourceMap;
///
/// let sources = SourceMap::c2800();
/// assert_eq!(sources.token_for("USB"), Some("14"));
/// assert_eq!(sources.name_for("16"), Some("HDMI (ARC)"));
///
/// // Unknown tokens are reported as-is
/// assert_eq!(sources.display_name("99"), "99");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceMap {
    entries: Vec<SourceEntry>,
}

impl SourceMap {
    /// Creates a catalog from explicit entries.
    #[must_use]
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        Self { entries }
    }

    /// Creates a catalog from `(name, token)` pairs.
    #[must_use]
    pub fn from_pairs<I, N, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, token)| SourceEntry::new(name, token))
                .collect(),
        }
    }

    /// The C2800 input catalog: sixteen inputs numbered 1-16.
    #[must_use]
    pub fn c2800() -> Self {
        Self::from_pairs([
            ("BAL 1", "1"),
            ("BAL 2", "2"),
            ("BAL 3", "3"),
            ("UNBAL 1", "4"),
            ("UNBAL 2", "5"),
            ("UNBAL 3", "6"),
            ("UNBAL 4", "7"),
            ("PHONO 1", "8"),
            ("PHONO 2", "9"),
            ("COAX 1", "10"),
            ("COAX 2", "11"),
            ("OPT 1", "12"),
            ("OPT 2", "13"),
            ("USB", "14"),
            ("MCT", "15"),
            ("HDMI (ARC)", "16"),
        ])
    }

    /// Returns the protocol token for a display name.
    #[must_use]
    pub fn token_for(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.token.as_str())
    }

    /// Returns the display name for a protocol token.
    #[must_use]
    pub fn name_for(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.token == token)
            .map(|e| e.name.as_str())
    }

    /// Resolves user input to a token: a display name first, then an exact token.
    #[must_use]
    pub fn resolve(&self, input: &str) -> Option<&str> {
        self.token_for(input).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.token == input)
                .map(|e| e.token.as_str())
        })
    }

    /// Returns the display name for a token, or the token itself if unmapped.
    #[must_use]
    pub fn display_name(&self, token: &str) -> String {
        self.name_for(token).unwrap_or(token).to_string()
    }

    /// Returns the display names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Returns the catalog entries.
    #[must_use]
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::c2800()
    }
}
