// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume type for level control.
//!
//! The preamplifier reports and accepts volume as an integer percentage,
//! so values are validated to 0-100 at construction time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ValueError};

/// Volume level as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use mcintosh_lib::types::Volume;
///
/// let vol = Volume::new(35).unwrap();
/// assert_eq!(vol.value(), 35);
///
/// assert_eq!(Volume::MIN.value(), 0);
/// assert_eq!(Volume::MAX.value(), 100);
///
/// // Invalid values return error
/// assert!(Volume::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Volume(u8);

impl Volume {
    /// Minimum volume (0%).
    pub const MIN: Self = Self(0);

    /// Maximum volume (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new volume value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: u16::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a volume value, clamping to the valid range.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Returns the volume percentage.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the volume as a level between 0.0 and 1.0.
    #[must_use]
    pub fn as_fraction(&self) -> f32 {
        f32::from(self.0) / 100.0
    }

    /// Creates a volume from a level between 0.0 and 1.0.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the fraction is outside [0.0, 1.0].
    ///
    /// # Examples
    ///
    /// ```
    /// use mcintosh_lib::types::Volume;
    ///
    /// let vol = Volume::from_fraction(0.42).unwrap();
    /// assert_eq!(vol.value(), 42);
    /// ```
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_fraction(fraction: f32) -> Result<Self, ValueError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                // Informational only: the fraction is already out of range
                actual: (fraction.max(0.0) * 100.0) as u16,
            });
        }
        Ok(Self((fraction * 100.0).round() as u8))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Volume {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Volume> for u8 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

impl FromStr for Volume {
    type Err = ParseError;

    /// Parses the decimal volume a device reports, e.g. the `35` in `VOL 35`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u8 = s.trim().parse().map_err(|_| ParseError::InvalidValue {
            field: "volume".to_string(),
            message: format!("{s} is not an integer in 0-100"),
        })?;
        Self::new(raw).map_err(|e| ParseError::InvalidValue {
            field: "volume".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_valid_values() {
        for v in 0..=100 {
            assert_eq!(Volume::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn volume_invalid_value() {
        assert_eq!(
            Volume::new(101),
            Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: 101
            })
        );
    }

    #[test]
    fn volume_clamped() {
        assert_eq!(Volume::clamped(50).value(), 50);
        assert_eq!(Volume::clamped(255).value(), 100);
    }

    #[test]
    fn volume_fraction_conversions() {
        assert!((Volume::MAX.as_fraction() - 1.0).abs() < f32::EPSILON);
        assert_eq!(Volume::from_fraction(0.5).unwrap().value(), 50);
        assert!(Volume::from_fraction(1.1).is_err());
        assert!(Volume::from_fraction(-0.1).is_err());
    }

    #[test]
    fn volume_from_str() {
        assert_eq!("42".parse::<Volume>().unwrap().value(), 42);
        assert!("abc".parse::<Volume>().is_err());
        assert!("150".parse::<Volume>().is_err());
        assert!("-3".parse::<Volume>().is_err());
    }

    #[test]
    fn volume_serde_rejects_out_of_range() {
        assert_eq!(serde_json::from_str::<Volume>("30").unwrap().value(), 30);
        assert!(serde_json::from_str::<Volume>("130").is_err());
    }
}
