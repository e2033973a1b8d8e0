// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall-clock time of the device (`E8`/`E81`).

use std::fmt;

use crate::error::ValueError;

/// An hour/minute pair as kept by the device clock.
///
/// The device has no notion of dates or seconds; its clock is set and read
/// as a bare hour and minute.
///
/// # Examples
///
/// ```
/// use growbox_lib::types::ClockTime;
///
/// let t = ClockTime::new(7, 30).unwrap();
/// assert_eq!(t.to_string(), "07:30");
/// assert!(ClockTime::new(24, 0).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ClockTime {
    hours: u8,
    minutes: u8,
}

impl ClockTime {
    /// Creates a clock time.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `hours > 23` or `minutes > 59`.
    pub const fn new(hours: u8, minutes: u8) -> Result<Self, ValueError> {
        if hours > 23 {
            return Err(ValueError::OutOfRange {
                field: "hours",
                min: 0,
                max: 23,
                actual: hours as u16,
            });
        }
        if minutes > 59 {
            return Err(ValueError::OutOfRange {
                field: "minutes",
                min: 0,
                max: 59,
                actual: minutes as u16,
            });
        }
        Ok(Self { hours, minutes })
    }

    /// Returns the hour (0-23).
    #[must_use]
    pub const fn hours(&self) -> u8 {
        self.hours
    }

    /// Returns the minute (0-59).
    #[must_use]
    pub const fn minutes(&self) -> u8 {
        self.minutes
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_times() {
        assert!(ClockTime::new(0, 0).is_ok());
        assert!(ClockTime::new(23, 59).is_ok());
    }

    #[test]
    fn invalid_times() {
        assert!(ClockTime::new(24, 0).is_err());
        assert!(ClockTime::new(0, 60).is_err());
    }

    #[test]
    fn display_zero_padded() {
        assert_eq!(ClockTime::new(9, 5).unwrap().to_string(), "09:05");
    }
}
