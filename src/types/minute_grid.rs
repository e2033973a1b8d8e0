// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The timer automation's quarter-hour schedule bitfield.
//!
//! The timer keeps one flag per quarter hour of a 24-hour day: 96 flags,
//! packed into 12 bytes. Flag `4 * hour + quarter` lives in byte
//! `bit / 8`, most significant bit first within each byte. The device
//! exposes the field byte-wise (`E251`/`E2511`) and flag-wise
//! (`E252`/`E2521`); this type does the same packing on the host side.

use std::fmt;

use crate::error::ValueError;

/// Number of quarter-hour slots per hour.
pub const QUARTERS_PER_HOUR: u8 = 4;

/// Number of bytes in the packed schedule.
pub const MINUTE_GRID_BYTES: usize = 12;

/// Packed quarter-hour on/off schedule of the timer automation.
///
/// # Examples
///
/// ```
/// use growbox_lib::types::MinuteGrid;
///
/// let mut grid = MinuteGrid::default();
/// grid.set(6, 2, true).unwrap();
/// assert!(grid.get(6, 2).unwrap());
/// assert!(!grid.get(6, 3).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MinuteGrid([u8; MINUTE_GRID_BYTES]);

impl MinuteGrid {
    /// Creates a grid from the 12 raw bytes as sent by `E2511`.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; MINUTE_GRID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Returns the packed bytes in wire order.
    #[must_use]
    pub const fn bytes(&self) -> [u8; MINUTE_GRID_BYTES] {
        self.0
    }

    /// Returns the flag for the given hour and quarter.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `hour > 23` or `quarter > 3`.
    pub fn get(&self, hour: u8, quarter: u8) -> Result<bool, ValueError> {
        let bit = Self::bit_index(hour, quarter)?;
        Ok(self.0[bit / 8] >> (7 - bit % 8) & 1 == 1)
    }

    /// Sets the flag for the given hour and quarter.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `hour > 23` or `quarter > 3`.
    pub fn set(&mut self, hour: u8, quarter: u8, on: bool) -> Result<(), ValueError> {
        let bit = Self::bit_index(hour, quarter)?;
        let mask = 1u8 << (7 - bit % 8);
        if on {
            self.0[bit / 8] |= mask;
        } else {
            self.0[bit / 8] &= !mask;
        }
        Ok(())
    }

    /// Sets all four quarter flags of one hour at once.
    ///
    /// This is what the hour-only form of `E252` does on the device.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `hour > 23`.
    pub fn set_hour(&mut self, hour: u8, on: bool) -> Result<(), ValueError> {
        for quarter in 0..QUARTERS_PER_HOUR {
            self.set(hour, quarter, on)?;
        }
        Ok(())
    }

    /// Unpacks the grid into per-hour flag rows.
    #[must_use]
    pub fn flags(&self) -> [[bool; QUARTERS_PER_HOUR as usize]; 24] {
        let mut out = [[false; QUARTERS_PER_HOUR as usize]; 24];
        for (hour, row) in out.iter_mut().enumerate() {
            for (quarter, flag) in row.iter_mut().enumerate() {
                // Indices are in range by construction.
                #[allow(clippy::cast_possible_truncation)]
                {
                    *flag = self.get(hour as u8, quarter as u8).unwrap_or(false);
                }
            }
        }
        out
    }

    fn bit_index(hour: u8, quarter: u8) -> Result<usize, ValueError> {
        if hour > 23 {
            return Err(ValueError::OutOfRange {
                field: "hour",
                min: 0,
                max: 23,
                actual: u16::from(hour),
            });
        }
        if quarter >= QUARTERS_PER_HOUR {
            return Err(ValueError::OutOfRange {
                field: "quarter",
                min: 0,
                max: u16::from(QUARTERS_PER_HOUR - 1),
                actual: u16::from(quarter),
            });
        }
        Ok(usize::from(QUARTERS_PER_HOUR) * usize::from(hour) + usize::from(quarter))
    }
}

impl fmt::Display for MinuteGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:08b}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msb_first_within_byte() {
        // Hour 0, quarter 0 is the most significant bit of byte 0.
        let grid = MinuteGrid::from_bytes([0b1000_0000, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(grid.get(0, 0).unwrap());
        for hour in 0..24 {
            for quarter in 0..4 {
                if (hour, quarter) != (0, 0) {
                    assert!(!grid.get(hour, quarter).unwrap());
                }
            }
        }
    }

    #[test]
    fn set_and_get_full_space() {
        for hour in 0..24u8 {
            for quarter in 0..4u8 {
                let mut grid = MinuteGrid::default();
                grid.set(hour, quarter, true).unwrap();
                assert!(grid.get(hour, quarter).unwrap());
                // Exactly one bit set.
                let ones: u32 = grid.bytes().iter().map(|b| b.count_ones()).sum();
                assert_eq!(ones, 1);
                grid.set(hour, quarter, false).unwrap();
                assert_eq!(grid, MinuteGrid::default());
            }
        }
    }

    #[test]
    fn set_hour_sets_all_quarters() {
        let mut grid = MinuteGrid::default();
        grid.set_hour(0, true).unwrap();
        assert_eq!(grid.bytes()[0], 0b1111_0000);
    }

    #[test]
    fn out_of_range_indices() {
        let mut grid = MinuteGrid::default();
        assert!(grid.get(24, 0).is_err());
        assert!(grid.set(0, 4, true).is_err());
    }

    #[test]
    fn flags_unpack() {
        let mut grid = MinuteGrid::default();
        grid.set(23, 3, true).unwrap();
        let flags = grid.flags();
        assert!(flags[23][3]);
        assert!(!flags[23][2]);
    }
}
