// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The four device-side automation strategies and their periods.
//!
//! The set of automation modes is fixed in firmware and never extended at
//! runtime, so it is a closed enum rather than an open registry. Each mode
//! can be enabled independently per actuator.

use std::fmt;

use crate::error::ValueError;

/// A device-side control strategy that can be enabled per actuator.
///
/// The numeric code is the `R` parameter of the `E3`/`E4` commands and the
/// subtree key of the persisted settings buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AutoMode {
    /// Day/night cycle with an abrupt switch between periods.
    CycleHard,
    /// Sunrise/day/sunset/night cycle with gradual transitions.
    CycleSoft,
    /// Keep a sensor reading between a minimum and a maximum.
    ClimateControl,
    /// Quarter-hour on/off schedule over a 24-hour day.
    Timer,
}

impl AutoMode {
    /// All automation modes, in wire-code order.
    pub const ALL: [Self; 4] = [
        Self::CycleHard,
        Self::CycleSoft,
        Self::ClimateControl,
        Self::Timer,
    ];

    /// Returns the wire code of this mode.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::CycleHard => 0,
            Self::CycleSoft => 1,
            Self::ClimateControl => 2,
            Self::Timer => 3,
        }
    }

    /// Looks a mode up by its wire code.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnknownMode` for codes outside `0..=3`.
    pub const fn from_code(code: u8) -> Result<Self, ValueError> {
        match code {
            0 => Ok(Self::CycleHard),
            1 => Ok(Self::CycleSoft),
            2 => Ok(Self::ClimateControl),
            3 => Ok(Self::Timer),
            other => Err(ValueError::UnknownMode(other)),
        }
    }

    /// Returns a short lowercase name, matching the persisted-format docs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CycleHard => "cycle_hard",
            Self::CycleSoft => "cycle_soft",
            Self::ClimateControl => "climate_control",
            Self::Timer => "timer",
        }
    }
}

impl fmt::Display for AutoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A phase of the hard cycle automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardPeriod {
    /// Lights-off phase.
    Night,
    /// Lights-on phase.
    Day,
}

impl HardPeriod {
    /// All hard-cycle periods, in wire-code order.
    pub const ALL: [Self; 2] = [Self::Night, Self::Day];

    /// Returns the wire code (`B` parameter of `E101`/`E103`).
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Night => 0,
            Self::Day => 1,
        }
    }

    /// Looks a period up by its wire code.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnknownPeriod` for codes outside `0..=1`.
    pub const fn from_code(code: u8) -> Result<Self, ValueError> {
        match code {
            0 => Ok(Self::Night),
            1 => Ok(Self::Day),
            other => Err(ValueError::UnknownPeriod {
                mode: "cycle_hard",
                code: other,
            }),
        }
    }
}

/// A phase of the soft cycle automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoftPeriod {
    /// Gradual ramp from night to day.
    Sunrise,
    /// Full-brightness phase.
    Day,
    /// Gradual ramp from day to night.
    Sunset,
    /// Lights-off phase.
    Night,
}

impl SoftPeriod {
    /// All soft-cycle periods, in wire-code order.
    pub const ALL: [Self; 4] = [Self::Sunrise, Self::Day, Self::Sunset, Self::Night];

    /// Returns the wire code (`P` parameter of `E151`/`E153`).
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Sunrise => 0,
            Self::Day => 1,
            Self::Sunset => 2,
            Self::Night => 3,
        }
    }

    /// Looks a period up by its wire code.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnknownPeriod` for codes outside `0..=3`.
    pub const fn from_code(code: u8) -> Result<Self, ValueError> {
        match code {
            0 => Ok(Self::Sunrise),
            1 => Ok(Self::Day),
            2 => Ok(Self::Sunset),
            3 => Ok(Self::Night),
            other => Err(ValueError::UnknownPeriod {
                mode: "cycle_soft",
                code: other,
            }),
        }
    }
}
