//! Simulation time units with parsing and display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

const UNITS: [(&str, u64); 6] = [
    ("s", FS_PER_S),
    ("ms", FS_PER_MS),
    ("us", FS_PER_US),
    ("ns", FS_PER_NS),
    ("ps", FS_PER_PS),
    ("fs", 1),
];

/// The length of one simulation time step.
///
/// Event timestamps are plain `u64` counts of this unit. Parses from the
/// VCD-style spelling `"<1|10|100><unit>"` (e.g. `"1ps"`, `"10ns"`), with an
/// optional space between magnitude and unit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timescale {
    fs_per_unit: u64,
}

impl Timescale {
    /// One picosecond per time step.
    pub const PS: Timescale = Timescale {
        fs_per_unit: FS_PER_PS,
    };

    /// One nanosecond per time step.
    pub const NS: Timescale = Timescale {
        fs_per_unit: FS_PER_NS,
    };

    /// Creates a timescale from a femtosecond count, which must be a power of ten.
    pub fn from_fs(fs_per_unit: u64) -> Option<Self> {
        let mut v = fs_per_unit;
        if v == 0 {
            return None;
        }
        while v % 10 == 0 {
            v /= 10;
        }
        (v == 1).then_some(Self { fs_per_unit })
    }

    /// Returns the number of femtoseconds in one time step.
    pub fn fs_per_unit(&self) -> u64 {
        self.fs_per_unit
    }

    /// Converts a time expressed in `from` units into this timescale.
    ///
    /// Returns `None` if the value does not land on a whole step of this
    /// timescale or overflows.
    pub fn convert_from(&self, time: u64, from: Timescale) -> Option<u64> {
        let fs = time.checked_mul(from.fs_per_unit)?;
        if fs % self.fs_per_unit != 0 {
            return None;
        }
        Some(fs / self.fs_per_unit)
    }
}

impl Default for Timescale {
    fn default() -> Self {
        Self::PS
    }
}

impl fmt::Debug for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timescale({self})")
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, fs) in UNITS {
            if self.fs_per_unit >= fs && self.fs_per_unit % fs == 0 {
                return write!(f, "{}{name}", self.fs_per_unit / fs);
            }
        }
        write!(f, "{}fs", self.fs_per_unit)
    }
}

/// Error type for parsing timescale strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timescale: '{input}'")]
pub struct ParseTimescaleError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Timescale {
    type Err = ParseTimescaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimescaleError {
            input: s.to_string(),
        };
        let lower = s.trim().to_ascii_lowercase();
        let split = lower
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(err)?;
        let (num, unit) = lower.split_at(split);
        let magnitude: u64 = num.parse().map_err(|_| err())?;
        if !matches!(magnitude, 1 | 10 | 100) {
            return Err(err());
        }
        let unit = unit.trim();
        let (_, fs) = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .ok_or_else(err)?;
        Ok(Self {
            fs_per_unit: magnitude * fs,
        })
    }
}

impl TryFrom<String> for Timescale {
    type Error = ParseTimescaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timescale> for String {
    fn from(value: Timescale) -> Self {
        value.to_string()
    }
}
