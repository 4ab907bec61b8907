//! IEEE 1164 four-state logic values with truth-table-based operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

/// A single 4-state signal value carried by nets and gate pins.
///
/// The four states represent:
/// - `Zero`: logic low (driven 0)
/// - `One`: logic high (driven 1)
/// - `X`: unknown or uninitialized value
/// - `Z`: high-impedance (tri-state, not driven)
///
/// `X` is the value of every net that has not been driven yet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Unknown or uninitialized.
    #[default]
    X = 2,
    /// High-impedance (tri-state).
    Z = 3,
}

impl Logic {
    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', 'x'/'X', and 'z'/'Z'.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Converts a boolean to `One` or `Zero`.
    pub fn from_bool(b: bool) -> Self {
        if b {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Returns `true` for the two driven binary states.
    pub fn is_binary(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Inverts a binary value; `X` and `Z` are returned unchanged.
    pub fn toggle(self) -> Self {
        match self {
            Logic::Zero => Logic::One,
            Logic::One => Logic::Zero,
            other => other,
        }
    }

    /// Lower-case character used in value change dumps.
    pub fn to_vcd_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Zero => write!(f, "0"),
            Logic::One => write!(f, "1"),
            Logic::X => write!(f, "X"),
            Logic::Z => write!(f, "Z"),
        }
    }
}

/// Error type for parsing logic literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid logic value: '{input}'")]
pub struct ParseLogicError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Logic {
    type Err = ParseLogicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Logic::from_char(c),
            _ => None,
        }
        .ok_or_else(|| ParseLogicError {
            input: s.to_string(),
        })
    }
}

/// IEEE 1164 AND truth table:
/// ```text
///     0  1  X  Z
/// 0 | 0  0  0  0
/// 1 | 0  1  X  X
/// X | 0  X  X  X
/// Z | 0  X  X  X
/// ```
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// IEEE 1164 OR truth table:
/// ```text
///     0  1  X  Z
/// 0 | 0  1  X  X
/// 1 | 1  1  1  1
/// X | X  1  X  X
/// Z | X  1  X  X
/// ```
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }
}

/// IEEE 1164 XOR truth table:
/// ```text
///     0  1  X  Z
/// 0 | 0  1  X  X
/// 1 | 1  0  X  X
/// X | X  X  X  X
/// Z | X  X  X  X
/// ```
impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, Zero) | (One, One) => Zero,
            (Zero, One) | (One, Zero) => One,
            _ => X,
        }
    }
}

/// IEEE 1164 NOT:
/// - `!0 = 1`, `!1 = 0`, `!X = X`, `!Z = X`
impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        use Logic::*;
        match self {
            Zero => One,
            One => Zero,
            X | Z => X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Logic::*;
    use super::*;

    #[test]
    fn default_is_unknown() {
        assert_eq!(Logic::default(), X);
    }

    #[test]
    fn and_truth_table() {
        assert_eq!(Zero & Zero, Zero);
        assert_eq!(Zero & X, Zero);
        assert_eq!(Z & Zero, Zero);
        assert_eq!(One & One, One);
        assert_eq!(One & X, X);
        assert_eq!(One & Z, X);
        assert_eq!(Z & Z, X);
    }

    #[test]
    fn or_truth_table() {
        assert_eq!(One | Zero, One);
        assert_eq!(One | X, One);
        assert_eq!(Z | One, One);
        assert_eq!(Zero | Zero, Zero);
        assert_eq!(Zero | X, X);
        assert_eq!(X | Z, X);
    }

    #[test]
    fn xor_truth_table() {
        assert_eq!(Zero ^ Zero, Zero);
        assert_eq!(Zero ^ One, One);
        assert_eq!(One ^ One, Zero);
        assert_eq!(One ^ X, X);
        assert_eq!(Z ^ Zero, X);
    }

    #[test]
    fn toggle_values() {
        assert_eq!(Zero.toggle(), One);
        assert_eq!(One.toggle(), Zero);
        assert_eq!(X.toggle(), X);
        assert_eq!(Z.toggle(), Z);
        assert_eq!(!Z, X, "NOT still maps Z to X");
    }

    #[test]
    fn binary_check() {
        assert!(Zero.is_binary());
        assert!(One.is_binary());
        assert!(!X.is_binary());
        assert!(!Z.is_binary());
    }

    #[test]
    fn display_and_vcd_chars() {
        assert_eq!(format!("{X}"), "X");
        assert_eq!(X.to_vcd_char(), 'x');
        assert_eq!(Z.to_vcd_char(), 'z');
        assert_eq!(One.to_vcd_char(), '1');
    }

    #[test]
    fn parse_literals() {
        assert_eq!("0".parse::<Logic>(), Ok(Zero));
        assert_eq!(" 1 ".parse::<Logic>(), Ok(One));
        assert_eq!("x".parse::<Logic>(), Ok(X));
        assert_eq!("Z".parse::<Logic>(), Ok(Z));
        assert!("10".parse::<Logic>().is_err());
        assert!("".parse::<Logic>().is_err());
        assert!("a".parse::<Logic>().is_err());
    }

    #[test]
    fn from_bool() {
        assert_eq!(Logic::from_bool(true), One);
        assert_eq!(Logic::from_bool(false), Zero);
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&One).unwrap();
        let back: Logic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, One);
    }
}
