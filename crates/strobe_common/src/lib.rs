//! Shared foundational types used across the Strobe gate-level simulator.
//!
//! This crate provides the four-state [`Logic`] signal value and the
//! [`Timescale`] that gives event timestamps a physical unit.

#![warn(missing_docs)]

pub mod logic;
pub mod timescale;

pub use logic::{Logic, ParseLogicError};
pub use timescale::{ParseTimescaleError, Timescale};
