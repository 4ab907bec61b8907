//! Parsing and validation of Strobe simulation configuration files.
//!
//! A configuration file describes one simulation run over a netlist: the
//! timescale and iteration bound, clock generators, discrete stimulus,
//! optional sequential initialization and waveform output. Nets and gates
//! are referenced by name; resolving them against a netlist is left to the
//! simulator.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
