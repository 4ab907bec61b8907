//! Configuration types deserialized from a simulation TOML file.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use strobe_common::{Logic, Timescale};

/// Default per-timestamp delta-round bound.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10_000;

/// The top-level simulation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationFile {
    /// Engine settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Clock generators.
    #[serde(default)]
    pub clocks: Vec<ClockDef>,
    /// Discrete stimulus events.
    #[serde(default)]
    pub stimulus: Vec<StimulusDef>,
    /// Sequential-gate initialization requests, applied in order.
    #[serde(default)]
    pub initialize: Vec<InitializeDef>,
    /// Waveform output, if any.
    #[serde(default)]
    pub waveform: Option<WaveformDef>,
}

/// Engine settings from the `[simulation]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    /// Physical unit of one simulation time step.
    #[serde(default)]
    pub timescale: Timescale,
    /// Maximum delta rounds per timestamp before reporting non-convergence.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Run horizon; the simulation runs to completion when absent.
    #[serde(default)]
    pub until: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            timescale: Timescale::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            until: None,
        }
    }
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// A clock generator driving one net.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockDef {
    /// Name of the driven net.
    pub net: String,
    /// Full clock period in time steps.
    pub period: u64,
    /// Value of the first edge.
    #[serde(default = "default_start_value", deserialize_with = "logic_literal")]
    pub start_value: Logic,
    /// Time of the first edge.
    #[serde(default)]
    pub start_time: u64,
    /// How long the clock runs, starting at `start_time`.
    pub duration: u64,
}

fn default_start_value() -> Logic {
    Logic::Zero
}

/// A single value change on a named net.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StimulusDef {
    /// Name of the target net.
    pub net: String,
    /// Value to drive.
    #[serde(deserialize_with = "logic_literal")]
    pub value: Logic,
    /// Time of the change.
    pub time: u64,
}

/// Initial state for sequential gates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitializeDef {
    /// Initial state value.
    #[serde(deserialize_with = "logic_literal")]
    pub value: Logic,
    /// Gate names to initialize; empty selects every sequential gate.
    #[serde(default)]
    pub gates: Vec<String>,
}

/// Waveform output settings from the `[waveform]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WaveformDef {
    /// Output VCD file.
    pub path: PathBuf,
    /// Nets to dump; empty dumps every net.
    #[serde(default)]
    pub nets: Vec<String>,
    /// First dumped timestamp.
    #[serde(default)]
    pub start: Option<u64>,
    /// Last dumped timestamp.
    #[serde(default)]
    pub end: Option<u64>,
}

/// Deserializes a logic literal (`"0"`, `"1"`, `"X"`, `"Z"`, or the integers 0 and 1).
fn logic_literal<'de, D>(deserializer: D) -> Result<Logic, D::Error>
where
    D: Deserializer<'de>,
{
    struct LogicVisitor;

    impl<'de> Visitor<'de> for LogicVisitor {
        type Value = Logic;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a logic literal: \"0\", \"1\", \"X\" or \"Z\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Logic, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Logic, E> {
            match v {
                0 => Ok(Logic::Zero),
                1 => Ok(Logic::One),
                _ => Err(E::custom(format!("invalid logic literal {v}"))),
            }
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Logic, E> {
            Ok(Logic::from_bool(v))
        }
    }

    deserializer.deserialize_any(LogicVisitor)
}
