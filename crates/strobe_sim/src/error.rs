//! Simulation error types for the gate-level simulator.
//!
//! Errors that can occur while setting up or running a simulation are
//! variants of [`SimError`]. Rejected stimulus carries a [`StimulusError`]
//! describing what was wrong with it.

use std::io;

use strobe_common::Logic;
use strobe_netlist::{GateId, NetId};

/// Reasons an injected event or clock was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StimulusError {
    /// The net does not belong to the simulated netlist.
    #[error("net {0} is not part of the netlist")]
    UnknownNet(NetId),

    /// No net with this name exists in the netlist.
    #[error("no net named '{0}'")]
    UnknownNetName(String),

    /// No gate with this name exists in the netlist.
    #[error("no gate named '{0}'")]
    UnknownGateName(String),

    /// The event is older than the last event recorded on its net.
    #[error("event on '{net}' at time {time} precedes its last recorded event at {last}")]
    OutOfOrder {
        /// Net name.
        net: String,
        /// Time of the rejected event.
        time: u64,
        /// Time of the most recent recorded event on the net.
        last: u64,
    },

    /// The event is older than the last timestamp the engine has processed.
    #[error("event at time {time} is earlier than the current simulation time {current}")]
    InThePast {
        /// Time of the rejected event.
        time: u64,
        /// Last processed timestamp.
        current: u64,
    },

    /// A clock must start at `0` or `1`.
    #[error("clock on '{net}' must start at 0 or 1, not {value}")]
    NonBinaryClockStart {
        /// Net name.
        net: String,
        /// The rejected start value.
        value: Logic,
    },

    /// A clock period must be even and at least 2.
    #[error("clock on '{net}' has period {period}; the period must be even and at least 2")]
    InvalidClockPeriod {
        /// Net name.
        net: String,
        /// The rejected period.
        period: u64,
    },
}

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Stimulus was rejected before entering the pending set.
    #[error("invalid stimulus: {0}")]
    InvalidStimulus(#[from] StimulusError),

    /// A timestamp did not settle within the delta-round bound.
    #[error(
        "no convergence at time {time} after {iterations} delta rounds ({} gates still changing, {} combinational cycles)",
        .gates.len(),
        .cycles.len()
    )]
    NonConvergence {
        /// The timestamp that failed to settle.
        time: u64,
        /// The configured bound that was exceeded.
        iterations: u32,
        /// Gates still re-evaluating in the last round.
        gates: Vec<String>,
        /// Nets still changing in the last round.
        nets: Vec<String>,
        /// Combinational cycles containing any of `gates`.
        cycles: Vec<Vec<String>>,
        /// Nets carried around each cycle, parallel to `cycles`.
        cycle_nets: Vec<Vec<String>>,
    },

    /// A gate selected for simulation does not belong to the netlist.
    #[error("gate {0} is not part of the netlist")]
    UnknownGate(GateId),

    /// A sequential gate's control pin cannot be resolved.
    #[error("gate '{gate}': control pin '{pin}' {reason}")]
    UnresolvedConfiguration {
        /// Gate name.
        gate: String,
        /// Control pin name.
        pin: String,
        /// What is wrong with the pin.
        reason: String,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}
