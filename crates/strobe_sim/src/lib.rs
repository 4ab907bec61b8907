//! Event-driven gate-level simulator for Strobe netlists.
//!
//! The engine consumes a flat [`Netlist`] of gates and nets and simulates it
//! with 4-state logic and zero-delay gates. Each timestamp is settled in delta
//! rounds; flip-flops sample on their clock edge once the timestamp's
//! combinational activity has died down. Every processed value change is kept
//! in an [`EventLog`] that can be queried at any time or exported as VCD.
//!
//! # Usage
//!
//! ```ignore
//! use strobe_sim::simulate;
//!
//! let config = strobe_config::load_config(Path::new("sim.toml"))?;
//! let result = simulate(&netlist, &config)?;
//! println!("simulation ended at {:?}", result.summary.final_time);
//! ```
//!
//! # Modules
//!
//! - `error`: simulation and stimulus errors
//! - `event`: value-change events and their id generator
//! - `store`: per-net event histories
//! - `cell`: per-gate evaluation state
//! - `clock`: lazy periodic clock generators
//! - `engine`: the delta-round scheduler
//! - `stimulus`: name-resolved stimulus and configuration application
//! - `waveform`: VCD export
//! - `vcd_loader`: VCD import as stimulus
//! - `batch`: parallel runs over one netlist

#![warn(missing_docs)]

pub mod batch;
pub mod cell;
pub mod clock;
pub mod engine;
pub mod error;
pub mod event;
pub mod stimulus;
pub mod store;
pub mod vcd_loader;
pub mod waveform;

use strobe_common::Timescale;
use strobe_config::SimulationFile;
use strobe_netlist::Netlist;

pub use batch::run_batch;
pub use cell::GateCell;
pub use clock::{Clock, ClockSpec};
pub use engine::{Engine, EngineConfig, RunSummary, StepResult, StopHandle};
pub use error::{SimError, StimulusError};
pub use event::{Event, EventIdGenerator};
pub use stimulus::{apply_config, apply_initialization, Stimulus};
pub use store::EventLog;
pub use vcd_loader::{load_vcd, load_vcd_file, LoadedWaveform, VcdLoadError, VcdSignal};
pub use waveform::{export_vcd, export_vcd_string, write_vcd_file, VcdOptions, VcdWriter};

/// Outcome of [`simulate`].
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Every processed event.
    pub log: EventLog,
    /// Run totals.
    pub summary: RunSummary,
    /// Physical unit of one time step.
    pub timescale: Timescale,
}

/// High-level entry point: simulates `netlist` as described by a configuration.
///
/// Applies initialization, clocks and stimulus, runs up to `simulation.until`
/// (or until no events remain) and writes the `[waveform]` VCD if one is
/// configured.
pub fn simulate(netlist: &Netlist, config: &SimulationFile) -> Result<SimulationResult, SimError> {
    simulate_with(netlist, config, &Stimulus::new())
}

/// Like [`simulate`], with `extra` stimulus (typically a replayed waveform)
/// scheduled after the configured stimulus.
pub fn simulate_with(
    netlist: &Netlist,
    config: &SimulationFile,
    extra: &Stimulus,
) -> Result<SimulationResult, SimError> {
    let settings = &config.simulation;
    let mut engine = Engine::new(netlist, EngineConfig::from(settings))?;
    apply_config(&mut engine, config)?;
    extra.apply(&mut engine)?;
    let summary = match settings.until {
        Some(until) => engine.run_until(until)?,
        None => engine.run_to_completion()?,
    };
    log::debug!(
        "simulation finished: {} timestamps, {} events",
        summary.timestamps,
        summary.events
    );
    let log = engine.into_log();
    if let Some(wave) = &config.waveform {
        let options = VcdOptions::from_config(netlist, wave)?;
        write_vcd_file(&wave.path, &log, netlist, settings.timescale, &options)?;
        log::debug!("waveform written to {}", wave.path.display());
    }
    Ok(SimulationResult {
        log,
        summary,
        timescale: settings.timescale,
    })
}
