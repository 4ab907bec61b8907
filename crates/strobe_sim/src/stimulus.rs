//! Named stimulus: resolving configuration and recorded waveforms to net ids.

use strobe_common::Logic;
use strobe_config::SimulationFile;
use strobe_netlist::{GateKind, NetId, Netlist};

use crate::clock::ClockSpec;
use crate::engine::Engine;
use crate::error::{SimError, StimulusError};

/// A set of value changes and clocks addressed by net id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stimulus {
    /// `(net, value, time)` changes.
    pub events: Vec<(NetId, Logic, u64)>,
    /// Clock generators.
    pub clocks: Vec<ClockSpec>,
}

impl Stimulus {
    /// Creates an empty stimulus set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one value change.
    pub fn event(mut self, net: NetId, value: Logic, time: u64) -> Self {
        self.events.push((net, value, time));
        self
    }

    /// Adds one clock.
    pub fn clock(mut self, spec: ClockSpec) -> Self {
        self.clocks.push(spec);
        self
    }

    /// Resolves the `[[stimulus]]` and `[[clocks]]` entries of a configuration.
    pub fn from_config(netlist: &Netlist, config: &SimulationFile) -> Result<Self, StimulusError> {
        let names = netlist.net_name_index();
        let resolve = |name: &str| {
            names
                .get(name)
                .copied()
                .ok_or_else(|| StimulusError::UnknownNetName(name.to_string()))
        };
        let mut stimulus = Stimulus::new();
        for clock in &config.clocks {
            stimulus.clocks.push(ClockSpec {
                net: resolve(&clock.net)?,
                period: clock.period,
                start_value: clock.start_value,
                start_time: clock.start_time,
                duration: clock.duration,
            });
        }
        for change in &config.stimulus {
            stimulus
                .events
                .push((resolve(&change.net)?, change.value, change.time));
        }
        Ok(stimulus)
    }

    /// Schedules every clock and event on `engine`.
    ///
    /// Events are injected in time order, so the set does not need to be sorted.
    pub fn apply(&self, engine: &mut Engine<'_>) -> Result<(), SimError> {
        for spec in &self.clocks {
            engine.add_clock(*spec)?;
        }
        let mut events = self.events.clone();
        events.sort_by_key(|&(_, _, time)| time);
        for (net, value, time) in events {
            engine.add_event(net, value, time)?;
        }
        Ok(())
    }
}

/// Applies the `[[initialize]]` entries of a configuration, resolving gate names.
pub fn apply_initialization(engine: &mut Engine<'_>, config: &SimulationFile) -> Result<(), SimError> {
    let netlist = engine.netlist();
    for init in &config.initialize {
        let mut gates = Vec::with_capacity(init.gates.len());
        for name in &init.gates {
            let gate = netlist
                .gate_by_name(name)
                .ok_or_else(|| StimulusError::UnknownGateName(name.clone()))?;
            if !matches!(
                netlist.type_of(gate).kind(),
                GateKind::FlipFlop | GateKind::Latch
            ) {
                log::warn!("gate '{name}' is not sequential and will not be initialized");
            }
            gates.push(gate);
        }
        engine.initialize_sequential(init.value, |gate, _| gates.is_empty() || gates.contains(&gate));
    }
    Ok(())
}

/// Applies the whole configuration to `engine`: initialization, clocks and stimulus.
pub fn apply_config(engine: &mut Engine<'_>, config: &SimulationFile) -> Result<(), SimError> {
    apply_initialization(engine, config)?;
    Stimulus::from_config(engine.netlist(), config)?.apply(engine)
}
