//! The event-driven simulation engine.
//!
//! [`Engine`] owns one [`GateCell`] per gate, a min-heap of pending events
//! keyed by `(time, id)` and the [`EventLog`] of everything processed so far.
//! Gates have zero delay, so every timestamp is settled in *delta rounds*:
//!
//! 1. due clock edges are materialized into the pending set;
//! 2. all pending events at the timestamp are applied to the log and observed
//!    by the gates reading their nets;
//! 3. gates whose inputs changed are re-evaluated and schedule output events
//!    at the same timestamp when an output changes;
//! 4. once no events remain at the timestamp, flip-flops armed by a clock
//!    edge sample their data inputs together and may schedule more rounds.
//!
//! A timestamp that needs more than `max_iterations` rounds is reported as
//! [`SimError::NonConvergence`].
//!
//! An engine can simulate a subset of the netlist's gates; nets crossing the
//! subset boundary are reported by [`Engine::input_nets`] and
//! [`Engine::output_nets`].

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strobe_common::{Logic, Timescale};
use strobe_config::SimulationSettings;
use strobe_netlist::{GateGraph, GateId, GateKind, GateType, NetId, Netlist};

use crate::cell::GateCell;
use crate::clock::{Clock, ClockSpec};
use crate::error::{SimError, StimulusError};
use crate::event::{Event, EventIdGenerator};
use crate::store::EventLog;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Physical unit of one time step.
    pub timescale: Timescale,
    /// Maximum delta rounds per timestamp.
    pub max_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timescale: Timescale::default(),
            max_iterations: strobe_config::DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl From<&SimulationSettings> for EngineConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            timescale: settings.timescale,
            max_iterations: settings.max_iterations,
        }
    }
}

/// Requests a running simulation to stop at the next timestamp boundary.
///
/// Clones share the same flag, so a handle can be moved to another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Asks the engine to stop before processing its next timestamp.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested and not yet honored.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Outcome of processing one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// The processed timestamp.
    pub time: u64,
    /// Delta rounds needed to settle it.
    pub delta_rounds: u32,
    /// Events applied at it.
    pub events: usize,
}

/// Totals for a `run_*` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Last processed timestamp when the run returned.
    pub final_time: Option<u64>,
    /// Timestamps processed during the run.
    pub timestamps: u64,
    /// Delta rounds executed during the run.
    pub delta_rounds: u64,
    /// Events applied during the run.
    pub events: u64,
    /// Whether the run ended because of a [`StopHandle`] request.
    pub stopped: bool,
}

impl RunSummary {
    fn record(&mut self, step: StepResult) {
        self.timestamps += 1;
        self.delta_rounds += u64::from(step.delta_rounds);
        self.events += step.events as u64;
    }
}

/// Progress through one timestamp, used in trace output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Applying,
    Settling,
    Advancing,
}

/// A gate-level simulation over a borrowed, immutable netlist.
pub struct Engine<'a> {
    netlist: &'a Netlist,
    config: EngineConfig,
    cells: Vec<GateCell<'a>>,
    cell_index: HashMap<GateId, usize>,
    fanout: HashMap<NetId, Vec<(usize, usize)>>,
    pending: BinaryHeap<Reverse<Event>>,
    log: EventLog,
    ids: EventIdGenerator,
    clocks: Vec<Clock>,
    current_time: Option<u64>,
    simulated_until: Option<u64>,
    stop: StopHandle,
}

impl<'a> Engine<'a> {
    /// Sets up a cell for every gate and schedules constant drivers at time 0.
    ///
    /// Fails with [`SimError::UnresolvedConfiguration`] if a flip-flop or
    /// latch has an undeclared or unconnected control pin.
    pub fn new(netlist: &'a Netlist, config: EngineConfig) -> Result<Self, SimError> {
        let gates: Vec<GateId> = netlist.gates().map(|g| g.id).collect();
        Self::with_gates(netlist, &gates, config)
    }

    /// Like [`Engine::new`], but only the listed gates are simulated. Nets
    /// driven from outside the subset change only through stimulus.
    ///
    /// Duplicates are ignored. Fails with [`SimError::UnknownGate`] for a gate
    /// that is not part of the netlist.
    pub fn with_gates(
        netlist: &'a Netlist,
        gates: &[GateId],
        config: EngineConfig,
    ) -> Result<Self, SimError> {
        let selected: BTreeSet<GateId> = gates.iter().copied().collect();
        if let Some(&unknown) = selected.iter().find(|g| !netlist.contains_gate(**g)) {
            return Err(SimError::UnknownGate(unknown));
        }
        let mut cells = Vec::with_capacity(selected.len());
        let mut cell_index = HashMap::new();
        let mut fanout: HashMap<NetId, Vec<(usize, usize)>> = HashMap::new();
        for gate in selected {
            let cell = GateCell::new(netlist, gate)?;
            let index = cells.len();
            for (pin, net) in cell.input_nets().iter().enumerate() {
                if let Some(net) = net {
                    fanout.entry(*net).or_default().push((index, pin));
                }
            }
            cell_index.insert(gate, index);
            cells.push(cell);
        }
        log::debug!(
            "engine ready for '{}': {} of {} gates, {} nets, timescale {}",
            netlist.name,
            cells.len(),
            netlist.gate_count(),
            netlist.net_count(),
            config.timescale
        );
        let mut engine = Self {
            netlist,
            config,
            cells,
            cell_index,
            fanout,
            pending: BinaryHeap::new(),
            log: EventLog::new(),
            ids: EventIdGenerator::new(),
            clocks: Vec::new(),
            current_time: None,
            simulated_until: None,
            stop: StopHandle::default(),
        };
        engine.schedule_constants(0);
        Ok(engine)
    }

    /// Schedules every constant driver whose output differs from what it
    /// last drove.
    fn schedule_constants(&mut self, time: u64) {
        for cell in &mut self.cells {
            if cell.kind() == GateKind::Constant {
                let next = cell.next_outputs();
                for (net, value) in cell.commit_outputs(next) {
                    self.pending.push(Reverse(self.ids.event(net, value, time)));
                }
            }
        }
    }

    /// The simulated netlist.
    pub fn netlist(&self) -> &'a Netlist {
        self.netlist
    }

    /// The engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The log of processed events.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Consumes the engine and returns its event log.
    pub fn into_log(self) -> EventLog {
        self.log
    }

    /// The evaluation state of `gate`.
    pub fn cell(&self, gate: GateId) -> Option<&GateCell<'a>> {
        self.cell_index.get(&gate).map(|&i| &self.cells[i])
    }

    /// A handle that stops `run_*` calls between timestamps.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The last processed timestamp, or `None` before the first step.
    pub fn current_time(&self) -> Option<u64> {
        self.current_time
    }

    /// The end time of the last `run_until` or `run_for` call that ran to
    /// its bound. Every timestamp up to it has been processed, even if the
    /// last event came earlier.
    pub fn simulated_until(&self) -> Option<u64> {
        self.simulated_until
    }

    /// The point new stimulus is measured against: the later of the current
    /// time and the simulated horizon.
    fn now(&self) -> Option<u64> {
        self.current_time.max(self.simulated_until)
    }

    /// Number of events waiting in the pending set.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Finds a net by name.
    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.netlist.net_by_name(name)
    }

    /// Nets read by a simulated gate but not driven by one: global inputs and
    /// nets whose driver lies outside the simulated subset.
    pub fn input_nets(&self) -> Vec<NetId> {
        let mut nets = BTreeSet::new();
        for cell in &self.cells {
            for &net in cell.input_nets().iter().flatten() {
                let driven_inside = self
                    .netlist
                    .net(net)
                    .source
                    .as_ref()
                    .is_some_and(|src| self.cell_index.contains_key(&src.gate));
                if !driven_inside {
                    nets.insert(net);
                }
            }
        }
        nets.into_iter().collect()
    }

    /// Nets driven by a simulated gate that are read outside the subset, or
    /// not read at all (global outputs).
    pub fn output_nets(&self) -> Vec<NetId> {
        let mut nets = BTreeSet::new();
        for cell in &self.cells {
            for &net in cell.output_nets().iter().flatten() {
                let dests = &self.netlist.net(net).destinations;
                if dests.is_empty() || dests.iter().any(|d| !self.cell_index.contains_key(&d.gate)) {
                    nets.insert(net);
                }
            }
        }
        nets.into_iter().collect()
    }

    /// Schedules `value` on `net` at `time`.
    ///
    /// The event is refused if the net is not part of the netlist, if `time`
    /// precedes the last event recorded on the net, or if `time` precedes the
    /// last processed timestamp or the horizon of the last bounded run.
    pub fn add_event(&mut self, net: NetId, value: Logic, time: u64) -> Result<(), SimError> {
        if !self.netlist.contains_net(net) {
            return Err(StimulusError::UnknownNet(net).into());
        }
        if let Some(current) = self.now() {
            if time < current {
                return Err(StimulusError::InThePast { time, current }.into());
            }
        }
        if let Some(last) = self.log.last_time(net) {
            if time < last {
                return Err(StimulusError::OutOfOrder {
                    net: self.netlist.net(net).name.clone(),
                    time,
                    last,
                }
                .into());
            }
        }
        let event = self.ids.event(net, value, time);
        log::trace!("scheduled {}={} at {}", self.netlist.net(net).name, value, time);
        self.pending.push(Reverse(event));
        Ok(())
    }

    /// Adds a clock generator.
    pub fn add_clock(&mut self, spec: ClockSpec) -> Result<(), SimError> {
        if !self.netlist.contains_net(spec.net) {
            return Err(StimulusError::UnknownNet(spec.net).into());
        }
        spec.validate(&self.netlist.net(spec.net).name)?;
        if let Some(current) = self.now() {
            if spec.start_time < current {
                return Err(StimulusError::InThePast {
                    time: spec.start_time,
                    current,
                }
                .into());
            }
        }
        log::debug!(
            "clock on '{}': period {}, first edge {} at {}",
            self.netlist.net(spec.net).name,
            spec.period,
            spec.start_value,
            spec.start_time
        );
        self.clocks.push(Clock::new(spec));
        Ok(())
    }

    /// Sets the state of every flip-flop and latch accepted by `filter` to
    /// `value` and schedules the matching output events at the current time.
    ///
    /// Returns the number of gates initialized.
    pub fn initialize_sequential<F>(&mut self, value: Logic, filter: F) -> usize
    where
        F: Fn(GateId, &GateType) -> bool,
    {
        let time = self.now().unwrap_or(0);
        let mut count = 0;
        for cell in &mut self.cells {
            if !matches!(cell.kind(), GateKind::FlipFlop | GateKind::Latch) {
                continue;
            }
            if !filter(cell.gate(), self.netlist.type_of(cell.gate())) {
                continue;
            }
            cell.set_state(value);
            let next = cell.next_outputs();
            for (net, v) in cell.commit_outputs(next) {
                self.pending.push(Reverse(self.ids.event(net, v, time)));
            }
            count += 1;
        }
        log::debug!("initialized {count} sequential gates to {value} at {time}");
        count
    }

    /// Discards all simulation progress: the log, pending events, gate state,
    /// clock progress and event ids. Clock generators stay registered and
    /// constant drivers are scheduled again.
    pub fn reset(&mut self) {
        self.log.clear();
        self.pending.clear();
        self.ids.reset();
        self.current_time = None;
        self.simulated_until = None;
        for cell in &mut self.cells {
            cell.reset();
        }
        for clock in &mut self.clocks {
            clock.rewind();
        }
        self.schedule_constants(0);
        log::debug!("engine reset");
    }

    /// Continues from a previously recorded log instead of the current
    /// progress.
    ///
    /// Pending events are dropped and the current time becomes the last
    /// timestamp in `state`. Every simulated gate takes the last recorded
    /// value of its nets, clock edges up to that time are skipped and new
    /// event ids continue after the highest id in `state`. Constant drivers
    /// missing from `state` are scheduled at the restored time.
    pub fn restore(&mut self, state: EventLog) -> Result<(), SimError> {
        if let Some(net) = state.nets().find(|n| !self.netlist.contains_net(*n)) {
            return Err(StimulusError::UnknownNet(net).into());
        }
        let next_id = state
            .nets()
            .flat_map(|n| state.history(n))
            .map(|e| e.id + 1)
            .max()
            .unwrap_or(0);
        self.pending.clear();
        self.ids = EventIdGenerator::starting_at(next_id);
        self.current_time = state.end_time();
        self.simulated_until = None;
        for cell in &mut self.cells {
            cell.restore(&state);
        }
        for clock in &mut self.clocks {
            clock.rewind();
            if let Some(time) = self.current_time {
                clock.skip_through(time);
            }
        }
        self.log = state;
        self.schedule_constants(self.current_time.unwrap_or(0));
        log::debug!(
            "restored {} events up to {:?}",
            self.log.event_count(),
            self.current_time
        );
        Ok(())
    }

    /// Value of `net` at `time`, `X` if nothing was recorded by then.
    pub fn get_value(&self, net: NetId, time: u64) -> Logic {
        self.log.get_value(net, time)
    }

    /// Current value of `net`.
    pub fn value(&self, net: NetId) -> Logic {
        self.log.last_value(net).unwrap_or(Logic::X)
    }

    /// Copy of one net's processed events.
    pub fn get_history(&self, net: NetId) -> Vec<Event> {
        self.log.get_history(net)
    }

    /// Copy of every net's processed events.
    pub fn get_all_history(&self) -> BTreeMap<NetId, Vec<Event>> {
        self.log.get_all_history()
    }

    /// The next timestamp with work to do.
    pub fn next_time(&self) -> Option<u64> {
        let queued = self.pending.peek().map(|Reverse(e)| e.time);
        let clocked = self.clocks.iter().filter_map(Clock::peek_time).min();
        match (queued, clocked) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Processes the next timestamp. Returns `None` when nothing is left.
    pub fn step(&mut self) -> Result<Option<StepResult>, SimError> {
        let Some(time) = self.next_time() else {
            return Ok(None);
        };
        self.current_time = Some(time);
        log::trace!("t={time} {:?}", Phase::Pending);
        for clock in &mut self.clocks {
            if clock.peek_time() == Some(time) {
                if let Some((t, value)) = clock.advance() {
                    self.pending
                        .push(Reverse(self.ids.event(clock.spec().net, value, t)));
                }
            }
        }

        let mut rounds: u32 = 0;
        let mut applied = 0usize;
        let mut armed: BTreeSet<usize> = BTreeSet::new();
        let mut touched: BTreeSet<usize> = BTreeSet::new();
        let mut changed_nets: BTreeSet<NetId> = BTreeSet::new();
        loop {
            let due = matches!(self.pending.peek(), Some(Reverse(e)) if e.time == time);
            if !due {
                if armed.is_empty() {
                    break;
                }
                log::trace!("t={time} {:?}: clocking {} flip-flops", Phase::Advancing, armed.len());
                let batch = std::mem::take(&mut armed);
                for &ci in &batch {
                    self.cells[ci].clock();
                }
                for &ci in &batch {
                    let cell = &mut self.cells[ci];
                    let next = cell.next_outputs();
                    for (net, value) in cell.commit_outputs(next) {
                        self.pending.push(Reverse(self.ids.event(net, value, time)));
                    }
                }
                continue;
            }

            rounds += 1;
            if rounds > self.config.max_iterations {
                return Err(self.non_convergence(time, &touched, &changed_nets));
            }

            log::trace!("t={time} {:?}: delta round {rounds}", Phase::Applying);
            touched.clear();
            changed_nets.clear();
            while let Some(Reverse(event)) = self.pending.peek().copied() {
                if event.time != time {
                    break;
                }
                self.pending.pop();
                self.log.add_event(event);
                applied += 1;
                changed_nets.insert(event.net);
                if let Some(readers) = self.fanout.get(&event.net) {
                    for &(ci, pin) in readers {
                        if self.cells[ci].observe_index(pin, event.value) {
                            touched.insert(ci);
                        }
                    }
                }
            }

            log::trace!("t={time} {:?}: {} gates", Phase::Settling, touched.len());
            for &ci in &touched {
                let cell = &mut self.cells[ci];
                match cell.kind() {
                    GateKind::Constant => continue,
                    GateKind::Combinational => {}
                    GateKind::FlipFlop | GateKind::Latch => {
                        cell.apply_levels();
                        if cell.is_armed() {
                            armed.insert(ci);
                        }
                    }
                }
                let next = cell.next_outputs();
                for (net, value) in cell.commit_outputs(next) {
                    self.pending.push(Reverse(self.ids.event(net, value, time)));
                }
            }
        }

        log::debug!("t={time} settled: {applied} events in {rounds} delta rounds");
        Ok(Some(StepResult {
            time,
            delta_rounds: rounds,
            events: applied,
        }))
    }

    fn non_convergence(
        &self,
        time: u64,
        touched: &BTreeSet<usize>,
        nets: &BTreeSet<NetId>,
    ) -> SimError {
        let gate_ids: Vec<GateId> = touched.iter().map(|&ci| self.cells[ci].gate()).collect();
        let mut graph = GateGraph::combinational(self.netlist);
        let mut cycles = graph.cycles_through(&gate_ids);
        if cycles.is_empty() {
            graph = GateGraph::build(self.netlist);
            cycles = graph.cycles_through(&gate_ids);
        }
        let gate_name = |g: GateId| self.netlist.gate(g).name.clone();
        let net_names =
            |ns: &[NetId]| -> Vec<String> { ns.iter().map(|&n| self.netlist.net(n).name.clone()).collect() };
        let cycle_nets: Vec<Vec<String>> =
            cycles.iter().map(|c| net_names(&graph.cycle_nets(c))).collect();
        let err = SimError::NonConvergence {
            time,
            iterations: self.config.max_iterations,
            gates: touched.iter().map(|&ci| self.cells[ci].name().to_string()).collect(),
            nets: net_names(&nets.iter().copied().collect::<Vec<_>>()),
            cycles: cycles
                .into_iter()
                .map(|c| c.into_iter().map(gate_name).collect())
                .collect(),
            cycle_nets,
        };
        log::warn!("{err}");
        err
    }

    /// Processes every timestamp up to and including `end_time`.
    ///
    /// Unless the run is stopped early, `end_time` becomes the simulated
    /// horizon: later stimulus may not be scheduled before it and `run_for`
    /// measures from it.
    pub fn run_until(&mut self, end_time: u64) -> Result<RunSummary, SimError> {
        let summary = self.run_through(end_time)?;
        if !summary.stopped {
            self.simulated_until = self.simulated_until.max(Some(end_time));
        }
        Ok(summary)
    }

    fn run_through(&mut self, end_time: u64) -> Result<RunSummary, SimError> {
        let mut summary = RunSummary::default();
        while let Some(next) = self.next_time() {
            if next > end_time {
                break;
            }
            if self.stop.take() {
                log::debug!("stop requested before t={next}");
                summary.stopped = true;
                break;
            }
            match self.step()? {
                Some(step) => summary.record(step),
                None => break,
            }
        }
        summary.final_time = self.current_time;
        Ok(summary)
    }

    /// Processes `duration` time steps past the simulated horizon, or past
    /// the current time if that is later.
    pub fn run_for(&mut self, duration: u64) -> Result<RunSummary, SimError> {
        let start = self.now().unwrap_or(0);
        self.run_until(start.saturating_add(duration))
    }

    /// Processes timestamps until no events or clock edges remain.
    pub fn run_to_completion(&mut self) -> Result<RunSummary, SimError> {
        self.run_through(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(engine: &Engine, net: NetId) -> Vec<(u64, Logic)> {
        engine
            .get_history(net)
            .iter()
            .map(|e| (e.time, e.value))
            .collect()
    }

    fn and_netlist() -> Netlist {
        let mut nl = Netlist::with_standard_library("top");
        let a = nl.add_net("a");
        let b = nl.add_net("b");
        let y = nl.add_net("y");
        nl.add_cell("u0", "AND2", &[("A", a), ("B", b)], &[("Y", y)])
            .unwrap();
        nl
    }

    #[test]
    fn and_gate_single_output_event() {
        let nl = and_netlist();
        let (a, b, y) = (
            nl.net_by_name("a").unwrap(),
            nl.net_by_name("b").unwrap(),
            nl.net_by_name("y").unwrap(),
        );
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 0).unwrap();
        engine.add_event(b, Logic::One, 0).unwrap();
        let summary = engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, y), vec![(0, Logic::One)]);
        assert_eq!(summary.timestamps, 1);
        assert_eq!(summary.final_time, Some(0));
        assert_eq!(engine.value(y), Logic::One);
    }

    #[test]
    fn unchanged_output_is_not_rescheduled() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let b = nl.net_by_name("b").unwrap();
        let y = nl.net_by_name("y").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::Zero, 0).unwrap();
        engine.add_event(b, Logic::Zero, 5).unwrap();
        engine.add_event(b, Logic::One, 10).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, y), vec![(0, Logic::Zero)]);
    }

    #[test]
    fn unknown_net_rejected() {
        let nl = and_netlist();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        let err = engine.add_event(NetId::from_raw(99), Logic::One, 0).unwrap_err();
        assert!(matches!(err, SimError::InvalidStimulus(StimulusError::UnknownNet(_))));
    }

    #[test]
    fn causality_enforced() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let b = nl.net_by_name("b").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 10).unwrap();
        engine.run_to_completion().unwrap();
        assert!(matches!(
            engine.add_event(a, Logic::Zero, 5),
            Err(SimError::InvalidStimulus(StimulusError::InThePast { time: 5, current: 10 }))
        ));
        assert!(matches!(
            engine.add_event(b, Logic::Zero, 9),
            Err(SimError::InvalidStimulus(StimulusError::InThePast { .. }))
        ));
        engine.add_event(a, Logic::Zero, 10).unwrap();
        engine.add_event(b, Logic::Zero, 20).unwrap();
    }

    #[test]
    fn pause_and_resume() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let b = nl.net_by_name("b").unwrap();
        let y = nl.net_by_name("y").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 0).unwrap();
        engine.add_event(b, Logic::One, 0).unwrap();
        engine.add_event(b, Logic::Zero, 50).unwrap();
        engine.run_until(20).unwrap();
        assert_eq!(engine.current_time(), Some(0));
        assert_eq!(engine.pending_events(), 1);
        engine.add_event(a, Logic::Zero, 30).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, y), vec![(0, Logic::One), (30, Logic::Zero)]);
    }

    #[test]
    fn self_loop_does_not_converge() {
        let mut nl = Netlist::with_standard_library("top");
        let n = nl.add_net("n");
        nl.add_cell("inv", "INV", &[("A", n)], &[("Y", n)]).unwrap();
        let config = EngineConfig {
            max_iterations: 50,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(&nl, config).unwrap();
        engine.add_event(n, Logic::Zero, 0).unwrap();
        match engine.run_to_completion().unwrap_err() {
            SimError::NonConvergence {
                time,
                iterations,
                gates,
                nets,
                cycles,
                cycle_nets,
            } => {
                assert_eq!(time, 0);
                assert_eq!(iterations, 50);
                assert_eq!(gates, vec!["inv"]);
                assert_eq!(nets, vec!["n"]);
                assert_eq!(cycles, vec![vec!["inv".to_string()]]);
                assert_eq!(cycle_nets, vec![vec!["n".to_string()]]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    fn dff_netlist() -> Netlist {
        let mut nl = Netlist::with_standard_library("top");
        let clk = nl.add_net("clk");
        let d = nl.add_net("d");
        let q = nl.add_net("q");
        let qn = nl.add_net("qn");
        nl.add_cell("ff", "DFF", &[("CLK", clk), ("D", d)], &[("Q", q), ("QN", qn)])
            .unwrap();
        nl
    }

    #[test]
    fn flip_flop_updates_on_rising_edge_only() {
        let nl = dff_netlist();
        let clk = nl.net_by_name("clk").unwrap();
        let d = nl.net_by_name("d").unwrap();
        let q = nl.net_by_name("q").unwrap();
        let qn = nl.net_by_name("qn").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(clk, Logic::Zero, 0).unwrap();
        engine.add_event(d, Logic::One, 5).unwrap();
        engine.add_event(clk, Logic::One, 10).unwrap();
        engine.add_event(d, Logic::Zero, 11).unwrap();
        engine.add_event(clk, Logic::Zero, 15).unwrap();
        engine.add_event(clk, Logic::One, 20).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, q), vec![(10, Logic::One), (20, Logic::Zero)]);
        assert_eq!(values(&engine, qn), vec![(10, Logic::Zero), (20, Logic::One)]);
    }

    #[test]
    fn clock_rising_out_of_unknown_samples() {
        let nl = dff_netlist();
        let clk = nl.net_by_name("clk").unwrap();
        let d = nl.net_by_name("d").unwrap();
        let q = nl.net_by_name("q").unwrap();
        let qn = nl.net_by_name("qn").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(d, Logic::One, 0).unwrap();
        engine.add_event(clk, Logic::One, 10).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, q), vec![(10, Logic::One)]);
        assert_eq!(values(&engine, qn), vec![(10, Logic::Zero)]);
    }

    #[test]
    fn clock_drives_flip_flop() {
        let nl = dff_netlist();
        let clk = nl.net_by_name("clk").unwrap();
        let d = nl.net_by_name("d").unwrap();
        let q = nl.net_by_name("q").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine
            .add_clock(ClockSpec {
                net: clk,
                period: 10,
                start_value: Logic::Zero,
                start_time: 0,
                duration: 40,
            })
            .unwrap();
        engine.add_event(d, Logic::One, 2).unwrap();
        engine.add_event(d, Logic::Zero, 22).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, q), vec![(5, Logic::One), (25, Logic::Zero)]);
        assert_eq!(engine.get_history(clk).len(), 8);
        assert_eq!(engine.current_time(), Some(35));
    }

    #[test]
    fn shift_register_samples_before_update() {
        let mut nl = Netlist::with_standard_library("top");
        let clk = nl.add_net("clk");
        let d = nl.add_net("d");
        let q0 = nl.add_net("q0");
        let q1 = nl.add_net("q1");
        nl.add_cell("ff0", "DFF", &[("CLK", clk), ("D", d)], &[("Q", q0)])
            .unwrap();
        nl.add_cell("ff1", "DFF", &[("CLK", clk), ("D", q0)], &[("Q", q1)])
            .unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.initialize_sequential(Logic::Zero, |_, _| true);
        engine.add_event(d, Logic::One, 0).unwrap();
        engine.add_event(clk, Logic::Zero, 0).unwrap();
        engine.add_event(clk, Logic::One, 10).unwrap();
        engine.add_event(clk, Logic::Zero, 15).unwrap();
        engine.add_event(clk, Logic::One, 20).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(engine.get_value(q0, 10), Logic::One);
        assert_eq!(engine.get_value(q1, 10), Logic::Zero);
        assert_eq!(engine.get_value(q1, 20), Logic::One);
    }

    #[test]
    fn initialize_respects_filter() {
        let nl = dff_netlist();
        let q = nl.net_by_name("q").unwrap();
        let qn = nl.net_by_name("qn").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        assert_eq!(engine.initialize_sequential(Logic::One, |_, ty| ty.name == "DFFR"), 0);
        assert_eq!(engine.initialize_sequential(Logic::One, |_, _| true), 1);
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, q), vec![(0, Logic::One)]);
        assert_eq!(values(&engine, qn), vec![(0, Logic::Zero)]);
    }

    #[test]
    fn constants_drive_at_time_zero() {
        let mut nl = Netlist::with_standard_library("top");
        let hi = nl.add_net("hi");
        let a = nl.add_net("a");
        let y = nl.add_net("y");
        nl.add_cell("vcc", "VCC", &[], &[("Y", hi)]).unwrap();
        nl.add_cell("u0", "AND2", &[("A", a), ("B", hi)], &[("Y", y)])
            .unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        assert_eq!(engine.pending_events(), 1);
        engine.add_event(a, Logic::One, 3).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, hi), vec![(0, Logic::One)]);
        assert_eq!(values(&engine, y), vec![(3, Logic::One)]);
    }

    #[test]
    fn reset_clears_progress() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 10).unwrap();
        engine.run_to_completion().unwrap();
        engine.reset();
        assert_eq!(engine.current_time(), None);
        assert_eq!(engine.log().event_count(), 0);
        assert_eq!(engine.get_value(a, 10), Logic::X);
        engine.add_event(a, Logic::Zero, 0).unwrap();
    }

    #[test]
    fn stop_handle_pauses_between_timestamps() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 0).unwrap();
        engine.add_event(a, Logic::Zero, 10).unwrap();
        let handle = engine.stop_handle();
        handle.stop();
        let summary = engine.run_to_completion().unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.timestamps, 0);
        assert!(!handle.is_stop_requested());
        let summary = engine.run_to_completion().unwrap();
        assert!(!summary.stopped);
        assert_eq!(summary.timestamps, 2);
    }

    #[test]
    fn step_and_run_for() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        for t in [0, 10, 20, 30] {
            engine.add_event(a, Logic::from_bool(t % 20 == 0), t).unwrap();
        }
        let step = engine.step().unwrap().unwrap();
        assert_eq!(step.time, 0);
        assert_eq!(step.events, 1);
        let summary = engine.run_for(15).unwrap();
        assert_eq!(summary.timestamps, 1);
        assert_eq!(summary.final_time, Some(10));
        engine.run_to_completion().unwrap();
        assert!(engine.step().unwrap().is_none());
    }

    #[test]
    fn run_for_advances_from_previous_horizon() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 0).unwrap();
        engine.add_event(a, Logic::Zero, 150).unwrap();
        engine.run_for(100).unwrap();
        assert_eq!(engine.current_time(), Some(0));
        assert_eq!(engine.simulated_until(), Some(100));
        let summary = engine.run_for(100).unwrap();
        assert_eq!(summary.final_time, Some(150));
        assert_eq!(engine.simulated_until(), Some(200));
        assert_eq!(engine.value(a), Logic::Zero);
        assert_eq!(engine.get_value(a, 150), Logic::Zero);
    }

    #[test]
    fn stimulus_before_horizon_rejected() {
        let nl = and_netlist();
        let b = nl.net_by_name("b").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.run_until(40).unwrap();
        assert_eq!(engine.current_time(), None);
        assert!(matches!(
            engine.add_event(b, Logic::One, 39),
            Err(SimError::InvalidStimulus(StimulusError::InThePast { time: 39, current: 40 }))
        ));
        engine.add_event(b, Logic::One, 40).unwrap();
        engine.reset();
        assert_eq!(engine.simulated_until(), None);
        engine.add_event(b, Logic::One, 0).unwrap();
    }

    #[test]
    fn stopped_run_keeps_horizon() {
        let nl = and_netlist();
        let a = nl.net_by_name("a").unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.add_event(a, Logic::One, 5).unwrap();
        engine.stop_handle().stop();
        assert!(engine.run_until(50).unwrap().stopped);
        assert_eq!(engine.simulated_until(), None);
        engine.add_event(a, Logic::Zero, 5).unwrap();
    }

    fn inverter_chain() -> Netlist {
        let mut nl = Netlist::with_standard_library("chain");
        let a = nl.add_net("a");
        let b = nl.add_net("b");
        let c = nl.add_net("c");
        let d = nl.add_net("d");
        nl.add_cell("u0", "INV", &[("A", a)], &[("Y", b)]).unwrap();
        nl.add_cell("u1", "INV", &[("A", b)], &[("Y", c)]).unwrap();
        nl.add_cell("u2", "BUF", &[("A", c)], &[("Y", d)]).unwrap();
        nl
    }

    #[test]
    fn boundary_nets_of_whole_netlist() {
        let nl = inverter_chain();
        let engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        assert_eq!(engine.input_nets(), vec![nl.net_by_name("a").unwrap()]);
        assert_eq!(engine.output_nets(), vec![nl.net_by_name("d").unwrap()]);
    }

    #[test]
    fn gate_subset_simulates_only_selected_gates() {
        let nl = inverter_chain();
        let net = |name: &str| nl.net_by_name(name).unwrap();
        let u1 = nl.gate_by_name("u1").unwrap();
        let mut engine = Engine::with_gates(&nl, &[u1, u1], EngineConfig::default()).unwrap();
        assert!(engine.cell(nl.gate_by_name("u0").unwrap()).is_none());
        assert_eq!(engine.input_nets(), vec![net("b")]);
        assert_eq!(engine.output_nets(), vec![net("c")]);
        engine.add_event(net("a"), Logic::Zero, 0).unwrap();
        engine.add_event(net("b"), Logic::One, 5).unwrap();
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, net("b")), vec![(5, Logic::One)]);
        assert_eq!(values(&engine, net("c")), vec![(5, Logic::Zero)]);
        assert!(values(&engine, net("d")).is_empty());
    }

    #[test]
    fn gate_subset_rejects_foreign_gate() {
        let nl = inverter_chain();
        let err = Engine::with_gates(&nl, &[GateId::from_raw(9)], EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, SimError::UnknownGate(g) if g == GateId::from_raw(9)));
    }

    #[test]
    fn restore_continues_a_recorded_run() {
        let nl = dff_netlist();
        let clk = nl.net_by_name("clk").unwrap();
        let d = nl.net_by_name("d").unwrap();
        let q = nl.net_by_name("q").unwrap();
        let clock = ClockSpec {
            net: clk,
            period: 10,
            start_value: Logic::Zero,
            start_time: 0,
            duration: 60,
        };

        let mut full = Engine::new(&nl, EngineConfig::default()).unwrap();
        full.add_clock(clock).unwrap();
        full.add_event(d, Logic::One, 2).unwrap();
        full.add_event(d, Logic::Zero, 32).unwrap();
        full.run_to_completion().unwrap();

        let mut first = Engine::new(&nl, EngineConfig::default()).unwrap();
        first.add_clock(clock).unwrap();
        first.add_event(d, Logic::One, 2).unwrap();
        first.run_until(20).unwrap();
        let saved = first.into_log();
        let last_id = saved.get_all_history().values().flatten().map(|e| e.id).max();

        let mut resumed = Engine::new(&nl, EngineConfig::default()).unwrap();
        resumed.add_clock(clock).unwrap();
        resumed.restore(saved).unwrap();
        assert_eq!(resumed.current_time(), Some(20));
        assert_eq!(resumed.next_time(), Some(25));
        assert_eq!(resumed.cell(nl.gate_by_name("ff").unwrap()).unwrap().state(), Logic::One);
        assert!(matches!(
            resumed.add_event(d, Logic::Zero, 19),
            Err(SimError::InvalidStimulus(StimulusError::InThePast { .. }))
        ));
        resumed.add_event(d, Logic::Zero, 32).unwrap();
        resumed.run_to_completion().unwrap();

        assert_eq!(values(&resumed, q), values(&full, q));
        assert_eq!(values(&resumed, clk), values(&full, clk));
        let first_new = resumed.get_history(d).last().map(|e| e.id);
        assert!(first_new > last_id);
    }

    #[test]
    fn restore_rejects_foreign_nets() {
        let nl = and_netlist();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        let mut state = EventLog::new();
        state.add_event(EventIdGenerator::new().event(NetId::from_raw(42), Logic::One, 0));
        assert!(matches!(
            engine.restore(state),
            Err(SimError::InvalidStimulus(StimulusError::UnknownNet(_)))
        ));
    }

    #[test]
    fn restore_of_empty_log_reschedules_constants() {
        let mut nl = Netlist::with_standard_library("top");
        let hi = nl.add_net("hi");
        nl.add_cell("vcc", "VCC", &[], &[("Y", hi)]).unwrap();
        let mut engine = Engine::new(&nl, EngineConfig::default()).unwrap();
        engine.run_to_completion().unwrap();
        engine.restore(EventLog::new()).unwrap();
        assert_eq!(engine.current_time(), None);
        assert_eq!(engine.pending_events(), 1);
        engine.run_to_completion().unwrap();
        assert_eq!(values(&engine, hi), vec![(0, Logic::One)]);
    }
}
