//! Per-gate evaluation state.
//!
//! A [`GateCell`] holds the last observed value of each input pin, the values
//! the gate last drove on its outputs, and for flip-flops and latches the
//! stored state. Cells are built once per gate when the engine is set up and
//! mutated in place as events arrive.

use strobe_common::Logic;
use strobe_netlist::{BoolExpr, GateBehavior, GateId, GateKind, GateType, NetId, Netlist, SequentialSpec};

use crate::error::SimError;
use crate::store::EventLog;

/// Evaluation state of one gate.
#[derive(Debug, Clone)]
pub struct GateCell<'a> {
    gate: GateId,
    name: &'a str,
    ty: &'a GateType,
    kind: GateKind,
    input_nets: Vec<Option<NetId>>,
    input_values: Vec<Logic>,
    output_nets: Vec<Option<NetId>>,
    outputs: Vec<Logic>,
    state: Logic,
    control: Option<usize>,
    armed: bool,
}

impl<'a> GateCell<'a> {
    /// Builds the cell for `gate`, resolving each input pin to its driving net.
    ///
    /// Fails if a sequential gate's control pin is not declared by its type
    /// or is left unconnected.
    pub fn new(netlist: &'a Netlist, gate: GateId) -> Result<Self, SimError> {
        let g = netlist.gate(gate);
        let ty = netlist.gate_type(g.gate_type);
        let control = match ty.sequential() {
            Some(spec) => {
                let unresolved = |reason: &str| SimError::UnresolvedConfiguration {
                    gate: g.name.clone(),
                    pin: spec.control.clone(),
                    reason: reason.to_string(),
                };
                let index = ty
                    .input_index(&spec.control)
                    .ok_or_else(|| unresolved("is not an input pin of its gate type"))?;
                if g.inputs[index].is_none() {
                    return Err(unresolved("is not connected"));
                }
                Some(index)
            }
            None => None,
        };
        Ok(Self {
            gate,
            name: &g.name,
            ty,
            kind: ty.kind(),
            input_nets: g.inputs.clone(),
            input_values: vec![Logic::X; ty.input_pins.len()],
            output_nets: g.outputs.clone(),
            outputs: vec![Logic::X; ty.output_pins.len()],
            state: Logic::X,
            control,
            armed: false,
        })
    }

    /// The gate this cell evaluates.
    pub fn gate(&self) -> GateId {
        self.gate
    }

    /// The gate's instance name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The gate's evaluation family.
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// Input pin names in declaration order.
    pub fn input_pins(&self) -> &'a [String] {
        &self.ty.input_pins
    }

    /// Net connected to each input pin.
    pub fn input_nets(&self) -> &[Option<NetId>] {
        &self.input_nets
    }

    /// Net connected to each output pin.
    pub fn output_nets(&self) -> &[Option<NetId>] {
        &self.output_nets
    }

    /// Last observed value of an input pin; `X` for unknown or never-driven pins.
    pub fn input_value(&self, pin: &str) -> Logic {
        self.ty
            .input_index(pin)
            .map_or(Logic::X, |i| self.input_values[i])
    }

    /// Values most recently driven on each output pin.
    pub fn outputs(&self) -> &[Logic] {
        &self.outputs
    }

    /// Stored state of a flip-flop or latch.
    pub fn state(&self) -> Logic {
        self.state
    }

    /// Whether a qualifying clock edge is waiting to be sampled.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Records a new value on input `pin`. Returns `true` if the value changed.
    pub fn observe(&mut self, pin: &str, value: Logic) -> bool {
        match self.ty.input_index(pin) {
            Some(index) => self.observe_index(index, value),
            None => false,
        }
    }

    pub(crate) fn observe_index(&mut self, index: usize, value: Logic) -> bool {
        let previous = std::mem::replace(&mut self.input_values[index], value);
        if previous == value {
            return false;
        }
        if self.control == Some(index) && self.kind == GateKind::FlipFlop {
            if let Some(spec) = self.ty.sequential() {
                if spec.sensitivity.is_triggering_edge(previous, value) {
                    self.armed = true;
                }
            }
        }
        true
    }

    fn lookup(&self, pin: &str) -> Logic {
        self.ty
            .input_index(pin)
            .map_or(Logic::X, |i| self.input_values[i])
    }

    /// Computes the value of every output pin from the current inputs and state.
    pub fn evaluate(&self) -> Vec<(&'a str, Logic)> {
        self.ty
            .output_pins
            .iter()
            .map(String::as_str)
            .zip(self.next_outputs())
            .collect()
    }

    /// Output values parallel to the type's output pins.
    pub(crate) fn next_outputs(&self) -> Vec<Logic> {
        let mut values = vec![Logic::X; self.outputs.len()];
        match &self.ty.behavior {
            GateBehavior::Combinational { functions } => {
                let lookup = |pin: &str| self.lookup(pin);
                for (pin, expr) in functions {
                    if let Some(i) = self.ty.output_index(pin) {
                        values[i] = expr.evaluate(&lookup);
                    }
                }
            }
            GateBehavior::Sequential(spec) => {
                self.drive_state(spec, &mut values);
            }
            GateBehavior::Constant(value) => values.fill(*value),
        }
        values
    }

    fn drive_state(&self, spec: &SequentialSpec, values: &mut [Logic]) {
        for pin in &spec.state_outputs {
            if let Some(i) = self.ty.output_index(pin) {
                values[i] = self.state;
            }
        }
        for pin in &spec.inverted_outputs {
            if let Some(i) = self.ty.output_index(pin) {
                values[i] = self.state.toggle();
            }
        }
    }

    /// The state forced by active asynchronous clear/preset inputs, if any.
    fn async_override(&self, spec: &SequentialSpec) -> Option<Logic> {
        let lookup = |pin: &str| self.lookup(pin);
        let active =
            |expr: &Option<BoolExpr>| expr.as_ref().is_some_and(|e| e.evaluate(&lookup) == Logic::One);
        match (active(&spec.clear), active(&spec.preset)) {
            (true, true) => Some(spec.clear_preset.apply(self.state)),
            (true, false) => Some(Logic::Zero),
            (false, true) => Some(Logic::One),
            (false, false) => None,
        }
    }

    /// Applies the level-sensitive behavior of a sequential cell after its
    /// inputs changed: asynchronous clear/preset for both families, and data
    /// transparency for latches at their active enable level.
    pub(crate) fn apply_levels(&mut self) {
        let Some(spec) = self.ty.sequential() else {
            return;
        };
        if let Some(forced) = self.async_override(spec) {
            self.state = forced;
            return;
        }
        if self.kind == GateKind::Latch {
            let enable = self.control.map_or(Logic::X, |i| self.input_values[i]);
            if spec.sensitivity.is_active_level(enable) {
                let lookup = |pin: &str| self.lookup(pin);
                let next = spec.data.evaluate(&lookup);
                self.state = next;
            }
        }
    }

    /// Samples the data input of an armed flip-flop. Active asynchronous
    /// inputs take precedence over the edge.
    pub(crate) fn clock(&mut self) {
        self.armed = false;
        let Some(spec) = self.ty.sequential() else {
            return;
        };
        let next = match self.async_override(spec) {
            Some(forced) => forced,
            None => {
                let lookup = |pin: &str| self.lookup(pin);
                spec.data.evaluate(&lookup)
            }
        };
        self.state = next;
    }

    /// Sets the stored state directly.
    pub(crate) fn set_state(&mut self, value: Logic) {
        self.state = value;
    }

    /// Returns every input, output and the state to `X`.
    pub(crate) fn reset(&mut self) {
        self.input_values.fill(Logic::X);
        self.outputs.fill(Logic::X);
        self.state = Logic::X;
        self.armed = false;
    }

    /// Rebuilds the cell from the last recorded value of each connected net.
    /// A flip-flop or latch takes its state from its first recorded state
    /// output, or else from the complement of an inverted output.
    pub(crate) fn restore(&mut self, log: &EventLog) {
        self.reset();
        let last = |net: &Option<NetId>| net.and_then(|n| log.last_value(n)).unwrap_or(Logic::X);
        for (value, net) in self.input_values.iter_mut().zip(&self.input_nets) {
            *value = last(net);
        }
        for (value, net) in self.outputs.iter_mut().zip(&self.output_nets) {
            *value = last(net);
        }
        let Some(spec) = self.ty.sequential() else {
            return;
        };
        let recorded = |pin: &String| {
            self.ty
                .output_index(pin)
                .and_then(|i| self.output_nets[i])
                .and_then(|n| log.last_value(n))
        };
        let state = spec
            .state_outputs
            .iter()
            .find_map(recorded)
            .or_else(|| spec.inverted_outputs.iter().find_map(recorded).map(Logic::toggle));
        self.state = state.unwrap_or(Logic::X);
    }

    /// Compares `next` with the last driven outputs, records the new values
    /// and returns `(net, value)` for every connected output that changed, in
    /// output pin order.
    pub(crate) fn commit_outputs(&mut self, next: Vec<Logic>) -> Vec<(NetId, Logic)> {
        let mut changes = Vec::new();
        for (i, value) in next.into_iter().enumerate() {
            if self.outputs[i] != value {
                self.outputs[i] = value;
                if let Some(net) = self.output_nets[i] {
                    changes.push((net, value));
                }
            }
        }
        changes
    }
}
