//! The flat netlist: gate types, gates and nets in indexed tables.
//!
//! All relations are id lookups. A [`Gate`] stores, for each declared input
//! and output pin of its type, the [`NetId`] connected to it (if any). A
//! [`Net`] stores its single driving endpoint and its receiving endpoints.
//! The netlist is immutable during simulation and can be shared across
//! threads by reference.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::error::NetlistError;
use crate::gate_type::GateType;
use crate::ids::{GateId, GateTypeId, NetId};
use crate::library;

/// A pin on a specific gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// The gate owning the pin.
    pub gate: GateId,
    /// The pin name.
    pub pin: String,
}

/// A gate instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    /// This gate's id.
    pub id: GateId,
    /// Instance name.
    pub name: String,
    /// The gate's type.
    pub gate_type: GateTypeId,
    /// Net connected to each input pin, parallel to the type's `input_pins`.
    pub inputs: Vec<Option<NetId>>,
    /// Net connected to each output pin, parallel to the type's `output_pins`.
    pub outputs: Vec<Option<NetId>>,
}

/// A wire connecting one driving pin to any number of receiving pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// This net's id.
    pub id: NetId,
    /// Net name. Bus bits follow the `base[i]` convention.
    pub name: String,
    /// The output pin driving this net, if any.
    pub source: Option<Endpoint>,
    /// Input pins reading this net.
    pub destinations: Vec<Endpoint>,
}

/// A flat gate-level netlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    /// Design name, used as the waveform scope.
    pub name: String,
    gate_types: Arena<GateTypeId, GateType>,
    gates: Arena<GateId, Gate>,
    nets: Arena<NetId, Net>,
}

impl Netlist {
    /// Creates an empty netlist with no gate types.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an empty netlist with every cell of [`library::standard_cells`] registered.
    pub fn with_standard_library(name: impl Into<String>) -> Self {
        let mut netlist = Self::new(name);
        for cell in library::standard_cells() {
            netlist.gate_types.alloc(cell);
        }
        netlist
    }

    /// Registers a gate type after validating it.
    pub fn add_gate_type(&mut self, gate_type: GateType) -> Result<GateTypeId, NetlistError> {
        gate_type.validate()?;
        if self.gate_type_by_name(&gate_type.name).is_some() {
            return Err(NetlistError::DuplicateGateType(gate_type.name));
        }
        Ok(self.gate_types.alloc(gate_type))
    }

    /// Looks up a registered gate type by name.
    pub fn gate_type_by_name(&self, name: &str) -> Option<GateTypeId> {
        self.gate_types
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }

    /// Adds an unconnected net.
    pub fn add_net(&mut self, name: impl Into<String>) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.alloc(Net {
            id,
            name: name.into(),
            source: None,
            destinations: Vec::new(),
        })
    }

    /// Adds a gate of the given type with all pins unconnected.
    pub fn add_gate(
        &mut self,
        name: impl Into<String>,
        gate_type: GateTypeId,
    ) -> Result<GateId, NetlistError> {
        let ty = self
            .gate_types
            .try_get(gate_type)
            .ok_or_else(|| NetlistError::UnknownGateType(gate_type.to_string()))?;
        let id = GateId::from_raw(self.gates.len() as u32);
        let gate = Gate {
            id,
            name: name.into(),
            gate_type,
            inputs: vec![None; ty.input_pins.len()],
            outputs: vec![None; ty.output_pins.len()],
        };
        Ok(self.gates.alloc(gate))
    }

    /// Adds a gate by type name and wires the given `(pin, net)` pairs.
    pub fn add_cell(
        &mut self,
        name: impl Into<String>,
        type_name: &str,
        inputs: &[(&str, NetId)],
        outputs: &[(&str, NetId)],
    ) -> Result<GateId, NetlistError> {
        let ty = self
            .gate_type_by_name(type_name)
            .ok_or_else(|| NetlistError::UnknownGateType(type_name.to_string()))?;
        let gate = self.add_gate(name, ty)?;
        for (pin, net) in inputs {
            self.connect_input(gate, pin, *net)?;
        }
        for (pin, net) in outputs {
            self.connect_output(gate, pin, *net)?;
        }
        Ok(gate)
    }

    /// Connects `net` to input `pin` of `gate`.
    pub fn connect_input(&mut self, gate: GateId, pin: &str, net: NetId) -> Result<(), NetlistError> {
        self.check_net(net)?;
        let index = self.pin_index(gate, pin, "input")?;
        let g = self.gates.get_mut(gate);
        if let Some(old) = g.inputs[index].replace(net) {
            self.nets
                .get_mut(old)
                .destinations
                .retain(|ep| !(ep.gate == gate && ep.pin == pin));
        }
        self.nets.get_mut(net).destinations.push(Endpoint {
            gate,
            pin: pin.to_string(),
        });
        Ok(())
    }

    /// Connects output `pin` of `gate` to drive `net`.
    pub fn connect_output(&mut self, gate: GateId, pin: &str, net: NetId) -> Result<(), NetlistError> {
        self.check_net(net)?;
        let index = self.pin_index(gate, pin, "output")?;
        let n = self.nets.get(net);
        if let Some(existing) = &n.source {
            if existing.gate != gate || existing.pin != pin {
                return Err(NetlistError::MultipleDrivers {
                    net: n.name.clone(),
                    existing: existing.gate,
                });
            }
        }
        if let Some(old) = self.gates.get_mut(gate).outputs[index].replace(net) {
            self.nets.get_mut(old).source = None;
        }
        self.nets.get_mut(net).source = Some(Endpoint {
            gate,
            pin: pin.to_string(),
        });
        Ok(())
    }

    fn check_net(&self, net: NetId) -> Result<(), NetlistError> {
        if self.nets.contains(net) {
            Ok(())
        } else {
            Err(NetlistError::UnknownNet(net))
        }
    }

    fn pin_index(&self, gate: GateId, pin: &str, direction: &'static str) -> Result<usize, NetlistError> {
        let g = self
            .gates
            .try_get(gate)
            .ok_or(NetlistError::UnknownGate(gate))?;
        let ty = self.gate_types.get(g.gate_type);
        let index = if direction == "input" {
            ty.input_index(pin)
        } else {
            ty.output_index(pin)
        };
        index.ok_or_else(|| NetlistError::UnknownPin {
            gate: g.name.clone(),
            direction,
            pin: pin.to_string(),
        })
    }

    /// Returns the gate with the given id.
    pub fn gate(&self, id: GateId) -> &Gate {
        self.gates.get(id)
    }

    /// Returns the net with the given id.
    pub fn net(&self, id: NetId) -> &Net {
        self.nets.get(id)
    }

    /// Returns the gate type with the given id.
    pub fn gate_type(&self, id: GateTypeId) -> &GateType {
        self.gate_types.get(id)
    }

    /// Returns the type of a gate.
    pub fn type_of(&self, gate: GateId) -> &GateType {
        self.gate_types.get(self.gates.get(gate).gate_type)
    }

    /// Returns `true` if `net` belongs to this netlist.
    pub fn contains_net(&self, net: NetId) -> bool {
        self.nets.contains(net)
    }

    /// Returns `true` if `gate` belongs to this netlist.
    pub fn contains_gate(&self, gate: GateId) -> bool {
        self.gates.contains(gate)
    }

    /// Returns the net driving input `pin` of `gate`, if connected.
    pub fn input_net(&self, gate: GateId, pin: &str) -> Option<NetId> {
        let g = self.gates.get(gate);
        let index = self.gate_types.get(g.gate_type).input_index(pin)?;
        g.inputs[index]
    }

    /// Returns the net driven by output `pin` of `gate`, if connected.
    pub fn output_net(&self, gate: GateId, pin: &str) -> Option<NetId> {
        let g = self.gates.get(gate);
        let index = self.gate_types.get(g.gate_type).output_index(pin)?;
        g.outputs[index]
    }

    /// Finds a net by name.
    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.nets.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Finds a gate by name.
    pub fn gate_by_name(&self, name: &str) -> Option<GateId> {
        self.gates.iter().find(|(_, g)| g.name == name).map(|(id, _)| id)
    }

    /// Builds a name → net index for repeated lookups.
    pub fn net_name_index(&self) -> HashMap<&str, NetId> {
        self.nets.iter().map(|(id, n)| (n.name.as_str(), id)).collect()
    }

    /// Iterates over all gates in id order.
    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.values()
    }

    /// Iterates over all nets in id order.
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.values()
    }

    /// Iterates over all registered gate types.
    pub fn gate_types(&self) -> impl Iterator<Item = (GateTypeId, &GateType)> {
        self.gate_types.iter()
    }

    /// Returns the number of gates.
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Returns the number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Nets with no driving gate; these can only change through stimulus.
    pub fn global_inputs(&self) -> Vec<NetId> {
        self.nets
            .iter()
            .filter(|(_, n)| n.source.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Checks internal consistency of a netlist built outside the builder API.
    ///
    /// Every gate and net must carry the id of its table position, and every
    /// gate pin connection must be mirrored by the net's source or destination
    /// list (and the other way round).
    pub fn validate(&self) -> Result<(), NetlistError> {
        for (_, ty) in self.gate_types.iter() {
            ty.validate()?;
        }
        for (id, gate) in self.gates.iter() {
            if gate.id != id {
                return Err(NetlistError::IdMismatch {
                    table: "gate",
                    expected: id.to_string(),
                    found: gate.id.to_string(),
                });
            }
        }
        for (id, net) in self.nets.iter() {
            if net.id != id {
                return Err(NetlistError::IdMismatch {
                    table: "net",
                    expected: id.to_string(),
                    found: net.id.to_string(),
                });
            }
        }
        for gate in self.gates.values() {
            let ty = self
                .gate_types
                .try_get(gate.gate_type)
                .ok_or_else(|| NetlistError::UnknownGateType(gate.gate_type.to_string()))?;
            if gate.inputs.len() != ty.input_pins.len() || gate.outputs.len() != ty.output_pins.len() {
                return Err(NetlistError::PinCountMismatch {
                    gate: gate.name.clone(),
                    gate_type: ty.name.clone(),
                });
            }
            for (pin, net) in ty.input_pins.iter().zip(&gate.inputs) {
                if let Some(net) = net {
                    self.check_net(*net)?;
                    let n = self.nets.get(*net);
                    if !n.destinations.iter().any(|ep| ep.gate == gate.id && ep.pin == *pin) {
                        return Err(inconsistent(n, gate.name.clone(), pin));
                    }
                }
            }
            for (pin, net) in ty.output_pins.iter().zip(&gate.outputs) {
                if let Some(net) = net {
                    self.check_net(*net)?;
                    let n = self.nets.get(*net);
                    if !n.source.as_ref().is_some_and(|ep| ep.gate == gate.id && ep.pin == *pin) {
                        return Err(inconsistent(n, gate.name.clone(), pin));
                    }
                }
            }
        }
        for net in self.nets.values() {
            let endpoints = net
                .source
                .iter()
                .map(|ep| (ep, false))
                .chain(net.destinations.iter().map(|ep| (ep, true)));
            for (ep, is_input) in endpoints {
                if self.endpoint_net(ep, is_input) != Some(net.id) {
                    let gate = self
                        .gates
                        .try_get(ep.gate)
                        .map_or_else(|| ep.gate.to_string(), |g| g.name.clone());
                    return Err(inconsistent(net, gate, &ep.pin));
                }
            }
        }
        Ok(())
    }

    /// The net a gate connects to the endpoint's pin, if the gate and pin exist.
    fn endpoint_net(&self, ep: &Endpoint, is_input: bool) -> Option<NetId> {
        let gate = self.gates.try_get(ep.gate)?;
        let ty = self.gate_types.try_get(gate.gate_type)?;
        if is_input {
            gate.inputs.get(ty.input_index(&ep.pin)?).copied().flatten()
        } else {
            gate.outputs.get(ty.output_index(&ep.pin)?).copied().flatten()
        }
    }

    /// Serializes the netlist to a JSON snapshot.
    pub fn to_json(&self) -> Result<String, NetlistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads and validates a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, NetlistError> {
        let netlist: Netlist = serde_json::from_str(json)?;
        netlist.validate()?;
        Ok(netlist)
    }

    /// Loads and validates a JSON snapshot file.
    pub fn load(path: &Path) -> Result<Self, NetlistError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

fn inconsistent(net: &Net, gate: String, pin: &str) -> NetlistError {
    NetlistError::InconsistentConnection {
        net: net.name.clone(),
        gate,
        pin: pin.to_string(),
    }
}
