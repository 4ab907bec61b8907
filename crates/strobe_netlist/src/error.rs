//! Errors raised while building or loading a netlist.

use crate::ids::{GateId, NetId};

/// Errors that can occur while constructing or loading a [`Netlist`](crate::Netlist).
#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    /// A gate type's behavior refers to a pin it does not declare.
    #[error("gate type '{gate_type}' references undeclared pin '{pin}'")]
    UndeclaredPin {
        /// The gate type name.
        gate_type: String,
        /// The offending pin name.
        pin: String,
    },

    /// A connection named a pin the gate's type does not have.
    #[error("gate '{gate}' has no {direction} pin '{pin}'")]
    UnknownPin {
        /// The gate name.
        gate: String,
        /// `"input"` or `"output"`.
        direction: &'static str,
        /// The offending pin name.
        pin: String,
    },

    /// A gate's connection lists do not match its type's pin lists.
    #[error("gate '{gate}' does not match the pin layout of type '{gate_type}'")]
    PinCountMismatch {
        /// The gate name.
        gate: String,
        /// The gate type name.
        gate_type: String,
    },

    /// A second output pin was connected to an already-driven net.
    #[error("net '{net}' is already driven by gate {existing}")]
    MultipleDrivers {
        /// The net name.
        net: String,
        /// The gate already driving the net.
        existing: GateId,
    },

    /// A gate type name was not registered.
    #[error("unknown gate type '{0}'")]
    UnknownGateType(String),

    /// A gate type with the same name is already registered.
    #[error("gate type '{0}' is already registered")]
    DuplicateGateType(String),

    /// A net id does not belong to this netlist.
    #[error("net {0} does not exist")]
    UnknownNet(NetId),

    /// A gate id does not belong to this netlist.
    #[error("gate {0} does not exist")]
    UnknownGate(GateId),

    /// A stored gate or net carries an id other than its table position.
    #[error("{table} stored as {expected} carries id {found}")]
    IdMismatch {
        /// `"gate"` or `"net"`.
        table: &'static str,
        /// Id implied by the table position.
        expected: String,
        /// Id recorded in the entry.
        found: String,
    },

    /// A net's endpoints and a gate's pin connections disagree.
    #[error("net '{net}' and gate '{gate}' disagree about pin '{pin}'")]
    InconsistentConnection {
        /// The net name.
        net: String,
        /// The gate name, or its id if the gate does not exist.
        gate: String,
        /// The pin name.
        pin: String,
    },

    /// A netlist snapshot could not be read or written.
    #[error("invalid netlist snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A snapshot file could not be read.
    #[error("failed to read netlist snapshot: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pin_display() {
        let e = NetlistError::UnknownPin {
            gate: "u1".into(),
            direction: "input",
            pin: "C".into(),
        };
        assert_eq!(e.to_string(), "gate 'u1' has no input pin 'C'");
    }

    #[test]
    fn multiple_drivers_display() {
        let e = NetlistError::MultipleDrivers {
            net: "y".into(),
            existing: GateId::from_raw(3),
        };
        assert_eq!(e.to_string(), "net 'y' is already driven by gate g3");
    }

    #[test]
    fn unknown_net_display() {
        assert_eq!(
            NetlistError::UnknownNet(NetId::from_raw(9)).to_string(),
            "net n9 does not exist"
        );
    }
}
