//! Flat gate-level netlist model consumed by the Strobe simulator.
//!
//! Gates, nets and gate types live in indexed tables ([`Arena`]) and refer to
//! each other by integer ids ([`GateId`], [`NetId`], [`GateTypeId`]), which
//! keeps the naturally cyclic netlist graph free of ownership cycles. Gate
//! behavior is a tagged variant ([`GateBehavior`]) with [`BoolExpr`] functions
//! evaluated in four-state logic.

#![warn(missing_docs)]

pub mod arena;
pub mod error;
pub mod function;
pub mod gate_type;
pub mod graph;
pub mod ids;
pub mod library;
pub mod netlist;

pub use arena::{Arena, ArenaId};
pub use error::NetlistError;
pub use function::BoolExpr;
pub use gate_type::{
    ClearPresetBehavior, GateBehavior, GateKind, GateType, SequentialSpec, Sensitivity,
};
pub use graph::GateGraph;
pub use ids::{GateId, GateTypeId, NetId};
pub use netlist::{Endpoint, Gate, Net, Netlist};
