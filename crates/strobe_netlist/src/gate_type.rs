//! Gate type definitions: pin lists plus one behavior per gate family.
//!
//! A [`GateType`] is shared by every [`Gate`](crate::netlist::Gate) instance of
//! that type. Its [`GateBehavior`] is a tagged variant over the families the
//! simulator knows how to evaluate: purely combinational functions, clocked or
//! level-sensitive sequential elements, and constant drivers (GND/VCC).

use serde::{Deserialize, Serialize};
use strobe_common::Logic;

use crate::error::NetlistError;
use crate::function::BoolExpr;

/// What kind of control transition makes a sequential element update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// Flip-flop sampling on a `0 -> 1` transition.
    Rising,
    /// Flip-flop sampling on a `1 -> 0` transition.
    Falling,
    /// Flip-flop sampling on either binary transition.
    Both,
    /// Latch transparent while the control pin is `1`.
    High,
    /// Latch transparent while the control pin is `0`.
    Low,
}

impl Sensitivity {
    /// Returns `true` for the edge-triggered (flip-flop) sensitivities.
    pub fn is_edge(self) -> bool {
        matches!(
            self,
            Sensitivity::Rising | Sensitivity::Falling | Sensitivity::Both
        )
    }

    /// Returns `true` if moving the control pin from `prev` to `curr` is a
    /// qualifying edge. A rising edge is any change that lands on `1`
    /// (including `X -> 1` and `Z -> 1`), a falling edge any change that lands
    /// on `0`. Changes that land on `X`/`Z` never qualify.
    pub fn is_triggering_edge(self, prev: Logic, curr: Logic) -> bool {
        if prev == curr {
            return false;
        }
        match self {
            Sensitivity::Rising => curr == Logic::One,
            Sensitivity::Falling => curr == Logic::Zero,
            Sensitivity::Both => curr.is_binary(),
            Sensitivity::High | Sensitivity::Low => false,
        }
    }

    /// For level sensitivities, whether `level` makes the element transparent.
    pub fn is_active_level(self, level: Logic) -> bool {
        match self {
            Sensitivity::High => level == Logic::One,
            Sensitivity::Low => level == Logic::Zero,
            _ => false,
        }
    }
}

/// What the state becomes when clear and preset are asserted together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPresetBehavior {
    /// State is forced to `0`.
    Zero,
    /// State is forced to `1`.
    One,
    /// State keeps its previous value.
    Hold,
    /// State is inverted.
    Toggle,
    /// State becomes unknown.
    #[default]
    Unknown,
}

impl ClearPresetBehavior {
    /// Applies the behavior to the previous state.
    pub fn apply(self, previous: Logic) -> Logic {
        match self {
            ClearPresetBehavior::Zero => Logic::Zero,
            ClearPresetBehavior::One => Logic::One,
            ClearPresetBehavior::Hold => previous,
            ClearPresetBehavior::Toggle => previous.toggle(),
            ClearPresetBehavior::Unknown => Logic::X,
        }
    }
}

/// Behavior of a flip-flop or latch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialSpec {
    /// The clock (flip-flop) or enable (latch) input pin.
    pub control: String,
    /// Edge or level the control pin responds to.
    pub sensitivity: Sensitivity,
    /// Next-state function sampled on a qualifying edge or while transparent.
    pub data: BoolExpr,
    /// Asynchronous clear condition, active when it evaluates to `1`.
    #[serde(default)]
    pub clear: Option<BoolExpr>,
    /// Asynchronous preset condition, active when it evaluates to `1`.
    #[serde(default)]
    pub preset: Option<BoolExpr>,
    /// Resolution when clear and preset are active at once.
    #[serde(default)]
    pub clear_preset: ClearPresetBehavior,
    /// Output pins driven with the state.
    pub state_outputs: Vec<String>,
    /// Output pins driven with the inverted state.
    #[serde(default)]
    pub inverted_outputs: Vec<String>,
}

/// The evaluation family of a gate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateBehavior {
    /// One Boolean function per output pin, in output evaluation order.
    Combinational {
        /// `(output pin, function)` pairs.
        functions: Vec<(String, BoolExpr)>,
    },
    /// A flip-flop or latch.
    Sequential(SequentialSpec),
    /// Drives a fixed value on every output (GND/VCC cells).
    Constant(Logic),
}

/// Coarse classification used by the simulator to pick an evaluation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// Output is a pure function of the inputs.
    Combinational,
    /// Edge-triggered storage element.
    FlipFlop,
    /// Level-sensitive storage element.
    Latch,
    /// Fixed-value driver.
    Constant,
}

/// A gate type: its ordered pins and behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateType {
    /// Library name (e.g. `AND2`, `DFF`).
    pub name: String,
    /// Input pin names in declaration order.
    pub input_pins: Vec<String>,
    /// Output pin names in declaration order.
    pub output_pins: Vec<String>,
    /// How outputs are computed.
    pub behavior: GateBehavior,
}

impl GateType {
    /// Returns the evaluation family of this type.
    pub fn kind(&self) -> GateKind {
        match &self.behavior {
            GateBehavior::Combinational { .. } => GateKind::Combinational,
            GateBehavior::Sequential(spec) if spec.sensitivity.is_edge() => GateKind::FlipFlop,
            GateBehavior::Sequential(_) => GateKind::Latch,
            GateBehavior::Constant(_) => GateKind::Constant,
        }
    }

    /// Returns `true` for flip-flops and latches.
    pub fn is_sequential(&self) -> bool {
        matches!(self.behavior, GateBehavior::Sequential(_))
    }

    /// Returns the sequential description, if this is a flip-flop or latch.
    pub fn sequential(&self) -> Option<&SequentialSpec> {
        match &self.behavior {
            GateBehavior::Sequential(spec) => Some(spec),
            _ => None,
        }
    }

    /// Position of `pin` among the input pins.
    pub fn input_index(&self, pin: &str) -> Option<usize> {
        self.input_pins.iter().position(|p| p == pin)
    }

    /// Position of `pin` among the output pins.
    pub fn output_index(&self, pin: &str) -> Option<usize> {
        self.output_pins.iter().position(|p| p == pin)
    }

    /// Checks that every pin referenced by the behavior is declared.
    ///
    /// The control pin of a sequential type is not checked; the simulator
    /// reports it as an unresolved configuration when the gate is set up.
    pub fn validate(&self) -> Result<(), NetlistError> {
        let check_input = |expr: &BoolExpr| -> Result<(), NetlistError> {
            for var in expr.variables() {
                if self.input_index(var).is_none() {
                    return Err(NetlistError::UndeclaredPin {
                        gate_type: self.name.clone(),
                        pin: var.to_string(),
                    });
                }
            }
            Ok(())
        };
        let check_output = |pin: &str| -> Result<(), NetlistError> {
            match self.output_index(pin) {
                Some(_) => Ok(()),
                None => Err(NetlistError::UndeclaredPin {
                    gate_type: self.name.clone(),
                    pin: pin.to_string(),
                }),
            }
        };

        match &self.behavior {
            GateBehavior::Combinational { functions } => {
                for (pin, expr) in functions {
                    check_output(pin)?;
                    check_input(expr)?;
                }
            }
            GateBehavior::Sequential(spec) => {
                check_input(&spec.data)?;
                for expr in spec.clear.iter().chain(spec.preset.iter()) {
                    check_input(expr)?;
                }
                for pin in spec.state_outputs.iter().chain(&spec.inverted_outputs) {
                    check_output(pin)?;
                }
            }
            GateBehavior::Constant(_) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library;

    #[test]
    fn kinds_of_library_cells() {
        assert_eq!(library::and(2).kind(), GateKind::Combinational);
        assert_eq!(library::dff().kind(), GateKind::FlipFlop);
        assert_eq!(library::dlatch().kind(), GateKind::Latch);
        assert_eq!(library::vcc().kind(), GateKind::Constant);
    }

    #[test]
    fn rising_edge_detection() {
        let s = Sensitivity::Rising;
        assert!(s.is_triggering_edge(Logic::Zero, Logic::One));
        assert!(!s.is_triggering_edge(Logic::One, Logic::Zero));
        assert!(s.is_triggering_edge(Logic::X, Logic::One));
        assert!(s.is_triggering_edge(Logic::Z, Logic::One));
        assert!(!s.is_triggering_edge(Logic::One, Logic::One));
        assert!(!s.is_triggering_edge(Logic::Zero, Logic::X));
    }

    #[test]
    fn falling_and_both_edges() {
        assert!(Sensitivity::Falling.is_triggering_edge(Logic::One, Logic::Zero));
        assert!(!Sensitivity::Falling.is_triggering_edge(Logic::Zero, Logic::One));
        assert!(Sensitivity::Both.is_triggering_edge(Logic::Zero, Logic::One));
        assert!(Sensitivity::Both.is_triggering_edge(Logic::One, Logic::Zero));
        assert!(Sensitivity::Falling.is_triggering_edge(Logic::X, Logic::Zero));
        assert!(Sensitivity::Both.is_triggering_edge(Logic::Z, Logic::Zero));
        assert!(!Sensitivity::Both.is_triggering_edge(Logic::One, Logic::Z));
        assert!(!Sensitivity::Both.is_triggering_edge(Logic::Zero, Logic::Zero));
    }

    #[test]
    fn levels_are_not_edges() {
        assert!(!Sensitivity::High.is_edge());
        assert!(Sensitivity::High.is_active_level(Logic::One));
        assert!(!Sensitivity::High.is_active_level(Logic::X));
        assert!(Sensitivity::Low.is_active_level(Logic::Zero));
        assert!(!Sensitivity::Rising.is_active_level(Logic::One));
    }

    #[test]
    fn clear_preset_resolution() {
        assert_eq!(ClearPresetBehavior::Zero.apply(Logic::One), Logic::Zero);
        assert_eq!(ClearPresetBehavior::One.apply(Logic::Zero), Logic::One);
        assert_eq!(ClearPresetBehavior::Hold.apply(Logic::One), Logic::One);
        assert_eq!(ClearPresetBehavior::Toggle.apply(Logic::One), Logic::Zero);
        assert_eq!(ClearPresetBehavior::Unknown.apply(Logic::One), Logic::X);
    }

    #[test]
    fn validate_rejects_undeclared_input() {
        let ty = GateType {
            name: "BROKEN".into(),
            input_pins: vec!["A".into()],
            output_pins: vec!["Y".into()],
            behavior: GateBehavior::Combinational {
                functions: vec![("Y".into(), BoolExpr::and_of(&["A", "B"]))],
            },
        };
        let err = ty.validate().unwrap_err();
        assert!(matches!(err, NetlistError::UndeclaredPin { ref pin, .. } if pin == "B"));
    }

    #[test]
    fn validate_rejects_undeclared_output() {
        let mut ty = library::dff();
        if let GateBehavior::Sequential(spec) = &mut ty.behavior {
            spec.state_outputs.push("Q2".into());
        }
        assert!(ty.validate().is_err());
    }

    #[test]
    fn library_cells_validate() {
        for ty in library::standard_cells() {
            ty.validate().unwrap();
        }
    }

    #[test]
    fn pin_indices() {
        let ty = library::mux2();
        assert_eq!(ty.input_index("S"), Some(2));
        assert_eq!(ty.output_index("Y"), Some(0));
        assert_eq!(ty.input_index("Q"), None);
    }
}
