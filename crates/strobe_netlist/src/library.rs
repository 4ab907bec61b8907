//! A small standard cell library.
//!
//! Pin naming follows common Liberty conventions: data inputs `A`, `B`, `C`, …,
//! combinational output `Y`, flip-flop clock `CLK`, latch enable `EN`, data `D`,
//! asynchronous clear `R`, state outputs `Q` / `QN`.

use strobe_common::Logic;

use crate::function::BoolExpr;
use crate::gate_type::{ClearPresetBehavior, GateBehavior, GateType, SequentialSpec, Sensitivity};

fn input_names(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| char::from(b'A' + i as u8).to_string())
        .collect()
}

fn combinational(name: String, inputs: Vec<String>, function: BoolExpr) -> GateType {
    GateType {
        name,
        input_pins: inputs,
        output_pins: vec!["Y".into()],
        behavior: GateBehavior::Combinational {
            functions: vec![("Y".into(), function)],
        },
    }
}

fn nary(prefix: &str, n: usize, build: fn(Vec<BoolExpr>) -> BoolExpr) -> GateType {
    assert!((1..=26).contains(&n), "gate arity must be between 1 and 26");
    let inputs = input_names(n);
    let vars = inputs.iter().map(BoolExpr::var).collect();
    combinational(format!("{prefix}{n}"), inputs, build(vars))
}

/// Non-inverting buffer `Y = A`.
pub fn buf() -> GateType {
    combinational("BUF".into(), input_names(1), BoolExpr::var("A"))
}

/// Inverter `Y = !A`.
pub fn inv() -> GateType {
    combinational("INV".into(), input_names(1), BoolExpr::not(BoolExpr::var("A")))
}

/// `n`-input AND, named `AND<n>`.
pub fn and(n: usize) -> GateType {
    nary("AND", n, BoolExpr::And)
}

/// `n`-input OR, named `OR<n>`.
pub fn or(n: usize) -> GateType {
    nary("OR", n, BoolExpr::Or)
}

/// `n`-input NAND, named `NAND<n>`.
pub fn nand(n: usize) -> GateType {
    nary("NAND", n, |ops| BoolExpr::not(BoolExpr::And(ops)))
}

/// `n`-input NOR, named `NOR<n>`.
pub fn nor(n: usize) -> GateType {
    nary("NOR", n, |ops| BoolExpr::not(BoolExpr::Or(ops)))
}

/// `n`-input XOR, named `XOR<n>`.
pub fn xor(n: usize) -> GateType {
    nary("XOR", n, BoolExpr::Xor)
}

/// `n`-input XNOR, named `XNOR<n>`.
pub fn xnor(n: usize) -> GateType {
    nary("XNOR", n, |ops| BoolExpr::not(BoolExpr::Xor(ops)))
}

/// Two-way multiplexer `Y = S ? B : A`.
pub fn mux2() -> GateType {
    let function = BoolExpr::Or(vec![
        BoolExpr::And(vec![BoolExpr::not(BoolExpr::var("S")), BoolExpr::var("A")]),
        BoolExpr::and_of(&["S", "B"]),
    ]);
    combinational(
        "MUX2".into(),
        vec!["A".into(), "B".into(), "S".into()],
        function,
    )
}

/// Half adder with sum `S = A ^ B` and carry `CO = A & B`.
pub fn half_adder() -> GateType {
    GateType {
        name: "HA".into(),
        input_pins: input_names(2),
        output_pins: vec!["S".into(), "CO".into()],
        behavior: GateBehavior::Combinational {
            functions: vec![
                ("S".into(), BoolExpr::xor_of(&["A", "B"])),
                ("CO".into(), BoolExpr::and_of(&["A", "B"])),
            ],
        },
    }
}

fn flip_flop(name: &str, sensitivity: Sensitivity, clear: bool) -> GateType {
    let mut inputs = vec!["CLK".to_string(), "D".to_string()];
    if clear {
        inputs.push("R".into());
    }
    GateType {
        name: name.into(),
        input_pins: inputs,
        output_pins: vec!["Q".into(), "QN".into()],
        behavior: GateBehavior::Sequential(SequentialSpec {
            control: "CLK".into(),
            sensitivity,
            data: BoolExpr::var("D"),
            clear: clear.then(|| BoolExpr::var("R")),
            preset: None,
            clear_preset: ClearPresetBehavior::Zero,
            state_outputs: vec!["Q".into()],
            inverted_outputs: vec!["QN".into()],
        }),
    }
}

/// Rising-edge D flip-flop.
pub fn dff() -> GateType {
    flip_flop("DFF", Sensitivity::Rising, false)
}

/// Falling-edge D flip-flop.
pub fn dff_negedge() -> GateType {
    flip_flop("DFFN", Sensitivity::Falling, false)
}

/// Rising-edge D flip-flop with active-high asynchronous clear `R`.
pub fn dffr() -> GateType {
    flip_flop("DFFR", Sensitivity::Rising, true)
}

/// Active-high transparent D latch.
pub fn dlatch() -> GateType {
    GateType {
        name: "DLATCH".into(),
        input_pins: vec!["EN".into(), "D".into()],
        output_pins: vec!["Q".into(), "QN".into()],
        behavior: GateBehavior::Sequential(SequentialSpec {
            control: "EN".into(),
            sensitivity: Sensitivity::High,
            data: BoolExpr::var("D"),
            clear: None,
            preset: None,
            clear_preset: ClearPresetBehavior::Unknown,
            state_outputs: vec!["Q".into()],
            inverted_outputs: vec!["QN".into()],
        }),
    }
}

/// Constant `0` driver.
pub fn gnd() -> GateType {
    constant("GND", Logic::Zero)
}

/// Constant `1` driver.
pub fn vcc() -> GateType {
    constant("VCC", Logic::One)
}

fn constant(name: &str, value: Logic) -> GateType {
    GateType {
        name: name.into(),
        input_pins: Vec::new(),
        output_pins: vec!["Y".into()],
        behavior: GateBehavior::Constant(value),
    }
}

/// Every cell of the standard library, with 2- and 3-input variants of the
/// basic gates.
pub fn standard_cells() -> Vec<GateType> {
    let mut cells = vec![buf(), inv()];
    for n in [2, 3] {
        cells.extend([and(n), or(n), nand(n), nor(n), xor(n), xnor(n)]);
    }
    cells.extend([
        mux2(),
        half_adder(),
        dff(),
        dff_negedge(),
        dffr(),
        dlatch(),
        gnd(),
        vcc(),
    ]);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn eval(ty: &GateType, inputs: &[(&str, Logic)]) -> Logic {
        let map: HashMap<&str, Logic> = inputs.iter().copied().collect();
        match &ty.behavior {
            GateBehavior::Combinational { functions } => functions[0]
                .1
                .evaluate(&|pin| map.get(pin).copied().unwrap_or(Logic::X)),
            _ => panic!("not combinational"),
        }
    }

    #[test]
    fn names_are_unique() {
        let cells = standard_cells();
        let names: HashSet<_> = cells.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names.len(), cells.len());
    }

    #[test]
    fn nary_pin_names() {
        assert_eq!(and(3).input_pins, vec!["A", "B", "C"]);
        assert_eq!(and(3).name, "AND3");
    }

    #[test]
    fn nand_and_nor() {
        use Logic::*;
        assert_eq!(eval(&nand(2), &[("A", One), ("B", One)]), Zero);
        assert_eq!(eval(&nor(2), &[("A", Zero), ("B", Zero)]), One);
        assert_eq!(eval(&xnor(2), &[("A", One), ("B", Zero)]), Zero);
    }

    #[test]
    fn mux_selects() {
        use Logic::*;
        let m = mux2();
        assert_eq!(eval(&m, &[("A", One), ("B", Zero), ("S", Zero)]), One);
        assert_eq!(eval(&m, &[("A", One), ("B", Zero), ("S", One)]), Zero);
        assert_eq!(eval(&m, &[("A", One), ("B", Zero), ("S", X)]), X);
    }

    #[test]
    fn dffr_has_clear() {
        let spec = dffr().sequential().cloned().unwrap();
        assert_eq!(spec.clear, Some(BoolExpr::var("R")));
        assert_eq!(spec.control, "CLK");
    }
}
