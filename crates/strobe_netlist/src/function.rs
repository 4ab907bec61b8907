//! Boolean functions over gate pins, evaluated in four-state logic.
//!
//! A [`BoolExpr`] is the behavioral description attached to a gate type's
//! output pins (and to the data/clear/preset inputs of sequential types).
//! Evaluation takes an assignment from pin name to [`Logic`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strobe_common::Logic;

/// A Boolean expression whose variables are input pin names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolExpr {
    /// A constant value.
    Const(Logic),
    /// The value currently on the named input pin.
    Var(String),
    /// Logical negation.
    Not(Box<BoolExpr>),
    /// Conjunction of all operands (`One` when empty).
    And(Vec<BoolExpr>),
    /// Disjunction of all operands (`Zero` when empty).
    Or(Vec<BoolExpr>),
    /// Parity of all operands (`Zero` when empty).
    Xor(Vec<BoolExpr>),
}

impl BoolExpr {
    /// Creates a pin reference.
    pub fn var(pin: impl Into<String>) -> Self {
        BoolExpr::Var(pin.into())
    }

    /// Negates an expression.
    pub fn not(expr: BoolExpr) -> Self {
        BoolExpr::Not(Box::new(expr))
    }

    /// Conjunction of the named pins.
    pub fn and_of(pins: &[&str]) -> Self {
        BoolExpr::And(pins.iter().map(|p| BoolExpr::var(*p)).collect())
    }

    /// Disjunction of the named pins.
    pub fn or_of(pins: &[&str]) -> Self {
        BoolExpr::Or(pins.iter().map(|p| BoolExpr::var(*p)).collect())
    }

    /// Parity of the named pins.
    pub fn xor_of(pins: &[&str]) -> Self {
        BoolExpr::Xor(pins.iter().map(|p| BoolExpr::var(*p)).collect())
    }

    /// Evaluates the expression, resolving pins through `lookup`.
    ///
    /// A `Z` operand is treated like `X`, so a floating input never produces
    /// a driven result unless a dominating value (0 for AND, 1 for OR) is present.
    pub fn evaluate<F>(&self, lookup: &F) -> Logic
    where
        F: Fn(&str) -> Logic,
    {
        match self {
            BoolExpr::Const(v) => *v,
            BoolExpr::Var(pin) => match lookup(pin) {
                Logic::Z => Logic::X,
                v => v,
            },
            BoolExpr::Not(inner) => !inner.evaluate(lookup),
            BoolExpr::And(ops) => ops
                .iter()
                .fold(Logic::One, |acc, op| acc & op.evaluate(lookup)),
            BoolExpr::Or(ops) => ops
                .iter()
                .fold(Logic::Zero, |acc, op| acc | op.evaluate(lookup)),
            BoolExpr::Xor(ops) => ops
                .iter()
                .fold(Logic::Zero, |acc, op| acc ^ op.evaluate(lookup)),
        }
    }

    /// Returns every pin name referenced by the expression.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            BoolExpr::Const(_) => {}
            BoolExpr::Var(pin) => {
                out.insert(pin.as_str());
            }
            BoolExpr::Not(inner) => inner.collect_vars(out),
            BoolExpr::And(ops) | BoolExpr::Or(ops) | BoolExpr::Xor(ops) => {
                for op in ops {
                    op.collect_vars(out);
                }
            }
        }
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, ops: &[BoolExpr], sep: &str| {
            write!(f, "(")?;
            for (i, op) in ops.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{op}")?;
            }
            write!(f, ")")
        };
        match self {
            BoolExpr::Const(v) => write!(f, "{v}"),
            BoolExpr::Var(pin) => write!(f, "{pin}"),
            BoolExpr::Not(inner) => write!(f, "!{inner}"),
            BoolExpr::And(ops) => join(f, ops, "&"),
            BoolExpr::Or(ops) => join(f, ops, "|"),
            BoolExpr::Xor(ops) => join(f, ops, "^"),
        }
    }
}
