//! Decoding raw oracle assignments and scoring them against the instance.
//!
//! Scoring always uses the full instance data, never the pruned objective or
//! the penalty terms of the formulation that produced the sample.
//! Infeasible samples are valid output; feasibility is reported through the
//! `card` and `cap` flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::formulation::DecodeMap;
use crate::instance::Instance;
use crate::polynomial::Assignment;

/// Absolute tolerance on `Σ A·x ≤ b`.
pub const CAPACITY_TOLERANCE: f64 = 1e-9;

/// Ground-truth score of a 0/1 selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `ObjLin + ObjQua` over all entries.
    pub obj: f64,
    /// `Σx ≤ k`.
    pub card_ok: bool,
    /// `Σ A·x ≤ b`.
    pub cap_ok: bool,
}

impl Evaluation {
    /// Both constraints hold.
    pub fn is_feasible(&self) -> bool {
        self.card_ok && self.cap_ok
    }
}

/// A decoded, scored sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CqkpSolution {
    /// Selected item indices.
    pub items: BTreeSet<usize>,
    /// Objective value of the selection.
    pub obj: f64,
    /// Cardinality constraint satisfied.
    pub card: bool,
    /// Capacity constraint satisfied.
    pub cap: bool,
    /// Decoded slack values, for formulations with slack variables.
    #[serde(default)]
    pub slacks: Vec<i64>,
}

impl CqkpSolution {
    /// Both constraints hold.
    pub fn is_feasible(&self) -> bool {
        self.card && self.cap
    }
}

impl fmt::Display for CqkpSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CqkpSolution(items={:?}, obj={}, card={}, cap={}",
            self.items, self.obj, self.card, self.cap
        )?;
        if !self.slacks.is_empty() {
            write!(f, ", slacks={:?}", self.slacks)?;
        }
        write!(f, ")")
    }
}

/// Items whose raw value exceeds 0.5.
pub fn decode_items(x: &[f64]) -> BTreeSet<usize> {
    x.iter().enumerate().filter(|(_, v)| **v > 0.5).map(|(i, _)| i).collect()
}

/// Score the selection `x` (indexed by item; missing entries are `false`).
///
/// Pure: depends only on `instance` and `x`.
pub fn evaluate_objective(instance: &Instance, x: &[bool]) -> Evaluation {
    let sel = |i: usize| x.get(i).copied().unwrap_or(false);

    let obj_lin: f64 = instance
        .linear_values()
        .filter(|(i, _)| sel(*i))
        .map(|(_, v)| v)
        .sum();
    let obj_qua: f64 = instance
        .quadratic_values()
        .filter(|(i, j, _)| sel(*i) && sel(*j))
        .map(|(_, _, v)| v)
        .sum();
    let count = (0..instance.n()).filter(|&i| sel(i)).count();
    let load: f64 = instance.weights().filter(|(i, _)| sel(*i)).map(|(_, a)| a).sum();

    Evaluation {
        obj: obj_lin + obj_qua,
        card_ok: count <= instance.k(),
        cap_ok: load <= instance.budget() + CAPACITY_TOLERANCE,
    }
}

/// Score an explicit item set.
pub fn evaluate_items(instance: &Instance, items: &BTreeSet<usize>) -> Evaluation {
    let x: Vec<bool> = (0..instance.n()).map(|i| items.contains(&i)).collect();
    evaluate_objective(instance, &x)
}

/// Decode and score one raw assignment.
pub fn decode_sample(
    instance: &Instance,
    decode_map: &DecodeMap,
    assignment: &Assignment,
) -> CqkpSolution {
    let items = decode_items(&decode_map.item_values(assignment));
    let eval = evaluate_items(instance, &items);
    let slacks = decode_map.slack.iter().map(|s| s.decode(assignment)).collect();
    CqkpSolution {
        items,
        obj: eval.obj,
        card: eval.card_ok,
        cap: eval.cap_ok,
        slacks,
    }
}
