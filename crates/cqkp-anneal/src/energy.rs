//! Energy models: the `EnergyModel` trait and a dense, index-based
//! compilation of a polynomial objective plus native inequalities.

use std::collections::{BTreeMap, BTreeSet};

use cqkp_core::polynomial::{Assignment, LinearConstraint, Monomial, Polynomial, VarId, Variable};

/// Trait implemented by anything that assigns a scalar energy to a dense
/// state vector.
pub trait EnergyModel {
    /// Number of state variables.
    fn num_variables(&self) -> usize;

    /// Total energy of `x`.
    fn energy(&self, x: &[f64]) -> f64;

    /// Energy change when `x[i]` is replaced by `value`.
    ///
    /// The default recomputes the energy twice; models with local structure
    /// should override it.
    fn delta(&self, x: &[f64], i: usize, value: f64) -> f64 {
        let mut y = x.to_vec();
        y[i] = value;
        self.energy(&y) - self.energy(x)
    }
}

#[derive(Debug, Clone)]
struct CompiledConstraint {
    coeffs: Vec<(usize, f64)>,
    offset: f64,
    bound: f64,
}

impl CompiledConstraint {
    fn lhs(&self, x: &[f64]) -> f64 {
        self.offset + self.coeffs.iter().map(|&(i, c)| c * x[i]).sum::<f64>()
    }

    fn excess(&self, lhs: f64) -> f64 {
        (lhs - self.bound).max(0.0)
    }
}

/// A [`Polynomial`] and its native constraints laid out over dense indices.
///
/// Energy is `objective(x) + w · Σ_c max(0, lhs_c(x) - bound_c)²`, where `w`
/// is the constraint weight. With `w = 0` the constraints are only checked,
/// never priced.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    variables: Vec<Variable>,
    index: BTreeMap<VarId, usize>,
    constant: f64,
    linear: Vec<f64>,
    diagonal: Vec<f64>,
    couplings: Vec<Vec<(usize, f64)>>,
    constraints: Vec<CompiledConstraint>,
    touches: Vec<Vec<usize>>,
    constraint_weight: f64,
}

impl CompiledModel {
    /// Compile `objective` and `constraints`.
    pub fn compile(
        objective: &Polynomial,
        constraints: &[LinearConstraint],
        constraint_weight: f64,
    ) -> Self {
        let mut vars: BTreeSet<Variable> = objective.variables();
        for c in constraints {
            vars.extend(c.expr.terms().map(|(v, _)| v));
        }
        let variables: Vec<Variable> = vars.into_iter().collect();
        let index: BTreeMap<VarId, usize> =
            variables.iter().enumerate().map(|(i, v)| (v.id, i)).collect();
        let n = variables.len();

        let mut model = Self {
            variables,
            index,
            constant: 0.0,
            linear: vec![0.0; n],
            diagonal: vec![0.0; n],
            couplings: vec![Vec::new(); n],
            constraints: Vec::with_capacity(constraints.len()),
            touches: vec![Vec::new(); n],
            constraint_weight,
        };

        for (m, c) in objective.terms() {
            match m {
                Monomial::Constant => model.constant += c,
                Monomial::Linear(v) => model.linear[model.index[&v.id]] += c,
                Monomial::Quadratic(a, b) => {
                    let (i, j) = (model.index[&a.id], model.index[&b.id]);
                    if i == j {
                        model.diagonal[i] += c;
                    } else {
                        model.couplings[i].push((j, c));
                        model.couplings[j].push((i, c));
                    }
                }
            }
        }

        for (ci, c) in constraints.iter().enumerate() {
            let coeffs: Vec<(usize, f64)> =
                c.expr.terms().map(|(v, w)| (model.index[&v.id], w)).collect();
            for &(i, _) in &coeffs {
                model.touches[i].push(ci);
            }
            model.constraints.push(CompiledConstraint {
                coeffs,
                offset: c.expr.constant(),
                bound: c.bound,
            });
        }
        model
    }

    /// Variables in index order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Number of native constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value only, without constraint pricing.
    pub fn objective(&self, x: &[f64]) -> f64 {
        let mut e = self.constant;
        for i in 0..x.len() {
            e += self.linear[i] * x[i] + self.diagonal[i] * x[i] * x[i];
            for &(j, c) in &self.couplings[i] {
                if j > i {
                    e += c * x[i] * x[j];
                }
            }
        }
        e
    }

    /// Whether every native constraint holds at `x`.
    pub fn is_feasible(&self, x: &[f64]) -> bool {
        self.constraints.iter().all(|c| c.excess(c.lhs(x)) <= 1e-9)
    }

    fn penalty(&self, x: &[f64]) -> f64 {
        if self.constraint_weight == 0.0 {
            return 0.0;
        }
        let excess: f64 = self.constraints.iter().map(|c| c.excess(c.lhs(x)).powi(2)).sum();
        self.constraint_weight * excess
    }

    /// Smallest and largest non-zero coefficient magnitude, constraint
    /// pricing included. `None` when the model has no coefficients.
    pub fn coefficient_range(&self) -> Option<(f64, f64)> {
        let objective = self
            .linear
            .iter()
            .chain(&self.diagonal)
            .copied()
            .chain(self.couplings.iter().flatten().map(|&(_, c)| c));
        let priced = self
            .constraints
            .iter()
            .flat_map(|c| c.coeffs.iter().map(|&(_, w)| w * w))
            .map(|w| w * self.constraint_weight);
        objective
            .chain(priced)
            .map(f64::abs)
            .filter(|c| *c > 0.0)
            .fold(None, |acc, c| match acc {
                None => Some((c, c)),
                Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
            })
    }

    /// Dense state as a sparse [`Assignment`].
    pub fn to_assignment(&self, x: &[f64]) -> Assignment {
        self.variables.iter().zip(x).map(|(v, &value)| (v.id, value)).collect()
    }
}

impl EnergyModel for CompiledModel {
    fn num_variables(&self) -> usize {
        self.variables.len()
    }

    fn energy(&self, x: &[f64]) -> f64 {
        self.objective(x) + self.penalty(x)
    }

    fn delta(&self, x: &[f64], i: usize, value: f64) -> f64 {
        let old = x[i];
        let dx = value - old;
        let mut d = self.linear[i] * dx + self.diagonal[i] * (value * value - old * old);
        for &(j, c) in &self.couplings[i] {
            d += c * x[j] * dx;
        }
        if self.constraint_weight != 0.0 {
            for &ci in &self.touches[i] {
                let c = &self.constraints[ci];
                let coeff: f64 = c.coeffs.iter().filter(|(j, _)| *j == i).map(|(_, w)| w).sum();
                let lhs = c.lhs(x);
                let before = c.excess(lhs).powi(2);
                let after = c.excess(lhs + coeff * dx).powi(2);
                d += self.constraint_weight * (after - before);
            }
        }
        d
    }
}
