//! Sparse polynomials of degree at most two over binary and bounded-integer
//! decision variables.
//!
//! A [`Polynomial`] maps canonical [`Monomial`]s to real coefficients.
//! Coefficients are always accumulated, so the resulting map does not depend
//! on the order in which terms were added. Self-products of binary variables
//! collapse to the variable itself (`x·x = x` for `x ∈ {0, 1}`), which keeps
//! the expansion of squared penalties exact.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Opaque identifier of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// `{0, 1}`.
    Binary,
    /// Integers in `[lo, hi]`, both inclusive.
    BoundedInteger {
        /// Lower bound.
        lo: i64,
        /// Upper bound.
        hi: i64,
    },
}

impl Domain {
    /// `true` for [`Domain::Binary`].
    #[inline]
    pub fn is_binary(&self) -> bool {
        matches!(self, Domain::Binary)
    }

    /// Inclusive `(lo, hi)` bounds of the domain.
    pub fn bounds(&self) -> (i64, i64) {
        match *self {
            Domain::Binary => (0, 1),
            Domain::BoundedInteger { lo, hi } => (lo, hi),
        }
    }

    /// Number of values in the domain (0 for an empty integer range).
    pub fn cardinality(&self) -> u64 {
        let (lo, hi) = self.bounds();
        if hi < lo {
            0
        } else {
            (hi - lo) as u64 + 1
        }
    }

    /// Whether `value` is an integer inside the domain.
    pub fn contains(&self, value: f64) -> bool {
        let (lo, hi) = self.bounds();
        value.fract() == 0.0 && value >= lo as f64 && value <= hi as f64
    }
}

/// A decision variable: identifier plus domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable {
    /// Identifier, unique within a [`VariablePool`].
    pub id: VarId,
    /// Value domain.
    pub domain: Domain,
}

impl Variable {
    /// `true` when the variable is binary.
    #[inline]
    pub fn is_binary(&self) -> bool {
        self.domain.is_binary()
    }
}

/// Allocator for the variables of a single formulation call.
///
/// Ids are dense and start at zero; every variable carries a display name
/// such as `x[3]` or `s[0]`.
#[derive(Debug, Clone, Default)]
pub struct VariablePool {
    vars: Vec<(Variable, String)>,
}

impl VariablePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, domain: Domain, name: String) -> Variable {
        let var = Variable {
            id: VarId(self.vars.len() as u32),
            domain,
        };
        self.vars.push((var, name));
        var
    }

    /// Allocate a fresh binary variable.
    pub fn binary(&mut self, name: impl Into<String>) -> Variable {
        self.push(Domain::Binary, name.into())
    }

    /// Allocate a fresh integer variable with domain `[lo, hi]`.
    pub fn bounded_integer(&mut self, name: impl Into<String>, lo: i64, hi: i64) -> Variable {
        debug_assert!(lo <= hi, "empty integer domain [{lo}, {hi}]");
        self.push(Domain::BoundedInteger { lo, hi }, name.into())
    }

    /// Allocate `len` binary variables named `prefix[0] .. prefix[len-1]`.
    pub fn binary_array(&mut self, prefix: &str, len: usize) -> Vec<Variable> {
        (0..len).map(|i| self.binary(format!("{prefix}[{i}]"))).collect()
    }

    /// Display name of `id`, if it was allocated by this pool.
    pub fn name(&self, id: VarId) -> Option<&str> {
        self.vars.get(id.0 as usize).map(|(_, name)| name.as_str())
    }

    /// Iterate over all allocated variables in id order.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.vars.iter().map(|(v, _)| *v)
    }

    /// Number of allocated variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// Concrete values for (some of) a model's variables.
///
/// Values are stored as `f64` because oracles may return near-binary or
/// integer values. Unassigned variables read as `0.0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    values: BTreeMap<VarId, f64>,
}

impl Assignment {
    /// Create an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of `id`, replacing any previous value.
    pub fn set(&mut self, id: VarId, value: f64) {
        self.values.insert(id, value);
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, id: VarId, value: f64) -> Self {
        self.set(id, value);
        self
    }

    /// Value of `id`, or `0.0` when unassigned.
    #[inline]
    pub fn get(&self, id: VarId) -> f64 {
        self.values.get(&id).copied().unwrap_or(0.0)
    }

    /// Whether `id` has an explicit value.
    pub fn contains(&self, id: VarId) -> bool {
        self.values.contains_key(&id)
    }

    /// Iterate over explicit `(id, value)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of explicitly assigned variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if no variable is assigned.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(VarId, f64)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Monomial
// ---------------------------------------------------------------------------

/// A product of at most two variables.
///
/// Quadratic monomials are stored with their factors ordered by id, so
/// `x_i·x_j` and `x_j·x_i` share one coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Monomial {
    /// Degree 0.
    Constant,
    /// Degree 1.
    Linear(Variable),
    /// Degree 2 (factors ordered by id).
    Quadratic(Variable, Variable),
}

impl Monomial {
    /// Canonical product `a·b`, reduced to `a` when `a` is a binary
    /// variable multiplied by itself.
    pub fn quadratic(a: Variable, b: Variable) -> Self {
        if a.id == b.id && a.is_binary() {
            Monomial::Linear(a)
        } else if a.id <= b.id {
            Monomial::Quadratic(a, b)
        } else {
            Monomial::Quadratic(b, a)
        }
    }

    /// Bring a hand-built monomial into canonical form.
    pub fn canonical(self) -> Self {
        match self {
            Monomial::Quadratic(a, b) => Monomial::quadratic(a, b),
            other => other,
        }
    }

    /// Degree of the monomial.
    pub fn degree(&self) -> usize {
        match self {
            Monomial::Constant => 0,
            Monomial::Linear(_) => 1,
            Monomial::Quadratic(..) => 2,
        }
    }

    /// Value of the monomial under `assignment`.
    #[inline]
    pub fn evaluate(&self, assignment: &Assignment) -> f64 {
        match self {
            Monomial::Constant => 1.0,
            Monomial::Linear(v) => assignment.get(v.id),
            Monomial::Quadratic(a, b) => assignment.get(a.id) * assignment.get(b.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Polynomial
// ---------------------------------------------------------------------------

/// Sparse polynomial with real coefficients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polynomial {
    terms: BTreeMap<Monomial, f64>,
}

impl Polynomial {
    /// The zero polynomial.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant polynomial.
    pub fn constant(value: f64) -> Self {
        let mut p = Self::new();
        p.add_constant(value);
        p
    }

    /// Accumulate `coeff` onto `monomial`.
    ///
    /// Terms whose coefficient cancels to exactly zero are dropped.
    pub fn add_term(&mut self, monomial: Monomial, coeff: f64) {
        if coeff == 0.0 {
            return;
        }
        let monomial = monomial.canonical();
        let total = {
            let entry = self.terms.entry(monomial).or_insert(0.0);
            *entry += coeff;
            *entry
        };
        if total == 0.0 {
            self.terms.remove(&monomial);
        }
    }

    /// Accumulate a constant.
    pub fn add_constant(&mut self, coeff: f64) {
        self.add_term(Monomial::Constant, coeff);
    }

    /// Accumulate `coeff · v`.
    pub fn add_linear(&mut self, v: Variable, coeff: f64) {
        self.add_term(Monomial::Linear(v), coeff);
    }

    /// Accumulate `coeff · a · b`.
    pub fn add_quadratic(&mut self, a: Variable, b: Variable, coeff: f64) {
        self.add_term(Monomial::quadratic(a, b), coeff);
    }

    /// Multiply every coefficient by `factor`.
    pub fn scale(&mut self, factor: f64) {
        if factor == 0.0 {
            self.terms.clear();
            return;
        }
        for c in self.terms.values_mut() {
            *c *= factor;
        }
    }

    /// Return `self · factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.scale(factor);
        self
    }

    /// Accumulate `weight · other` into `self`.
    pub fn combine(&mut self, other: &Polynomial, weight: f64) {
        for (&m, &c) in &other.terms {
            self.add_term(m, weight * c);
        }
    }

    /// Evaluate at `assignment`. Pure; unassigned variables read as zero.
    pub fn evaluate(&self, assignment: &Assignment) -> f64 {
        self.terms.iter().map(|(m, c)| c * m.evaluate(assignment)).sum()
    }

    /// Coefficient of `monomial` (zero when absent).
    pub fn coefficient(&self, monomial: &Monomial) -> f64 {
        self.terms.get(&monomial.canonical()).copied().unwrap_or(0.0)
    }

    /// Iterate over `(monomial, coefficient)` pairs in canonical order.
    pub fn terms(&self) -> impl Iterator<Item = (Monomial, f64)> + '_ {
        self.terms.iter().map(|(m, c)| (*m, *c))
    }

    /// Number of non-zero terms.
    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// `true` for the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Highest degree among the non-zero terms (0 for the zero polynomial).
    pub fn degree(&self) -> usize {
        self.terms.keys().map(Monomial::degree).max().unwrap_or(0)
    }

    /// Every variable that appears in a non-zero term.
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut out = BTreeSet::new();
        for m in self.terms.keys() {
            match *m {
                Monomial::Constant => {}
                Monomial::Linear(v) => {
                    out.insert(v);
                }
                Monomial::Quadratic(a, b) => {
                    out.insert(a);
                    out.insert(b);
                }
            }
        }
        out
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, (m, c)) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            match m {
                Monomial::Constant => write!(f, "{c}")?,
                Monomial::Linear(v) => write!(f, "{c} {}", v.id)?,
                Monomial::Quadratic(a, b) => write!(f, "{c} {} {}", a.id, b.id)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LinearExpr
// ---------------------------------------------------------------------------

/// Affine expression `Σ cᵢ·vᵢ + c₀`, the building block of penalty terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    coeffs: BTreeMap<Variable, f64>,
    constant: f64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// `Σ vᵢ` over `vars`.
    pub fn sum_of(vars: &[Variable]) -> Self {
        Self::weighted_sum(vars.iter().map(|&v| (v, 1.0)))
    }

    /// `Σ cᵢ·vᵢ` over the given pairs.
    pub fn weighted_sum<I: IntoIterator<Item = (Variable, f64)>>(pairs: I) -> Self {
        let mut expr = Self::new();
        for (v, c) in pairs {
            expr.add_term(v, c);
        }
        expr
    }

    /// Accumulate `coeff · v`.
    pub fn add_term(&mut self, v: Variable, coeff: f64) {
        *self.coeffs.entry(v).or_insert(0.0) += coeff;
    }

    /// Accumulate a constant.
    pub fn add_constant(&mut self, c: f64) {
        self.constant += c;
    }

    /// Builder-style [`add_constant`](Self::add_constant).
    pub fn plus_constant(mut self, c: f64) -> Self {
        self.add_constant(c);
        self
    }

    /// Accumulate every term of `other`.
    pub fn extend(&mut self, other: &LinearExpr) {
        for (&v, &c) in &other.coeffs {
            self.add_term(v, c);
        }
        self.constant += other.constant;
    }

    /// Non-constant terms.
    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.coeffs.iter().filter(|(_, c)| **c != 0.0).map(|(v, c)| (*v, *c))
    }

    /// Constant offset.
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Value at `assignment`.
    pub fn evaluate(&self, assignment: &Assignment) -> f64 {
        self.constant + self.terms().map(|(v, c)| c * assignment.get(v.id)).sum::<f64>()
    }

    /// The expression as a degree-1 polynomial.
    pub fn to_polynomial(&self) -> Polynomial {
        let mut p = Polynomial::constant(self.constant);
        for (v, c) in self.terms() {
            p.add_linear(v, c);
        }
        p
    }

    /// Exact expansion of `(Σ cᵢ·vᵢ + c₀)²`.
    ///
    /// Ordered pairs are expanded so cross terms appear twice; diagonal
    /// terms of binary variables reduce to linear terms.
    pub fn squared(&self) -> Polynomial {
        let terms: Vec<(Variable, f64)> = self.terms().collect();
        let mut p = Polynomial::constant(self.constant * self.constant);
        for &(vi, ci) in &terms {
            p.add_linear(vi, 2.0 * self.constant * ci);
            for &(vj, cj) in &terms {
                p.add_quadratic(vi, vj, ci * cj);
            }
        }
        p
    }
}

// ---------------------------------------------------------------------------
// LinearConstraint
// ---------------------------------------------------------------------------

/// Native inequality `expr ≤ bound`, handed to oracles that enforce
/// constraints themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Display label, e.g. `"cardinality"`.
    pub label: &'static str,
    /// Left-hand side.
    pub expr: LinearExpr,
    /// Right-hand side.
    pub bound: f64,
}

impl LinearConstraint {
    /// `expr ≤ bound`.
    pub fn less_equal(label: &'static str, expr: LinearExpr, bound: f64) -> Self {
        Self { label, expr, bound }
    }

    /// Amount by which the left-hand side exceeds the bound (never negative).
    pub fn violation(&self, assignment: &Assignment) -> f64 {
        (self.expr.evaluate(assignment) - self.bound).max(0.0)
    }

    /// Whether the inequality holds at `assignment`.
    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        self.violation(assignment) <= 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_vars(n: usize) -> (VariablePool, Vec<Variable>) {
        let mut pool = VariablePool::new();
        let xs = pool.binary_array("x", n);
        (pool, xs)
    }

    fn all_binary(vars: &[Variable]) -> Vec<Assignment> {
        (0..1u32 << vars.len())
            .map(|mask| {
                vars.iter()
                    .enumerate()
                    .map(|(i, v)| (v.id, ((mask >> i) & 1) as f64))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn pool_allocates_dense_ids_and_names() {
        let mut pool = VariablePool::new();
        let xs = pool.binary_array("x", 3);
        let s = pool.bounded_integer("s", 0, 7);
        assert_eq!(xs[2].id, VarId(2));
        assert_eq!(s.id, VarId(3));
        assert_eq!(pool.name(VarId(1)), Some("x[1]"));
        assert_eq!(pool.name(VarId(3)), Some("s"));
        assert_eq!(pool.len(), 4);
        assert_eq!(s.domain.cardinality(), 8);
    }

    #[test]
    fn coefficients_accumulate_regardless_of_order() {
        let (_, x) = binary_vars(2);
        let mut a = Polynomial::new();
        a.add_linear(x[0], 1.5);
        a.add_quadratic(x[0], x[1], 2.0);
        a.add_quadratic(x[1], x[0], 3.0);
        a.add_constant(-1.0);

        let mut b = Polynomial::new();
        b.add_constant(-1.0);
        b.add_quadratic(x[1], x[0], 5.0);
        b.add_linear(x[0], 1.0);
        b.add_linear(x[0], 0.5);

        assert_eq!(a, b);
        assert_eq!(a.coefficient(&Monomial::quadratic(x[1], x[0])), 5.0);
    }

    #[test]
    fn binary_self_product_reduces_to_linear() {
        let (_, x) = binary_vars(1);
        let mut p = Polynomial::new();
        p.add_quadratic(x[0], x[0], 4.0);
        assert_eq!(p.degree(), 1);
        assert_eq!(p.coefficient(&Monomial::Linear(x[0])), 4.0);
    }

    #[test]
    fn integer_self_product_is_kept() {
        let mut pool = VariablePool::new();
        let s = pool.bounded_integer("s", 0, 5);
        let mut p = Polynomial::new();
        p.add_quadratic(s, s, 1.0);
        assert_eq!(p.degree(), 2);
        let a = Assignment::new().with(s.id, 3.0);
        assert_eq!(p.evaluate(&a), 9.0);
    }

    #[test]
    fn cancelled_terms_are_dropped() {
        let (_, x) = binary_vars(1);
        let mut p = Polynomial::new();
        p.add_linear(x[0], 2.0);
        p.add_linear(x[0], -2.0);
        assert!(p.is_zero());
        assert!(p.variables().is_empty());
    }

    #[test]
    fn scale_and_combine() {
        let (_, x) = binary_vars(2);
        let mut p = Polynomial::new();
        p.add_linear(x[0], 1.0);
        p.add_constant(2.0);
        let mut q = Polynomial::new();
        q.add_quadratic(x[0], x[1], 1.0);

        p.combine(&q, 3.0);
        p.scale(2.0);

        let a = Assignment::new().with(x[0].id, 1.0).with(x[1].id, 1.0);
        assert_eq!(p.evaluate(&a), 2.0 * (1.0 + 2.0 + 3.0));
        assert!(p.clone().scaled(0.0).is_zero());
    }

    #[test]
    fn squared_expansion_is_exact_on_binaries() {
        let (_, x) = binary_vars(4);
        let terms = vec![(x[0], 2.0), (x[1], 3.0), (x[2], -1.0), (x[3], 4.0)];
        let expr = LinearExpr::weighted_sum(terms).plus_constant(-5.0);
        let sq = expr.squared();
        assert!(sq.degree() <= 2);
        for a in all_binary(&x) {
            let direct = expr.evaluate(&a).powi(2);
            assert!((sq.evaluate(&a) - direct).abs() < 1e-9);
        }
    }

    #[test]
    fn squared_expansion_with_integer_variable() {
        let mut pool = VariablePool::new();
        let x = pool.binary("x");
        let s = pool.bounded_integer("s", 0, 4);
        let expr = LinearExpr::weighted_sum(vec![(x, 3.0), (s, 1.0)]).plus_constant(-4.0);
        let sq = expr.squared();
        for xv in 0..=1 {
            for sv in 0..=4 {
                let a = Assignment::new().with(x.id, xv as f64).with(s.id, sv as f64);
                assert_eq!(sq.evaluate(&a), expr.evaluate(&a).powi(2));
            }
        }
    }

    #[test]
    fn unassigned_variables_read_zero() {
        let (_, x) = binary_vars(2);
        let expr = LinearExpr::sum_of(&x).plus_constant(1.0);
        assert_eq!(expr.evaluate(&Assignment::new()), 1.0);
    }

    #[test]
    fn constraint_violation() {
        let (_, x) = binary_vars(3);
        let c = LinearConstraint::less_equal("cardinality", LinearExpr::sum_of(&x), 1.0);
        let a = Assignment::new().with(x[0].id, 1.0).with(x[2].id, 1.0);
        assert_eq!(c.violation(&a), 1.0);
        assert!(!c.is_satisfied(&a));
        assert!(c.is_satisfied(&Assignment::new().with(x[1].id, 1.0)));
    }

    #[test]
    fn domain_contains() {
        let d = Domain::BoundedInteger { lo: 0, hi: 3 };
        assert!(d.contains(3.0));
        assert!(!d.contains(3.5));
        assert!(!d.contains(-1.0));
        assert!(Domain::Binary.contains(1.0));
    }
}
