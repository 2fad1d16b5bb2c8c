//! Hamiltonian construction for the five CQKP formulation variants.
//!
//! Every variant builds
//!
//! ```text
//! H = -ObjLin - ObjQua + λ_cap · P_cap + λ_card · P_card
//! ```
//!
//! where `ObjLin` and `ObjQua` only contain strictly positive values of the
//! instance. The variants differ in how the constraint terms are expressed:
//!
//! | Variant | `P_card` | `P_cap` |
//! |---------|----------|---------|
//! | [`Variant::Naive`] | native `Σx ≤ k` | native `Σ A·x ≤ b` |
//! | [`Variant::LinearPenalty`] | `Σx - k` | `Σ A·x - b` |
//! | [`Variant::QuadraticPenaltyCard`] | `(Σx - k)²` | `Σ A·x - b` |
//! | [`Variant::BinarySlack`] | `(Σx - k)²` | `(Σ A·x + s - b)²`, `s` log-encoded |
//! | [`Variant::UnarySlack`] | `(Σx - k)²` | `(Σ A·x + s - b)²`, `s` unary-encoded |
//!
//! Penalty weights are taken as given. Choosing weights that dominate the
//! objective scale is the caller's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::encoder::{encode_slack, SlackEncoding, SlackMode};
use crate::error::EncodingError;
use crate::instance::Instance;
use crate::polynomial::{
    Assignment, LinearConstraint, LinearExpr, Polynomial, Variable, VariablePool,
};

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// Formulation strategy for the constraint terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Both constraints passed to the oracle as native inequalities.
    Naive,
    /// Both constraints added as signed, unsquared bias terms.
    ///
    /// Kept as an ablation baseline: the terms reward under-use of the budget
    /// and cardinality rather than penalising violations.
    LinearPenalty,
    /// Squared cardinality penalty, unsquared capacity bias.
    QuadraticPenaltyCard,
    /// Squared penalties with a log-encoded capacity slack.
    #[default]
    BinarySlack,
    /// Squared penalties with a unary-encoded capacity slack.
    UnarySlack,
}

impl Variant {
    /// All variants, in table order.
    pub const ALL: [Variant; 5] = [
        Variant::Naive,
        Variant::LinearPenalty,
        Variant::QuadraticPenaltyCard,
        Variant::BinarySlack,
        Variant::UnarySlack,
    ];

    /// Stable kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Naive => "naive",
            Variant::LinearPenalty => "linear-penalty",
            Variant::QuadraticPenaltyCard => "quadratic-penalty-card",
            Variant::BinarySlack => "binary-slack",
            Variant::UnarySlack => "unary-slack",
        }
    }

    /// Slack encoding used for the capacity constraint, if any.
    pub fn default_slack_mode(&self) -> Option<SlackMode> {
        match self {
            Variant::BinarySlack => Some(SlackMode::Binary),
            Variant::UnarySlack => Some(SlackMode::Unary),
            _ => None,
        }
    }

    /// Whether the oracle must enforce native inequality constraints.
    pub fn uses_native_constraints(&self) -> bool {
        matches!(self, Variant::Naive)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown formulation variant `{s}`"))
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Penalty weights and slack options for one formulation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormulationParams {
    /// Weight `λ_card` of the cardinality term.
    pub lambda_card: f64,
    /// Weight `λ_cap` of the capacity term.
    pub lambda_cap: f64,
    /// Override of the variant's slack encoding. Only read by the slack
    /// variants.
    pub slack_mode: Option<SlackMode>,
}

impl Default for FormulationParams {
    fn default() -> Self {
        Self {
            lambda_card: 1.0,
            lambda_cap: 1.0,
            slack_mode: None,
        }
    }
}

impl FormulationParams {
    /// Params with the given penalty weights and the variant's own slack mode.
    pub fn new(lambda_card: f64, lambda_cap: f64) -> Self {
        Self {
            lambda_card,
            lambda_cap,
            slack_mode: None,
        }
    }

    /// Builder-style slack mode override.
    pub fn with_slack_mode(mut self, mode: SlackMode) -> Self {
        self.slack_mode = Some(mode);
        self
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Variable groups needed to read a solution back out of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeMap {
    /// Item selection variables `x[0..N]`.
    pub items: Vec<Variable>,
    /// Capacity slack, for the slack variants.
    pub slack: Option<SlackEncoding>,
}

impl DecodeMap {
    /// Raw item values, in item order.
    pub fn item_values(&self, assignment: &Assignment) -> Vec<f64> {
        self.items.iter().map(|v| assignment.get(v.id)).collect()
    }
}

/// A complete formulation: Hamiltonian, its parts and the decode map.
#[derive(Debug, Clone)]
pub struct Formulation {
    /// Variant that produced this formulation.
    pub variant: Variant,
    /// The Hamiltonian to minimise.
    pub hamiltonian: Polynomial,
    /// `ObjLin + ObjQua` over the positive entries (maximisation sense).
    pub objective: Polynomial,
    /// Unweighted cardinality term (zero for [`Variant::Naive`]).
    pub cardinality_penalty: Polynomial,
    /// Unweighted capacity term (zero for [`Variant::Naive`]).
    pub capacity_penalty: Polynomial,
    /// Native inequalities the oracle must enforce.
    pub constraints: Vec<LinearConstraint>,
    /// How to decode samples.
    pub decode_map: DecodeMap,
    /// All variables allocated for this formulation.
    pub pool: VariablePool,
}

impl Formulation {
    /// Total number of decision variables, items and auxiliaries.
    pub fn num_variables(&self) -> usize {
        self.pool.len()
    }

    /// Number of auxiliary (slack) variables.
    pub fn num_auxiliary(&self) -> usize {
        self.pool.len() - self.decode_map.items.len()
    }

    /// Whether the formulation contains any non-binary variable.
    pub fn has_integer_variables(&self) -> bool {
        self.pool.variables().any(|v| !v.is_binary())
    }
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// `ObjLin + ObjQua` restricted to strictly positive entries.
pub fn objective_polynomial(instance: &Instance, x: &[Variable]) -> Polynomial {
    let mut p = Polynomial::new();
    for (i, l) in instance.positive_linear() {
        p.add_linear(x[i], l);
    }
    for (i, j, q) in instance.positive_quadratic() {
        p.add_quadratic(x[i], x[j], q);
    }
    p
}

/// `Σx` over all items.
pub fn cardinality_expr(x: &[Variable]) -> LinearExpr {
    LinearExpr::sum_of(x)
}

/// `Σ A·x` over all items.
pub fn capacity_expr(instance: &Instance, x: &[Variable]) -> LinearExpr {
    LinearExpr::weighted_sum(instance.weights().map(|(i, a)| (x[i], a)))
}

// ---------------------------------------------------------------------------
// formulate
// ---------------------------------------------------------------------------

/// Build the Hamiltonian of `variant` for `instance`.
///
/// Each call allocates fresh variables; nothing is shared between calls.
/// The slack variants size their slack with bound `⌊b⌋`.
///
/// # Errors
///
/// [`EncodingError::InvalidBound`] if the slack bound is negative.
pub fn formulate(
    instance: &Instance,
    variant: Variant,
    params: &FormulationParams,
) -> Result<Formulation, EncodingError> {
    let mut pool = VariablePool::new();
    let x = pool.binary_array("x", instance.n());

    let objective = objective_polynomial(instance, &x);
    let card = cardinality_expr(&x);
    let cap = capacity_expr(instance, &x);
    let k = instance.k() as f64;
    let b = instance.budget();

    let mut constraints = Vec::new();
    let mut slack = None;

    let (cardinality_penalty, capacity_penalty) = match variant {
        Variant::Naive => {
            constraints.push(LinearConstraint::less_equal("capacity", cap, b));
            constraints.push(LinearConstraint::less_equal("cardinality", card, k));
            (Polynomial::new(), Polynomial::new())
        }
        Variant::LinearPenalty => (
            card.plus_constant(-k).to_polynomial(),
            cap.plus_constant(-b).to_polynomial(),
        ),
        Variant::QuadraticPenaltyCard => (
            card.plus_constant(-k).squared(),
            cap.plus_constant(-b).to_polynomial(),
        ),
        Variant::BinarySlack | Variant::UnarySlack => {
            let mode = params
                .slack_mode
                .or_else(|| variant.default_slack_mode())
                .unwrap_or_default();
            let encoding = encode_slack(&mut pool, "s", b.floor() as i64, mode)?;
            let mut balance = cap;
            balance.extend(&encoding.expr());
            balance.add_constant(-b);
            slack = Some(encoding);
            (card.plus_constant(-k).squared(), balance.squared())
        }
    };

    let mut hamiltonian = objective.clone().scaled(-1.0);
    if !variant.uses_native_constraints() {
        hamiltonian.combine(&capacity_penalty, params.lambda_cap);
        hamiltonian.combine(&cardinality_penalty, params.lambda_card);
    }

    debug!(
        variant = %variant,
        items = x.len(),
        auxiliary = pool.len() - x.len(),
        terms = hamiltonian.num_terms(),
        constraints = constraints.len(),
        "built formulation"
    );

    Ok(Formulation {
        variant,
        hamiltonian,
        objective,
        cardinality_penalty,
        capacity_penalty,
        constraints,
        decode_map: DecodeMap { items: x, slack },
        pool,
    })
}
