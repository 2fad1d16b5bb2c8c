//! The solver-oracle contract.
//!
//! An oracle receives a [`SolveRequest`] (objective polynomial, optional
//! native inequalities, time budget, sample count) and blocks until it can
//! return candidate assignments. Credentials and endpoints are carried in an
//! explicit [`OracleConfig`] handed to the oracle's constructor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::OracleError;
use crate::polynomial::{Assignment, LinearConstraint, Polynomial};

/// Connection and reproducibility settings for an oracle.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// API token for remote oracles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Endpoint URL for remote oracles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// RNG seed for stochastic oracles. `None` draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl OracleConfig {
    /// Config with a fixed seed and no credentials.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("seed", &self.seed)
            .finish()
    }
}

/// One submission to an oracle.
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    /// Polynomial to minimise.
    pub objective: &'a Polynomial,
    /// Inequalities the oracle must enforce natively.
    pub constraints: &'a [LinearConstraint],
    /// Wall-clock budget.
    pub timeout: Duration,
    /// Number of candidate assignments wanted.
    pub num_samples: usize,
}

impl<'a> SolveRequest<'a> {
    /// Unconstrained single-sample request.
    pub fn new(objective: &'a Polynomial, timeout: Duration) -> Self {
        Self {
            objective,
            constraints: &[],
            timeout,
            num_samples: 1,
        }
    }

    /// Attach native inequality constraints.
    pub fn with_constraints(mut self, constraints: &'a [LinearConstraint]) -> Self {
        self.constraints = constraints;
        self
    }

    /// Ask for `n` samples.
    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Budget in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// One candidate assignment returned by an oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Variable values.
    pub assignment: Assignment,
    /// Whether the oracle considers this its best sample.
    pub is_best: bool,
}

/// A black-box minimiser of polynomial objectives.
///
/// Implementations must return at least one sample on success, and
/// [`OracleError::SolveTimeout`] when the budget elapses without any.
pub trait SolverOracle {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether native inequality constraints are honoured.
    fn supports_native_constraints(&self) -> bool;

    /// Whether bounded-integer variables are supported directly.
    fn supports_integer_variables(&self) -> bool;

    /// Solve `request`, blocking for at most its timeout.
    fn submit(&mut self, request: &SolveRequest<'_>) -> Result<Vec<Sample>, OracleError>;
}

impl<T: SolverOracle + ?Sized> SolverOracle for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn supports_native_constraints(&self) -> bool {
        (**self).supports_native_constraints()
    }

    fn supports_integer_variables(&self) -> bool {
        (**self).supports_integer_variables()
    }

    fn submit(&mut self, request: &SolveRequest<'_>) -> Result<Vec<Sample>, OracleError> {
        (**self).submit(request)
    }
}

/// Index of the sample to treat as "best": the first flagged one, else 0.
pub fn best_sample_index(samples: &[Sample]) -> Option<usize> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().position(|s| s.is_best).unwrap_or(0))
}
