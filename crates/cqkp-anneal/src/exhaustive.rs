//! Brute-force ground-state search over every assignment.
//!
//! Native constraints act as a hard filter rather than a penalty. Only
//! suitable for small problems; the state count is checked up front.

use std::time::Instant;
use tracing::{debug, warn};

use cqkp_core::error::OracleError;
use cqkp_core::oracle::{Sample, SolveRequest, SolverOracle};

use crate::energy::{CompiledModel, EnergyModel};

/// Default cap on the number of enumerated states.
pub const DEFAULT_MAX_STATES: u128 = 1 << 22;

/// Deadline is checked once per this many states.
const DEADLINE_STRIDE: u64 = 4096;

/// Oracle that enumerates the full state space and returns the
/// lowest-energy feasible assignments.
#[derive(Debug, Clone)]
pub struct ExhaustiveOracle {
    max_states: u128,
}

impl Default for ExhaustiveOracle {
    fn default() -> Self {
        Self {
            max_states: DEFAULT_MAX_STATES,
        }
    }
}

impl ExhaustiveOracle {
    /// Oracle with the default state cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle refusing problems with more than `max_states` states.
    pub fn with_max_states(max_states: u128) -> Self {
        Self { max_states }
    }

    /// State cap.
    pub fn max_states(&self) -> u128 {
        self.max_states
    }
}

/// Insert `(energy, state)` into `kept`, sorted by energy, retaining at most
/// `cap` entries. Earlier states win ties.
fn keep_lowest(kept: &mut Vec<(f64, Vec<f64>)>, cap: usize, energy: f64, state: &[f64]) {
    if kept.len() == cap && kept.last().map_or(true, |(worst, _)| energy >= *worst) {
        return;
    }
    let at = kept.partition_point(|(e, _)| *e <= energy);
    kept.insert(at, (energy, state.to_vec()));
    kept.truncate(cap);
}

impl SolverOracle for ExhaustiveOracle {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn supports_native_constraints(&self) -> bool {
        true
    }

    fn supports_integer_variables(&self) -> bool {
        true
    }

    fn submit(&mut self, request: &SolveRequest<'_>) -> Result<Vec<Sample>, OracleError> {
        let started = Instant::now();
        let deadline = started + request.timeout;
        let model = CompiledModel::compile(request.objective, request.constraints, 0.0);
        let vars = model.variables();

        let size = vars
            .iter()
            .fold(1u128, |acc, v| acc.saturating_mul(u128::from(v.domain.cardinality())));
        if size > self.max_states {
            return Err(OracleError::ProblemTooLarge {
                size,
                limit: self.max_states,
            });
        }

        let cap = request.num_samples.max(1);
        let bounds: Vec<(f64, f64)> = vars
            .iter()
            .map(|v| {
                let (lo, hi) = v.domain.bounds();
                (lo as f64, hi as f64)
            })
            .collect();
        let mut x: Vec<f64> = bounds.iter().map(|&(lo, _)| lo).collect();
        let mut kept: Vec<(f64, Vec<f64>)> = Vec::with_capacity(cap);
        let mut visited: u64 = 0;

        'states: loop {
            if model.is_feasible(&x) {
                keep_lowest(&mut kept, cap, model.energy(&x), &x);
            }
            visited += 1;
            if visited % DEADLINE_STRIDE == 0 && Instant::now() >= deadline {
                if kept.is_empty() {
                    return Err(OracleError::SolveTimeout {
                        timeout_ms: request.timeout_ms(),
                    });
                }
                warn!(visited, total = size as u64, "enumeration stopped at deadline");
                break;
            }

            // Mixed-radix increment, lowest index fastest.
            for (xi, &(lo, hi)) in x.iter_mut().zip(&bounds) {
                if *xi < hi {
                    *xi += 1.0;
                    continue 'states;
                }
                *xi = lo;
            }
            break;
        }

        if kept.is_empty() {
            return Err(OracleError::backend("no assignment satisfies the native constraints"));
        }
        debug!(
            visited,
            ground_energy = kept[0].0,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "enumeration finished"
        );

        Ok(kept
            .into_iter()
            .enumerate()
            .map(|(i, (_, state))| Sample {
                assignment: model.to_assignment(&state),
                is_best: i == 0,
            })
            .collect())
    }
}
