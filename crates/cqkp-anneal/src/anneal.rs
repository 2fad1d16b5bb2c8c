//! Simulated annealing with Metropolis single-variable moves.
//!
//! Each requested sample is an independent restart: random initial state,
//! geometric inverse-temperature schedule from hot to cold, optional greedy
//! polish at zero temperature. Binary variables are flipped; bounded
//! integers step by ±1 within their domain.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, warn};

use cqkp_core::error::OracleError;
use cqkp_core::oracle::{OracleConfig, Sample, SolveRequest, SolverOracle};
use cqkp_core::polynomial::Variable;

use crate::energy::{CompiledModel, EnergyModel};

/// Parameters of the annealing schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnealParams {
    /// Sweeps per restart; one sweep proposes one move per variable.
    pub sweeps: usize,
    /// Initial inverse temperature, relative to the largest coefficient
    /// magnitude of the model.
    pub beta_start: f64,
    /// Final inverse temperature, relative to the smallest coefficient
    /// magnitude of the model.
    pub beta_end: f64,
    /// Weight used to price native constraint violations. `None` picks
    /// `1 + Σ|objective coefficients|`, which exceeds any objective gain.
    pub constraint_weight: Option<f64>,
    /// Finish each restart with a zero-temperature descent.
    pub polish: bool,
}

impl Default for AnnealParams {
    fn default() -> Self {
        Self {
            sweeps: 1000,
            beta_start: 0.1,
            beta_end: 10.0,
            constraint_weight: None,
            polish: true,
        }
    }
}

impl AnnealParams {
    /// Absolute inverse temperature for each sweep, geometric from hot to
    /// cold, given the model's `(min, max)` coefficient magnitudes.
    pub fn schedule(&self, range: (f64, f64)) -> Vec<f64> {
        let (lo, hi) = range;
        let hot = self.beta_start / hi;
        let cold = (self.beta_end / lo).max(hot);
        match self.sweeps {
            0 => Vec::new(),
            1 => vec![cold],
            n => {
                let ratio = (cold / hot).powf(1.0 / (n - 1) as f64);
                (0..n).map(|k| hot * ratio.powi(k as i32)).collect()
            }
        }
    }
}

/// In-process simulated-annealing oracle.
#[derive(Debug)]
pub struct AnnealingOracle {
    params: AnnealParams,
    rng: StdRng,
}

impl AnnealingOracle {
    /// Build an oracle; the RNG is seeded from `config.seed` when present.
    pub fn new(config: &OracleConfig, params: AnnealParams) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { params, rng }
    }

    /// Oracle with default parameters and a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(&OracleConfig::seeded(seed), AnnealParams::default())
    }

    /// Annealing parameters.
    pub fn params(&self) -> &AnnealParams {
        &self.params
    }
}

/// Propose a neighbouring value for variable `v` currently at `value`.
fn propose(v: &Variable, value: f64, rng: &mut impl Rng) -> Option<f64> {
    if v.is_binary() {
        return Some(1.0 - value);
    }
    let (lo, hi) = v.domain.bounds();
    let (lo, hi) = (lo as f64, hi as f64);
    if hi <= lo {
        return None;
    }
    let up = if value <= lo {
        true
    } else if value >= hi {
        false
    } else {
        rng.gen::<bool>()
    };
    Some(if up { value + 1.0 } else { value - 1.0 })
}

fn random_state(vars: &[Variable], rng: &mut impl Rng) -> Vec<f64> {
    vars.iter()
        .map(|v| {
            let (lo, hi) = v.domain.bounds();
            rng.gen_range(lo..=hi) as f64
        })
        .collect()
}

/// One Metropolis move at inverse temperature `beta`. Returns the accepted
/// energy change (zero when rejected).
pub fn step<M: EnergyModel>(
    model: &M,
    vars: &[Variable],
    x: &mut [f64],
    beta: f64,
    rng: &mut impl Rng,
) -> f64 {
    let n = x.len();
    if n == 0 {
        return 0.0;
    }
    let i = rng.gen_range(0..n);
    let Some(value) = propose(&vars[i], x[i], rng) else {
        return 0.0;
    };
    let d_e = model.delta(x, i, value);
    let accept = d_e <= 0.0 || rng.gen::<f64>() < (-beta * d_e).exp();
    if accept {
        x[i] = value;
        d_e
    } else {
        0.0
    }
}

/// Zero-temperature descent: apply improving single-variable moves until
/// none is left. Returns the total energy change.
pub fn polish<M: EnergyModel>(model: &M, vars: &[Variable], x: &mut [f64]) -> f64 {
    let mut total = 0.0;
    loop {
        let mut improved = false;
        for (i, v) in vars.iter().enumerate() {
            let (lo, hi) = v.domain.bounds();
            let candidates = if v.is_binary() {
                [Some(1.0 - x[i]), None]
            } else {
                [
                    (x[i] + 1.0 <= hi as f64).then(|| x[i] + 1.0),
                    (x[i] - 1.0 >= lo as f64).then(|| x[i] - 1.0),
                ]
            };
            for value in candidates.into_iter().flatten() {
                let d_e = model.delta(x, i, value);
                if d_e < -1e-12 {
                    x[i] = value;
                    total += d_e;
                    improved = true;
                }
            }
        }
        if !improved {
            return total;
        }
    }
}

impl SolverOracle for AnnealingOracle {
    fn name(&self) -> &str {
        "simulated-annealing"
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

        let weight = self.params.constraint_weight.unwrap_or_else(|| {
            1.0 + request.objective.terms().map(|(_, c)| c.abs()).sum::<f64>()
        });
        let model = CompiledModel::compile(request.objective, request.constraints, weight);
        let vars: Vec<Variable> = model.variables().to_vec();
        let betas = self.params.schedule(model.coefficient_range().unwrap_or((1.0, 1.0)));

        let mut results: Vec<(f64, Vec<f64>)> = Vec::with_capacity(request.num_samples);
        'restarts: for restart in 0..request.num_samples {
            let mut x = random_state(&vars, &mut self.rng);
            let mut energy = model.energy(&x);
            let mut best = (energy, x.clone());

            for (sweep, &beta) in betas.iter().enumerate() {
                if Instant::now() >= deadline {
                    if sweep > 0 {
                        results.push(best);
                    }
                    warn!(restart, sweep, "annealing deadline reached");
                    break 'restarts;
                }
                for _ in 0..vars.len() {
                    energy += step(&model, &vars, &mut x, beta, &mut self.rng);
                    if energy < best.0 {
                        best = (energy, x.clone());
                    }
                }
            }

            if self.params.polish {
                let (mut e, mut y) = best;
                e += polish(&model, &vars, &mut y);
                best = (e, y);
            }
            results.push(best);
        }

        if results.is_empty() {
            return Err(OracleError::SolveTimeout {
                timeout_ms: request.timeout_ms(),
            });
        }

        let best_idx = results
            .iter()
            .enumerate()
            .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
            .map(|(i, _)| i)
            .unwrap_or(0);
        debug!(
            samples = results.len(),
            best_energy = results[best_idx].0,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "annealing finished"
        );

        Ok(results
            .into_iter()
            .enumerate()
            .map(|(i, (_, x))| Sample {
                assignment: model.to_assignment(&x),
                is_best: i == best_idx,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cqkp_core::polynomial::{Polynomial, VariablePool};
    use std::time::Duration;

    #[test]
    fn schedule_is_geometric_and_scaled() {
        let p = AnnealParams {
            sweeps: 3,
            beta_start: 1.0,
            beta_end: 4.0,
            ..Default::default()
        };
        let betas = p.schedule((1.0, 4.0));
        assert_eq!(betas.len(), 3);
        assert!((betas[0] - 0.25).abs() < 1e-12);
        assert!((betas[1] - 1.0).abs() < 1e-12);
        assert!((betas[2] - 4.0).abs() < 1e-12);
        let single = AnnealParams {
            sweeps: 1,
            ..Default::default()
        };
        assert_eq!(single.schedule((1.0, 1.0)), vec![10.0]);
    }

    #[test]
    fn integer_proposals_stay_in_domain() {
        let mut pool = VariablePool::new();
        let s = pool.bounded_integer("s", 0, 2);
        let fixed = pool.bounded_integer("f", 3, 3);
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            assert_eq!(propose(&s, 0.0, &mut rng), Some(1.0));
            assert_eq!(propose(&s, 2.0, &mut rng), Some(1.0));
            let mid = propose(&s, 1.0, &mut rng).unwrap();
            assert!(mid == 0.0 || mid == 2.0);
        }
        assert_eq!(propose(&fixed, 3.0, &mut rng), None);
    }

    #[test]
    fn polish_reaches_local_minimum() {
        let mut pool = VariablePool::new();
        let x = pool.binary_array("x", 2);
        let s = pool.bounded_integer("s", 0, 5);
        let mut p = Polynomial::new();
        p.add_linear(x[0], -1.0);
        p.add_linear(x[1], 2.0);
        // (s - 3)²
        p.add_quadratic(s, s, 1.0);
        p.add_linear(s, -6.0);
        let model = CompiledModel::compile(&p, &[], 0.0);
        let vars = model.variables().to_vec();
        let mut state = vec![0.0, 1.0, 0.0];
        polish(&model, &vars, &mut state);
        assert_eq!(state, vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn seeded_oracle_is_reproducible() {
        let mut pool = VariablePool::new();
        let x = pool.binary_array("x", 6);
        let mut p = Polynomial::new();
        for (i, &v) in x.iter().enumerate() {
            p.add_linear(v, if i % 2 == 0 { -1.0 } else { 1.0 });
        }
        let req = SolveRequest::new(&p, Duration::from_secs(5)).with_num_samples(3);
        let a = AnnealingOracle::seeded(9).submit(&req).unwrap();
        let b = AnnealingOracle::seeded(9).submit(&req).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.iter().filter(|s| s.is_best).count(), 1);
    }

    #[test]
    fn expired_budget_times_out() {
        let mut pool = VariablePool::new();
        let x = pool.binary("x");
        let mut p = Polynomial::new();
        p.add_linear(x, -1.0);
        let req = SolveRequest::new(&p, Duration::ZERO);
        let err = AnnealingOracle::seeded(1).submit(&req).unwrap_err();
        assert_eq!(err, OracleError::SolveTimeout { timeout_ms: 0 });
    }
}
