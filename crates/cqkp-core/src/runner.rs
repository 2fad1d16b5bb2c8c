//! Formulate → solve → decode cycles and sample aggregation.

use tracing::{debug, info, warn};

use crate::config::ExperimentConfig;
use crate::decoder::{decode_sample, CqkpSolution};
use crate::error::{CqkpResult, OracleError};
use crate::formulation::{formulate, Formulation};
use crate::instance::Instance;
use crate::oracle::{best_sample_index, Sample, SolveRequest, SolverOracle};

/// Quality statistics over a batch of decoded samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    /// Number of samples.
    pub count: usize,
    /// Arithmetic mean of `obj`.
    pub mean: f64,
    /// Population standard deviation of `obj`.
    pub std_dev: f64,
    /// Largest `obj` among feasible samples, if any is feasible.
    pub best_feasible: Option<f64>,
    /// Number of samples satisfying both constraints.
    pub feasible: usize,
}

/// Summarise `solutions`. Returns `None` for an empty slice.
pub fn summarize(solutions: &[CqkpSolution]) -> Option<SampleSummary> {
    if solutions.is_empty() {
        return None;
    }
    let count = solutions.len();
    let mean = solutions.iter().map(|s| s.obj).sum::<f64>() / count as f64;
    let var = solutions.iter().map(|s| (s.obj - mean).powi(2)).sum::<f64>() / count as f64;
    let feasible: Vec<f64> = solutions.iter().filter(|s| s.is_feasible()).map(|s| s.obj).collect();
    Some(SampleSummary {
        count,
        mean,
        std_dev: var.sqrt(),
        best_feasible: feasible.iter().copied().reduce(f64::max),
        feasible: feasible.len(),
    })
}

fn check_capabilities<O: SolverOracle>(
    oracle: &O,
    formulation: &Formulation,
) -> Result<(), OracleError> {
    if !formulation.constraints.is_empty() && !oracle.supports_native_constraints() {
        return Err(OracleError::Unsupported {
            oracle: oracle.name().to_string(),
            feature: "native inequality constraints",
        });
    }
    if formulation.has_integer_variables() && !oracle.supports_integer_variables() {
        return Err(OracleError::Unsupported {
            oracle: oracle.name().to_string(),
            feature: "bounded-integer variables",
        });
    }
    Ok(())
}

fn solve<O: SolverOracle>(
    oracle: &mut O,
    formulation: &Formulation,
    config: &ExperimentConfig,
    num_samples: usize,
) -> CqkpResult<Vec<Sample>> {
    check_capabilities(oracle, formulation)?;
    let request = SolveRequest::new(&formulation.hamiltonian, config.timeout())
        .with_constraints(&formulation.constraints)
        .with_num_samples(num_samples);
    debug!(
        oracle = oracle.name(),
        variant = %formulation.variant,
        variables = formulation.num_variables(),
        num_samples,
        timeout_ms = config.timeout_ms,
        "submitting to oracle"
    );
    let samples = oracle.submit(&request)?;
    if samples.is_empty() {
        let oracle = oracle.name().to_string();
        return Err(OracleError::NoSamples { oracle }.into());
    }
    Ok(samples)
}

/// One formulate → solve → decode cycle.
///
/// Decodes the sample the oracle flags as best (the first one when none is
/// flagged).
///
/// # Errors
///
/// Encoding errors from formulation, capability mismatches and oracle
/// failures, including [`OracleError::SolveTimeout`].
pub fn run_single<O: SolverOracle>(
    oracle: &mut O,
    instance: &Instance,
    config: &ExperimentConfig,
) -> CqkpResult<CqkpSolution> {
    let formulation = formulate(instance, config.variant, &config.formulation_params())?;
    let samples = solve(oracle, &formulation, config, 1)?;
    let best = best_sample_index(&samples).unwrap_or(0);
    let solution = decode_sample(instance, &formulation.decode_map, &samples[best].assignment);
    debug!(%solution, "decoded best sample");
    Ok(solution)
}

/// Draw `num_samples` assignments from a single oracle submission and decode
/// each one.
///
/// Logs the mean and standard deviation of the recomputed objective. The
/// result has `num_samples` entries unless the oracle returned fewer, which
/// is logged as a warning. Surplus samples are dropped.
pub fn run_multiple<O: SolverOracle>(
    oracle: &mut O,
    instance: &Instance,
    config: &ExperimentConfig,
    num_samples: usize,
) -> CqkpResult<Vec<CqkpSolution>> {
    let formulation = formulate(instance, config.variant, &config.formulation_params())?;
    let samples = solve(oracle, &formulation, config, num_samples)?;
    if samples.len() < num_samples {
        warn!(
            oracle = oracle.name(),
            requested = num_samples,
            received = samples.len(),
            "oracle returned partial results"
        );
    } else if samples.len() > num_samples {
        debug!(
            oracle = oracle.name(),
            requested = num_samples,
            received = samples.len(),
            "dropping surplus samples"
        );
    }

    let solutions: Vec<CqkpSolution> = samples
        .iter()
        .take(num_samples)
        .map(|s| decode_sample(instance, &formulation.decode_map, &s.assignment))
        .collect();

    if let Some(summary) = summarize(&solutions) {
        info!(
            variant = %config.variant,
            count = summary.count,
            mean = summary.mean,
            std = summary.std_dev,
            feasible = summary.feasible,
            best_feasible = ?summary.best_feasible,
            "sample summary"
        );
    }
    Ok(solutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CqkpError;
    use crate::formulation::Variant;
    use crate::polynomial::Assignment;
    use std::collections::BTreeSet;

    /// Returns a fixed set of assignments built from the request's variables.
    struct ReplayOracle {
        batches: Vec<Vec<Sample>>,
        native: bool,
    }

    impl SolverOracle for ReplayOracle {
        fn name(&self) -> &str {
            "replay"
        }
        fn supports_native_constraints(&self) -> bool {
            self.native
        }
        fn supports_integer_variables(&self) -> bool {
            false
        }
        fn submit(&mut self, _request: &SolveRequest<'_>) -> Result<Vec<Sample>, OracleError> {
            self.batches.pop().ok_or(OracleError::SolveTimeout { timeout_ms: 1 })
        }
    }

    fn scenario() -> Instance {
        Instance::from_dense(1, 5.0, &[2.0, 3.0, 4.0], &[1.0, 5.0, 2.0], &[]).unwrap()
    }

    fn pick(items: &[u32]) -> Sample {
        // x[i] has id i in every formulation.
        Sample {
            assignment: items
                .iter()
                .map(|&i| (crate::polynomial::VarId(i), 1.0))
                .collect::<Assignment>(),
            is_best: false,
        }
    }

    fn solution(obj: f64, feasible: bool) -> CqkpSolution {
        CqkpSolution {
            items: BTreeSet::new(),
            obj,
            card: feasible,
            cap: true,
            slacks: vec![],
        }
    }

    #[test]
    fn summary_statistics() {
        let sols = [solution(1.0, true), solution(3.0, false), solution(5.0, true)];
        let s = summarize(&sols).unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.mean, 3.0);
        assert!((s.std_dev - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.feasible, 2);
        assert_eq!(s.best_feasible, Some(5.0));
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn run_single_uses_flagged_sample() {
        let mut best = pick(&[1]);
        best.is_best = true;
        let mut oracle = ReplayOracle {
            batches: vec![vec![pick(&[0]), best]],
            native: true,
        };
        let cfg = ExperimentConfig::for_variant(Variant::QuadraticPenaltyCard);
        let sol = run_single(&mut oracle, &scenario(), &cfg).unwrap();
        assert_eq!(sol.items, BTreeSet::from([1]));
        assert_eq!(sol.obj, 5.0);
    }

    #[test]
    fn run_multiple_decodes_every_sample() {
        let batch = vec![pick(&[0]), pick(&[1]), pick(&[2]), pick(&[1, 2]), pick(&[])];
        let mut oracle = ReplayOracle {
            batches: vec![batch],
            native: true,
        };
        let cfg = ExperimentConfig::for_variant(Variant::LinearPenalty);
        let sols = run_multiple(&mut oracle, &scenario(), &cfg, 5).unwrap();
        assert_eq!(sols.len(), 5);
        let objs: Vec<f64> = sols.iter().map(|s| s.obj).collect();
        assert_eq!(objs, vec![1.0, 5.0, 2.0, 7.0, 0.0]);
        assert!(!sols[3].is_feasible());
        let summary = summarize(&sols).unwrap();
        assert_eq!(summary.mean, 3.0);
    }

    #[test]
    fn partial_results_are_returned() {
        let mut oracle = ReplayOracle {
            batches: vec![vec![pick(&[1]), pick(&[0])]],
            native: true,
        };
        let cfg = ExperimentConfig::for_variant(Variant::BinarySlack);
        let sols = run_multiple(&mut oracle, &scenario(), &cfg, 5).unwrap();
        assert_eq!(sols.len(), 2);
    }

    #[test]
    fn surplus_samples_are_dropped() {
        let batch = vec![pick(&[1]), pick(&[0]), pick(&[2]), pick(&[])];
        let mut oracle = ReplayOracle {
            batches: vec![batch],
            native: true,
        };
        let cfg = ExperimentConfig::for_variant(Variant::BinarySlack);
        let sols = run_multiple(&mut oracle, &scenario(), &cfg, 2).unwrap();
        let objs: Vec<f64> = sols.iter().map(|s| s.obj).collect();
        assert_eq!(objs, vec![5.0, 1.0]);
    }

    #[test]
    fn timeout_surfaces_to_caller() {
        let mut oracle = ReplayOracle {
            batches: vec![],
            native: true,
        };
        let err = run_single(&mut oracle, &scenario(), &ExperimentConfig::default()).unwrap_err();
        assert!(matches!(err, CqkpError::Oracle(OracleError::SolveTimeout { .. })));
    }

    #[test]
    fn empty_sample_list_is_an_error() {
        let mut oracle = ReplayOracle {
            batches: vec![vec![]],
            native: true,
        };
        let err = run_single(&mut oracle, &scenario(), &ExperimentConfig::default()).unwrap_err();
        assert!(matches!(err, CqkpError::Oracle(OracleError::NoSamples { .. })));
    }

    #[test]
    fn capability_mismatch_is_rejected_before_submit() {
        let mut oracle = ReplayOracle {
            batches: vec![vec![pick(&[1])]],
            native: false,
        };
        let cfg = ExperimentConfig::for_variant(Variant::Naive);
        let err = run_single(&mut oracle, &scenario(), &cfg).unwrap_err();
        assert!(matches!(err, CqkpError::Oracle(OracleError::Unsupported { .. })));
        assert_eq!(oracle.batches.len(), 1);

        let cfg = ExperimentConfig {
            slack_mode: Some(crate::encoder::SlackMode::NativeInteger),
            ..ExperimentConfig::default()
        };
        assert!(run_single(&mut oracle, &scenario(), &cfg).is_err());
    }
}
