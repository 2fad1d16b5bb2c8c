//! Seeded random instance generation for experiments and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::InstanceError;
use crate::instance::Instance;

/// Generate a random instance with `n` items.
///
/// - weights `A[i]` are integers in `[1, 50]`
/// - linear values `L[i]` are integers in `[1, 100]`
/// - each pair `i < j` gets `Q[i, j] ∈ [1, 100]` with probability `density`
/// - `k = max(1, n / 4)` and `b = ⌊Σ A / 2⌋`
///
/// The same `(n, density, seed)` always yields the same instance.
///
/// # Errors
///
/// [`InstanceError::InvalidValue`] if `density` is outside `[0, 1]`.
pub fn generate_instance(n: usize, density: f64, seed: u64) -> Result<Instance, InstanceError> {
    if !(0.0..=1.0).contains(&density) {
        return Err(InstanceError::invalid_value(
            "density",
            format!("must be in [0, 1], got {density}"),
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let weights: Vec<f64> = (0..n).map(|_| rng.gen_range(1..=50) as f64).collect();
    let linear: Vec<f64> = (0..n).map(|_| rng.gen_range(1..=100) as f64).collect();
    let mut quadratic = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if rng.gen::<f64>() < density {
                quadratic.push((i, j, rng.gen_range(1..=100) as f64));
            }
        }
    }

    let k = (n / 4).max(1);
    let budget = (weights.iter().sum::<f64>() / 2.0).floor();
    Instance::from_dense(k, budget, &weights, &linear, &quadratic)
}
