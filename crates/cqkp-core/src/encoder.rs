//! Slack-variable encodings that turn `expr ≤ B` into `expr + s = B`.
//!
//! A [`SlackEncoding`] represents an integer `s ∈ [0, B]` as a weighted sum
//! of auxiliary variables. Three representations are available:
//!
//! | Mode | Variables | Weights |
//! |------|-----------|---------|
//! | [`SlackMode::Binary`] | `⌈log₂(B+1)⌉` binaries | `1, 2, 4, …, 2^(m-2), B - (2^(m-1) - 1)` |
//! | [`SlackMode::Unary`] | `B` binaries | all `1` (thermometer code) |
//! | [`SlackMode::NativeInteger`] | one integer in `[0, B]` | `1` |
//!
//! The last binary weight is truncated so the achievable range is exactly
//! `[0, B]` rather than `[0, 2^m - 1]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

use crate::error::EncodingError;
use crate::polynomial::{Assignment, LinearExpr, Variable, VariablePool};

/// How a slack integer is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlackMode {
    /// Log encoding over binary variables.
    #[default]
    Binary,
    /// Unary (thermometer) encoding over binary variables.
    ///
    /// Uses `B` variables rather than `B + 1`, so the slack cannot exceed `B`.
    Unary,
    /// A single bounded-integer variable, for oracles that support one.
    NativeInteger,
}

impl SlackMode {
    /// Stable kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlackMode::Binary => "binary",
            SlackMode::Unary => "unary",
            SlackMode::NativeInteger => "native-integer",
        }
    }
}

impl fmt::Display for SlackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary variables representing one slack integer.
#[derive(Debug, Clone, PartialEq)]
pub struct SlackEncoding {
    name: String,
    mode: SlackMode,
    bound: u64,
    variables: Vec<Variable>,
    weights: Vec<u64>,
}

/// Positional weights of the log encoding for bound `bound`.
///
/// Returns an empty vector for `bound == 0`. The weights always sum to
/// `bound`, and every integer in `[0, bound]` is a subset sum.
pub fn binary_weights(bound: u64) -> Vec<u64> {
    if bound == 0 {
        return Vec::new();
    }
    let m = (u64::BITS - bound.leading_zeros()) as usize;
    let mut weights: Vec<u64> = (0..m - 1).map(|i| 1u64 << i).collect();
    weights.push(bound - ((1u64 << (m - 1)) - 1));
    weights
}

/// Allocate the slack variables for `0 ≤ s ≤ bound` from `pool`.
///
/// # Errors
///
/// Returns [`EncodingError::InvalidBound`] when `bound` is negative.
pub fn encode_slack(
    pool: &mut VariablePool,
    name: &str,
    bound: i64,
    mode: SlackMode,
) -> Result<SlackEncoding, EncodingError> {
    if bound < 0 {
        return Err(EncodingError::InvalidBound { bound });
    }
    let b = bound as u64;
    let (variables, weights) = match mode {
        SlackMode::Binary => {
            let weights = binary_weights(b);
            (pool.binary_array(name, weights.len()), weights)
        }
        SlackMode::Unary => (pool.binary_array(name, b as usize), vec![1; b as usize]),
        SlackMode::NativeInteger => (vec![pool.bounded_integer(name, 0, bound)], vec![1]),
    };
    Ok(SlackEncoding {
        name: name.to_string(),
        mode,
        bound: b,
        variables,
        weights,
    })
}

impl SlackEncoding {
    /// Name prefix of the auxiliary variables.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encoding mode.
    pub fn mode(&self) -> SlackMode {
        self.mode
    }

    /// Upper bound `B`.
    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Auxiliary variables, in weight order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Weight of each auxiliary variable.
    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    /// Number of auxiliary binary variables (zero for native integers).
    pub fn num_binaries(&self) -> usize {
        self.variables.iter().filter(|v| v.is_binary()).count()
    }

    /// The slack as an affine expression `Σ wᵢ·sᵢ`.
    pub fn expr(&self) -> LinearExpr {
        let terms = self.variables.iter().zip(&self.weights);
        LinearExpr::weighted_sum(terms.map(|(&v, &w)| (v, w as f64)))
    }

    /// Every integer the encoding can represent.
    ///
    /// Enumerates subset sums, so only meant for small binary encodings.
    pub fn representable_values(&self) -> BTreeSet<u64> {
        match self.mode {
            SlackMode::NativeInteger => (0..=self.bound).collect(),
            SlackMode::Unary => (0..=self.weights.len() as u64).collect(),
            SlackMode::Binary => {
                let mut sums = BTreeSet::from([0u64]);
                for &w in &self.weights {
                    let shifted: Vec<u64> = sums.iter().map(|s| s + w).collect();
                    sums.extend(shifted);
                }
                sums
            }
        }
    }

    /// Decode the slack value from a raw oracle assignment.
    ///
    /// Binary auxiliaries are thresholded at 0.5; a native integer is
    /// rounded. A value outside `[0, B]` means the oracle returned a sample
    /// that violates the variable domain; it is logged and returned as-is.
    pub fn decode(&self, assignment: &Assignment) -> i64 {
        let value: i64 = self
            .variables
            .iter()
            .zip(&self.weights)
            .map(|(v, &w)| {
                let raw = assignment.get(v.id);
                let level = if v.is_binary() {
                    i64::from(raw > 0.5)
                } else {
                    raw.round() as i64
                };
                level * w as i64
            })
            .sum();
        if !self.in_range(value) {
            warn!(
                slack = %self.name,
                value,
                bound = self.bound,
                "decoded slack value outside [0, B]"
            );
        }
        value
    }

    /// Whether `value` lies in `[0, B]`.
    pub fn in_range(&self, value: i64) -> bool {
        value >= 0 && (value as u64) <= self.bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::Domain;

    #[test]
    fn binary_weights_match_known_values() {
        assert_eq!(binary_weights(0), Vec::<u64>::new());
        assert_eq!(binary_weights(1), vec![1]);
        assert_eq!(binary_weights(2), vec![1, 1]);
        assert_eq!(binary_weights(3), vec![1, 2]);
        assert_eq!(binary_weights(5), vec![1, 2, 2]);
        assert_eq!(binary_weights(8), vec![1, 2, 4, 1]);
        assert_eq!(binary_weights(15), vec![1, 2, 4, 8]);
    }

    #[test]
    fn binary_weights_sum_to_bound_with_log_count() {
        for b in 1..200u64 {
            let w = binary_weights(b);
            assert_eq!(w.iter().sum::<u64>(), b);
            let expected_len = (b as f64 + 1.0).log2().ceil() as usize;
            assert_eq!(w.len(), expected_len, "bound {b}");
        }
    }

    #[test]
    fn negative_bound_is_rejected() {
        let mut pool = VariablePool::new();
        let err = encode_slack(&mut pool, "s", -1, SlackMode::Binary).unwrap_err();
        assert_eq!(err, EncodingError::InvalidBound { bound: -1 });
        assert!(pool.is_empty());
    }

    #[test]
    fn zero_bound_has_no_binaries() {
        let mut pool = VariablePool::new();
        let s = encode_slack(&mut pool, "s", 0, SlackMode::Binary).unwrap();
        assert!(s.variables().is_empty());
        assert_eq!(s.representable_values(), BTreeSet::from([0]));
        let u = encode_slack(&mut pool, "u", 0, SlackMode::Unary).unwrap();
        assert!(u.variables().is_empty());
        assert_eq!(u.decode(&Assignment::new()), 0);
    }

    #[test]
    fn variable_counts_per_mode() {
        let mut pool = VariablePool::new();
        let bin = encode_slack(&mut pool, "b", 10, SlackMode::Binary).unwrap();
        let una = encode_slack(&mut pool, "u", 10, SlackMode::Unary).unwrap();
        let nat = encode_slack(&mut pool, "n", 10, SlackMode::NativeInteger).unwrap();
        assert_eq!(bin.num_binaries(), 4);
        assert_eq!(una.num_binaries(), 10);
        assert_eq!(nat.num_binaries(), 0);
        assert_eq!(nat.variables()[0].domain, Domain::BoundedInteger { lo: 0, hi: 10 });
        assert_eq!(pool.len(), 15);
    }

    #[test]
    fn all_modes_represent_the_same_range() {
        for b in 0..=24i64 {
            let mut pool = VariablePool::new();
            let expected: BTreeSet<u64> = (0..=b as u64).collect();
            for mode in [SlackMode::Binary, SlackMode::Unary, SlackMode::NativeInteger] {
                let s = encode_slack(&mut pool, "s", b, mode).unwrap();
                assert_eq!(s.representable_values(), expected, "bound {b}, mode {mode}");
            }
        }
    }

    #[test]
    fn decode_thresholds_binaries() {
        let mut pool = VariablePool::new();
        let s = encode_slack(&mut pool, "s", 5, SlackMode::Binary).unwrap();
        let vars = s.variables();
        let a = Assignment::new()
            .with(vars[0].id, 0.9)
            .with(vars[1].id, 0.2)
            .with(vars[2].id, 1.0);
        assert_eq!(s.decode(&a), 1 + 2);
        assert_eq!(s.expr().evaluate(&Assignment::new().with(vars[2].id, 1.0)), 2.0);
    }

    #[test]
    fn decode_out_of_range_is_soft() {
        let mut pool = VariablePool::new();
        let s = encode_slack(&mut pool, "s", 4, SlackMode::NativeInteger).unwrap();
        let a = Assignment::new().with(s.variables()[0].id, 7.0);
        assert_eq!(s.decode(&a), 7);
        assert!(!s.in_range(7));
        assert!(s.in_range(4));
    }

    #[test]
    fn mode_serde_names() {
        let json = serde_json::to_string(&SlackMode::NativeInteger).unwrap();
        assert_eq!(json, "\"native-integer\"");
        let back: SlackMode = serde_json::from_str("\"unary\"").unwrap();
        assert_eq!(back, SlackMode::Unary);
    }
}
