//! Problem instances of the cardinality-constrained quadratic knapsack.
//!
//! An [`Instance`] holds `N` items with weights `A`, linear values `L`, a
//! sparse quadratic value table `Q`, a budget `b` and a cardinality cap `k`.
//! All three tables are sparse maps: missing entries read as zero, and
//! `Q[i, j]` and `Q[j, i]` are independent coefficients.
//!
//! # File format
//!
//! ```json
//! { "N": 3, "k": 1, "b": 5,
//!   "A": [[0, 2], [1, 3], [2, 4]],
//!   "l": [[0, 1], [1, 5], [2, 2]],
//!   "Q": [[0, 1, 0.5]] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::InstanceError;

/// An immutable CQKP instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    n: usize,
    k: usize,
    budget: f64,
    weights: BTreeMap<usize, f64>,
    linear: BTreeMap<usize, f64>,
    quadratic: BTreeMap<(usize, usize), f64>,
}

/// On-disk layout of an instance file.
#[derive(Debug, Serialize, Deserialize)]
struct InstanceFile {
    #[serde(rename = "N")]
    n: usize,
    k: usize,
    b: f64,
    #[serde(rename = "A", default)]
    weights: Vec<(usize, f64)>,
    #[serde(rename = "l", default)]
    linear: Vec<(usize, f64)>,
    #[serde(rename = "Q", default)]
    quadratic: Vec<(usize, usize, f64)>,
}

fn check_index(field: &'static str, index: usize, n: usize) -> Result<(), InstanceError> {
    if index >= n {
        return Err(InstanceError::IndexOutOfRange { field, index, n });
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), InstanceError> {
    if !value.is_finite() {
        return Err(InstanceError::invalid_value(field, format!("non-finite entry {value}")));
    }
    Ok(())
}

impl Instance {
    /// Build an instance from sparse tables.
    ///
    /// Later duplicates of the same index overwrite earlier ones; exact
    /// zeros are not stored.
    ///
    /// # Errors
    ///
    /// [`InstanceError::IndexOutOfRange`] for an index `>= n`, and
    /// [`InstanceError::InvalidValue`] for a negative or non-finite budget or
    /// a non-finite table entry.
    pub fn new<W, L, Q>(
        n: usize,
        k: usize,
        budget: f64,
        weights: W,
        linear: L,
        quadratic: Q,
    ) -> Result<Self, InstanceError>
    where
        W: IntoIterator<Item = (usize, f64)>,
        L: IntoIterator<Item = (usize, f64)>,
        Q: IntoIterator<Item = (usize, usize, f64)>,
    {
        if !budget.is_finite() || budget < 0.0 {
            return Err(InstanceError::invalid_value(
                "b",
                format!("must be finite and >= 0, got {budget}"),
            ));
        }

        let mut a = BTreeMap::new();
        for (i, w) in weights {
            check_index("A", i, n)?;
            check_finite("A", w)?;
            a.insert(i, w);
        }
        let mut l = BTreeMap::new();
        for (i, v) in linear {
            check_index("l", i, n)?;
            check_finite("l", v)?;
            l.insert(i, v);
        }
        let mut q = BTreeMap::new();
        for (i, j, v) in quadratic {
            check_index("Q", i, n)?;
            check_index("Q", j, n)?;
            check_finite("Q", v)?;
            q.insert((i, j), v);
        }
        a.retain(|_, v| *v != 0.0);
        l.retain(|_, v| *v != 0.0);
        q.retain(|_, v| *v != 0.0);

        Ok(Self {
            n,
            k,
            budget,
            weights: a,
            linear: l,
            quadratic: q,
        })
    }

    /// Build an instance from dense weight and value vectors plus sparse
    /// quadratic triples. `n` is `weights.len()`.
    pub fn from_dense(
        k: usize,
        budget: f64,
        weights: &[f64],
        linear: &[f64],
        quadratic: &[(usize, usize, f64)],
    ) -> Result<Self, InstanceError> {
        if weights.len() != linear.len() {
            return Err(InstanceError::invalid_value(
                "l",
                format!("length {} does not match {} weights", linear.len(), weights.len()),
            ));
        }
        Self::new(
            weights.len(),
            k,
            budget,
            weights.iter().copied().enumerate(),
            linear.iter().copied().enumerate(),
            quadratic.iter().copied(),
        )
    }

    /// Parse an instance from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, InstanceError> {
        let raw: InstanceFile = serde_json::from_str(json)?;
        Self::from_file_layout(raw)
    }

    fn from_file_layout(raw: InstanceFile) -> Result<Self, InstanceError> {
        Self::new(raw.n, raw.k, raw.b, raw.weights, raw.linear, raw.quadratic)
    }

    /// Serialize to the sparse JSON layout accepted by [`load_instance`].
    pub fn to_json_string(&self) -> Result<String, InstanceError> {
        let raw = InstanceFile {
            n: self.n,
            k: self.k,
            b: self.budget,
            weights: self.weights().collect(),
            linear: self.linear_values().collect(),
            quadratic: self.quadratic_values().collect(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Number of items `N`.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Cardinality cap `k`.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Budget `b`.
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Weight `A[i]` (zero when absent).
    pub fn weight(&self, i: usize) -> f64 {
        self.weights.get(&i).copied().unwrap_or(0.0)
    }

    /// Linear value `L[i]` (zero when absent).
    pub fn linear(&self, i: usize) -> f64 {
        self.linear.get(&i).copied().unwrap_or(0.0)
    }

    /// Quadratic value `Q[i, j]` (zero when absent).
    pub fn quadratic(&self, i: usize, j: usize) -> f64 {
        self.quadratic.get(&(i, j)).copied().unwrap_or(0.0)
    }

    /// Non-zero weights as `(i, A[i])`.
    pub fn weights(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights.iter().map(|(i, w)| (*i, *w))
    }

    /// Non-zero linear values as `(i, L[i])`.
    pub fn linear_values(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.linear.iter().map(|(i, v)| (*i, *v))
    }

    /// Non-zero quadratic values as `(i, j, Q[i, j])`.
    pub fn quadratic_values(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.quadratic.iter().map(|((i, j), v)| (*i, *j, *v))
    }

    /// Linear values that enter the objective: strictly positive only.
    pub fn positive_linear(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.linear_values().filter(|(_, v)| *v > 0.0)
    }

    /// Quadratic values that enter the objective: strictly positive only.
    pub fn positive_quadratic(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.quadratic_values().filter(|(_, _, v)| *v > 0.0)
    }

    /// Sum of all item weights.
    pub fn total_weight(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// Load an instance file.
///
/// A missing or unreadable file yields `Ok(None)`; callers must check for
/// absence before use.
///
/// # Errors
///
/// [`InstanceError::Parse`] when the file is not valid instance JSON, and
/// the validation errors of [`Instance::new`].
pub fn load_instance(path: &Path) -> Result<Option<Instance>, InstanceError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Cannot read instance file {}: {e}", path.display());
            return Ok(None);
        }
    };
    let raw: InstanceFile = serde_json::from_str(&contents)
        .map_err(|source| InstanceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let instance = Instance::from_file_layout(raw)?;
    debug!(
        path = %path.display(),
        n = instance.n(),
        k = instance.k(),
        b = instance.budget(),
        quadratic_entries = instance.quadratic.len(),
        "loaded instance"
    );
    Ok(Some(instance))
}
