//! Error types for the CQKP formulation pipeline.
//!
//! Every module that can fail imports its error type from here, so the
//! hierarchy stays in one place:
//!
//! ```text
//! CqkpError (top-level)
//! ├── EncodingError  (slack-variable construction)
//! ├── InstanceError  (instance parsing / validation)
//! ├── ConfigError    (experiment configuration)
//! └── OracleError    (solver submission)
//! ```

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CqkpResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used by orchestration-level functions.
pub type CqkpResult<T> = Result<T, CqkpError>;

// ---------------------------------------------------------------------------
// CqkpError: top-level aggregator
// ---------------------------------------------------------------------------

/// Top-level error type.
///
/// Lower-level functions return their own module-specific error and are
/// coerced into `CqkpError` via [`From`] at the runner boundary.
#[derive(Debug, Error)]
pub enum CqkpError {
    /// Slack encoding failed while building a formulation.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// An instance could not be parsed or validated.
    #[error("Instance error: {0}")]
    Instance(#[from] InstanceError),

    /// The experiment configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The solver oracle failed or timed out.
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}

// ---------------------------------------------------------------------------
// EncodingError
// ---------------------------------------------------------------------------

/// Errors produced by the constraint encoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// A slack variable was requested for a negative bound.
    #[error("Invalid slack bound {bound}: must be >= 0")]
    InvalidBound {
        /// The rejected bound.
        bound: i64,
    },
}

// ---------------------------------------------------------------------------
// InstanceError
// ---------------------------------------------------------------------------

/// Errors produced while building or parsing a problem instance.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// The instance file exists but does not contain valid instance JSON.
    #[error("Cannot parse instance file `{path}`: {source}")]
    Parse {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// In-memory JSON could not be parsed.
    #[error("Malformed instance JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A sparse entry referenced an item outside `0..n`.
    #[error("Index {index} in `{field}` is out of range for {n} items")]
    IndexOutOfRange {
        /// Which sparse table held the entry (`A`, `l` or `Q`).
        field: &'static str,
        /// The offending index.
        index: usize,
        /// Number of items in the instance.
        n: usize,
    },

    /// A scalar field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

impl InstanceError {
    /// Construct an [`InstanceError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        InstanceError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating an [`ExperimentConfig`].
///
/// [`ExperimentConfig`]: crate::config::ExperimentConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read or written.
    #[error("Cannot access config file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OracleError
// ---------------------------------------------------------------------------

/// Errors signalled by a [`SolverOracle`](crate::oracle::SolverOracle).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    /// The time budget elapsed before any sample was produced.
    #[error("Solve timed out after {timeout_ms} ms without producing a sample")]
    SolveTimeout {
        /// The budget that was exceeded.
        timeout_ms: u64,
    },

    /// The oracle returned successfully but with an empty sample list.
    #[error("Oracle `{oracle}` returned no samples")]
    NoSamples {
        /// Name of the oracle.
        oracle: String,
    },

    /// The model is too large for the oracle to handle.
    #[error("Search space of {size} assignments exceeds the limit of {limit}")]
    ProblemTooLarge {
        /// Size of the search space (saturating).
        size: u128,
        /// Configured limit.
        limit: u128,
    },

    /// The model uses a feature the oracle does not support.
    #[error("Oracle `{oracle}` does not support {feature}")]
    Unsupported {
        /// Name of the oracle.
        oracle: String,
        /// The missing capability.
        feature: &'static str,
    },

    /// Any other backend failure (transport, authentication, ...).
    #[error("Backend failure: {0}")]
    Backend(String),
}

impl OracleError {
    /// Construct an [`OracleError::Backend`].
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        OracleError::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_coerce_into_top_level() {
        let err: CqkpError = EncodingError::InvalidBound { bound: -3 }.into();
        assert!(matches!(err, CqkpError::Encoding(_)));
        assert!(err.to_string().contains("-3"));

        let err: CqkpError = OracleError::SolveTimeout { timeout_ms: 1000 }.into();
        assert_eq!(
            err.to_string(),
            "Oracle error: Solve timed out after 1000 ms without producing a sample"
        );
    }

    #[test]
    fn invalid_value_helpers() {
        let err = ConfigError::invalid_value("lambda_cap", "must be >= 0.0");
        assert_eq!(err.to_string(), "Invalid value for `lambda_cap`: must be >= 0.0");
        let err = InstanceError::invalid_value("b", "must be finite");
        assert_eq!(err.to_string(), "Invalid value for `b`: must be finite");
    }
}
