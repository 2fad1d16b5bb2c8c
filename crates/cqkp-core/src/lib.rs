//! # cqkp-core -- QUBO formulations of the quadratic knapsack
//!
//! Formulates the **Cardinality-Constrained Quadratic Knapsack Problem**
//! (select items maximising linear + pairwise value under a budget and a
//! count cap) as an unconstrained quadratic Hamiltonian for an external
//! annealing-style oracle, then decodes and scores the samples it returns.
//!
//! ## Architecture
//!
//! ```text
//! Instance ──► formulate(variant) ──► Polynomial ──► SolverOracle
//!                  │                                     │
//!            encode_slack                           Vec<Sample>
//!                                                        │
//!                         CqkpSolution ◄── decode_sample ┘
//!                              │
//!                    run_single / run_multiple ──► SampleSummary
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cqkp_core::prelude::*;
//!
//! let instance = Instance::from_dense(1, 5.0, &[2.0, 3.0, 4.0], &[1.0, 5.0, 2.0], &[]).unwrap();
//! let params = FormulationParams::new(10.0, 10.0);
//! let formulation = formulate(&instance, Variant::BinarySlack, &params).unwrap();
//!
//! assert_eq!(formulation.decode_map.items.len(), 3);
//! assert_eq!(formulation.num_auxiliary(), 3); // ⌈log2(5 + 1)⌉ slack bits
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod formulation;
pub mod generator;
pub mod instance;
pub mod oracle;
pub mod polynomial;
pub mod runner;

pub use config::ExperimentConfig;
pub use decoder::{decode_items, decode_sample, evaluate_objective, CqkpSolution, Evaluation};
pub use encoder::{encode_slack, SlackEncoding, SlackMode};
pub use error::{ConfigError, CqkpError, CqkpResult, EncodingError, InstanceError, OracleError};
pub use formulation::{formulate, DecodeMap, Formulation, FormulationParams, Variant};
pub use instance::{load_instance, Instance};
pub use oracle::{OracleConfig, Sample, SolveRequest, SolverOracle};
pub use polynomial::{
    Assignment, Domain, LinearConstraint, LinearExpr, Monomial, Polynomial, VarId, Variable,
};
pub use runner::{run_multiple, run_single, summarize, SampleSummary};

/// Re-exports of the most commonly used items.
pub mod prelude {
    pub use crate::config::ExperimentConfig;
    pub use crate::decoder::{decode_sample, evaluate_objective, CqkpSolution};
    pub use crate::error::{CqkpError, CqkpResult};
    pub use crate::formulation::{formulate, Formulation, FormulationParams, Variant};
    pub use crate::instance::{load_instance, Instance};
    pub use crate::oracle::{OracleConfig, Sample, SolveRequest, SolverOracle};
    pub use crate::polynomial::{Assignment, Polynomial};
    pub use crate::runner::{run_multiple, run_single};
}
