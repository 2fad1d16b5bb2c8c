//! # cqkp-anneal -- in-process reference oracles
//!
//! Two [`SolverOracle`](cqkp_core::SolverOracle) implementations for
//! Hamiltonians produced by `cqkp-core`, useful wherever a remote annealer
//! is unavailable:
//!
//! - [`AnnealingOracle`]: Metropolis simulated annealing with a geometric
//!   schedule, one restart per requested sample. Native constraints are
//!   priced as squared excess.
//! - [`ExhaustiveOracle`]: exact enumeration for small problems, with native
//!   constraints applied as a hard filter.
//!
//! Both accept bounded-integer variables.
//!
//! ```rust
//! use cqkp_anneal::ExhaustiveOracle;
//! use cqkp_core::prelude::*;
//!
//! let instance = Instance::from_dense(1, 5.0, &[2.0, 3.0, 4.0], &[1.0, 5.0, 2.0], &[]).unwrap();
//! let config = ExperimentConfig::for_variant(Variant::BinarySlack);
//! let solution = run_single(&mut ExhaustiveOracle::new(), &instance, &config).unwrap();
//! assert_eq!(solution.obj, 5.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anneal;
pub mod energy;
pub mod exhaustive;

pub use anneal::{AnnealParams, AnnealingOracle};
pub use energy::{CompiledModel, EnergyModel};
pub use exhaustive::{ExhaustiveOracle, DEFAULT_MAX_STATES};
