//! Multiple imputation and causal adjacency pruning for data with missing values.
//!
//! Both routines are delegated to an external R engine. This crate validates the
//! inputs, writes them into a per-call temporary workspace, runs the engine as a
//! subprocess and reads its output back into `ndarray` arrays.
//!
//! - [`impute`]: multiple imputation by chained equations.
//! - [`estimate_adjacency`]: adaptive-lasso pruning of a causal adjacency matrix
//!   across a stack of imputed datasets.

#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod error;

#[path = "../shared/mod.rs"]
pub mod shared;

#[path = "../impute/mod.rs"]
pub mod impute;

#[path = "../prune/mod.rs"]
pub mod prune;

#[cfg(feature = "python")]
mod python;

pub use error::BridgeError;
pub use impute::{ImputeOptions, impute, impute_with};
pub use prune::{
    AdaptiveWeightMode, PruneOptions, causal_order_from_values, datasets_from_dyn,
    estimate_adjacency, estimate_adjacency_with, stack_datasets,
};
pub use shared::engine::{EngineConfig, Invocation, RunOutput, ScriptRunner, SubprocessRunner};
pub use shared::validate::ValidationError;
