//! # Adaptive-Lasso Adjacency Pruning
//!
//! Given several imputed completions of one dataset and a causal order over its
//! features, the engine regresses each feature on the features that precede it
//! in the order, pooling all completions into one weighted fit, and keeps only
//! the coefficients that survive an adaptive-lasso penalty.
//!
//! Row `i` of the returned matrix holds the coefficients of the edges entering
//! feature `i`: entry `(i, j)` is the effect of feature `j` on feature `i`, and
//! it is zero unless `j` precedes `i` in the causal order. Prior knowledge uses
//! the same orientation.

use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use ndarray::{Array1, Array2};

use crate::error::BridgeError;
use crate::shared::engine::{EngineConfig, EngineScript, ScriptRunner, SubprocessRunner, execute};
use crate::shared::validate::ValidationError;

mod io;
mod validate;

pub use validate::{causal_order_from_values, datasets_from_dyn, stack_datasets};

/// Which cross-validated penalty picks the ridge fit behind the adaptive weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdaptiveWeightMode {
    /// The penalty with the lowest cross-validation error.
    Min,
    /// The largest penalty within one standard error of the minimum.
    OneStandardError,
}

impl Default for AdaptiveWeightMode {
    fn default() -> Self {
        Self::Min
    }
}

impl AdaptiveWeightMode {
    /// The token the engine expects.
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::OneStandardError => "1se",
        }
    }
}

impl fmt::Display for AdaptiveWeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for AdaptiveWeightMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(Self::Min),
            "1se" => Ok(Self::OneStandardError),
            other => Err(ValidationError::UnknownWeightMode(other.to_string())),
        }
    }
}

/// Optional arguments of [`estimate_adjacency`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PruneOptions {
    /// Per-feature flag; discrete targets are fitted with a logistic model.
    pub is_discrete: Option<Vec<bool>>,
    pub weight_mode: AdaptiveWeightMode,
    /// Per-sample weights, shared across all completions. Defaults to ones.
    pub weights: Option<Array1<f64>>,
    /// `(n_features, n_features)` matrix: `0` forbids the edge `j -> i` at
    /// `(i, j)`, `1` forces it to be kept unpenalized, `-1` leaves it free.
    pub prior_knowledge: Option<Array2<i8>>,
    pub seed: Option<i64>,
}

/// Estimates the pruned adjacency matrix with the default engine.
///
/// `datasets` are the imputed completions, all `(n_samples, n_features)` and
/// fully observed. `causal_order` must be a permutation of `0..n_features`.
pub fn estimate_adjacency(
    datasets: &[Array2<f64>],
    causal_order: &[usize],
    options: &PruneOptions,
) -> Result<Array2<f64>, BridgeError> {
    estimate_adjacency_with(
        datasets,
        causal_order,
        options,
        &EngineConfig::default(),
        &SubprocessRunner,
    )
}

/// Like [`estimate_adjacency`], with an explicit engine configuration and runner.
pub fn estimate_adjacency_with(
    datasets: &[Array2<f64>],
    causal_order: &[usize],
    options: &PruneOptions,
    config: &EngineConfig,
    runner: &dyn ScriptRunner,
) -> Result<Array2<f64>, BridgeError> {
    let request = validate::validate(datasets, causal_order, options)?;
    info!(
        "Pruning adjacency: {} datasets, {} samples, {} features, ad_weight_type={}",
        request.datasets.len(),
        request.n_samples,
        request.n_features,
        request.weight_mode
    );
    if request.prior_knowledge.is_some() {
        debug!("Prior knowledge supplied");
    }

    let n_features = request.n_features;
    let adjacency = execute(
        config,
        runner,
        EngineScript::Prune,
        options.seed,
        |workspace| io::write_inputs(workspace, &request),
        |workspace| io::read_adjacency(workspace, n_features),
    )?;

    debug!(
        "Adjacency has {} non-zero entries",
        adjacency.iter().filter(|&&v| v != 0.0).count()
    );
    Ok(adjacency)
}
