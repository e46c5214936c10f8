//! # Multiple Imputation
//!
//! Fills the missing entries (`NaN`) of a data matrix by multiple imputation by
//! chained equations, producing several complete datasets that differ only in
//! the imputed cells.

use log::info;
use ndarray::{Array2, ArrayView2};

use crate::error::BridgeError;
use crate::shared::engine::{EngineConfig, EngineScript, ScriptRunner, SubprocessRunner, execute};

mod io;
mod validate;

/// Optional arguments of [`impute`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImputeOptions {
    /// Number of completed datasets to produce.
    pub num_imputations: usize,
    /// Iterations of the chained-equation sampler. Zero is accepted.
    pub max_iterations: usize,
    /// Per-feature flag; discrete features are imputed through factor models.
    pub is_discrete: Option<Vec<bool>>,
    pub seed: Option<i64>,
}

impl Default for ImputeOptions {
    fn default() -> Self {
        Self {
            num_imputations: 10,
            max_iterations: 10,
            is_discrete: None,
            seed: None,
        }
    }
}

/// Imputes `data` with the default engine.
///
/// Returns `num_imputations` arrays shaped like `data`, in the order the engine
/// produced them, with no missing values left.
pub fn impute(
    data: ArrayView2<'_, f64>,
    options: &ImputeOptions,
) -> Result<Vec<Array2<f64>>, BridgeError> {
    impute_with(data, options, &EngineConfig::default(), &SubprocessRunner)
}

/// Like [`impute`], with an explicit engine configuration and runner.
pub fn impute_with(
    data: ArrayView2<'_, f64>,
    options: &ImputeOptions,
    config: &EngineConfig,
    runner: &dyn ScriptRunner,
) -> Result<Vec<Array2<f64>>, BridgeError> {
    validate::validate(data, options)?;
    let missing = data.iter().filter(|v| v.is_nan()).count();
    info!(
        "Imputing {}x{} matrix with {missing} missing entries: m={}, maxit={}",
        data.nrows(),
        data.ncols(),
        options.num_imputations,
        options.max_iterations
    );

    let imputations = execute(
        config,
        runner,
        EngineScript::Impute,
        options.seed,
        |workspace| io::write_inputs(workspace, data, options),
        |workspace| io::read_imputations(workspace, options.num_imputations, data.dim()),
    )?;

    info!("Received {} imputed datasets", imputations.len());
    Ok(imputations)
}
