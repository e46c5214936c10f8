//! Workspace layout of an imputation call.

use log::debug;
use ndarray::{Array2, ArrayView2};

use super::ImputeOptions;
use crate::shared::files::{
    FileError, r_logical, read_complete_matrix, read_manifest, write_matrix, write_row,
    write_scalar,
};
use crate::shared::workspace::Workspace;

pub(crate) const DATA_FILE: &str = "X.csv";
pub(crate) const COUNT_FILE: &str = "n_imputations.csv";
pub(crate) const ITERATIONS_FILE: &str = "maxit.csv";
pub(crate) const DISCRETE_FILE: &str = "is_discrete.csv";
pub(crate) const MANIFEST_FILE: &str = "result_filenames.csv";

pub(crate) fn write_inputs(
    workspace: &Workspace,
    data: ArrayView2<'_, f64>,
    options: &ImputeOptions,
) -> Result<(), FileError> {
    write_matrix(&workspace.file(DATA_FILE), data)?;
    write_scalar(&workspace.file(COUNT_FILE), options.num_imputations)?;
    write_scalar(&workspace.file(ITERATIONS_FILE), options.max_iterations)?;
    if let Some(flags) = &options.is_discrete {
        let tokens: Vec<_> = flags.iter().map(|&f| r_logical(f)).collect();
        write_row(&workspace.file(DISCRETE_FILE), &tokens)?;
    }
    Ok(())
}

/// Reads every completed dataset the engine listed, in manifest order.
pub(crate) fn read_imputations(
    workspace: &Workspace,
    expected_count: usize,
    shape: (usize, usize),
) -> Result<Vec<Array2<f64>>, FileError> {
    let manifest = workspace.file(MANIFEST_FILE);
    let names = read_manifest(&manifest)?;
    if names.len() != expected_count {
        return Err(FileError::UnexpectedCount {
            path: manifest,
            expected: expected_count,
            found: names.len(),
        });
    }

    names
        .iter()
        .map(|name| {
            debug!("Reading imputed dataset {name}");
            read_complete_matrix(&workspace.file(name), shape)
        })
        .collect()
}
