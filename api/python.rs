//! Python bindings for both entry points.

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Ix1, Ix2, IxDyn};
use numpy::{IntoPyArray, PyArray2, PyReadonlyArrayDyn};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::error::BridgeError;
use crate::impute::{ImputeOptions, impute};
use crate::prune::{
    PruneOptions, causal_order_from_values, datasets_from_dyn, estimate_adjacency,
};
use crate::shared::validate::{ValidationError, check_count};

// ============================================================================
// Helper Functions
// ============================================================================

fn to_py_error(e: BridgeError) -> PyErr {
    match e {
        BridgeError::InvalidArgument(_) => PyValueError::new_err(e.to_string()),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn invalid(e: ValidationError) -> PyErr {
    to_py_error(BridgeError::InvalidArgument(e))
}

/// `numpy.asarray(obj, dtype=dtype)`, read back as an n-dimensional array.
fn as_array<'py, T: numpy::Element>(
    obj: &Bound<'py, PyAny>,
    dtype: &str,
) -> PyResult<ndarray::Array<T, IxDyn>> {
    let py = obj.py();
    let kwargs = PyDict::new(py);
    kwargs.set_item("dtype", dtype)?;
    let array = py
        .import("numpy")?
        .getattr("asarray")?
        .call((obj,), Some(&kwargs))?;
    let array: PyReadonlyArrayDyn<'py, T> = array.extract()?;
    Ok(array.as_array().to_owned())
}

fn as_vector<'py, T: numpy::Element>(
    obj: &Bound<'py, PyAny>,
    dtype: &str,
    name: &'static str,
) -> PyResult<Array1<T>> {
    let array = as_array::<T>(obj, dtype)?;
    let found = array.ndim();
    array.into_dimensionality::<Ix1>().map_err(|_| {
        invalid(ValidationError::WrongDimensionality {
            name,
            expected: 1,
            found,
        })
    })
}

fn as_matrix<'py>(obj: &Bound<'py, PyAny>, name: &'static str) -> PyResult<Array2<f64>> {
    let array = as_array::<f64>(obj, "float64")?;
    let found = array.ndim();
    array.into_dimensionality::<Ix2>().map_err(|_| {
        invalid(ValidationError::WrongDimensionality {
            name,
            expected: 2,
            found,
        })
    })
}

/// Read as `float64` so that `[0, 1.9, 2]` is rejected instead of truncated.
fn causal_order_from(obj: &Bound<'_, PyAny>, n_features: usize) -> PyResult<Vec<usize>> {
    let values = as_vector::<f64>(obj, "float64", "causal_order")?;
    causal_order_from_values(&values.to_vec(), n_features).map_err(invalid)
}

fn prior_knowledge_from(obj: &Bound<'_, PyAny>) -> PyResult<Array2<i8>> {
    let matrix = as_matrix(obj, "prior_knowledge")?;
    if let Some(((row, col), &value)) = matrix
        .indexed_iter()
        .find(|(_, v)| ![-1.0, 0.0, 1.0].contains(*v))
    {
        return Err(invalid(ValidationError::PriorKnowledgeValue { row, col, value }));
    }
    Ok(matrix.mapv(|v| v as i8))
}

fn flags_from(obj: Option<&Bound<'_, PyAny>>) -> PyResult<Option<Vec<bool>>> {
    obj.map(|o| as_vector::<bool>(o, "bool", "is_discrete").map(|a| a.to_vec()))
        .transpose()
}

// ============================================================================
// Python Functions
// ============================================================================

/// Multiple imputation by chained equations.
///
/// Returns a list of `n_imputations` complete arrays shaped like `X`.
#[pyfunction]
#[pyo3(signature = (X, n_imputations=10, maxit=10, is_discrete=None, seed=None))]
fn impute_by_mice<'py>(
    py: Python<'py>,
    X: &Bound<'py, PyAny>,
    n_imputations: i64,
    maxit: i64,
    is_discrete: Option<&Bound<'py, PyAny>>,
    seed: Option<i64>,
) -> PyResult<Vec<Bound<'py, PyArray2<f64>>>> {
    let data = as_matrix(X, "X")?;
    let options = ImputeOptions {
        num_imputations: check_count("n_imputations", n_imputations).map_err(invalid)?,
        max_iterations: check_count("maxit", maxit).map_err(invalid)?,
        is_discrete: flags_from(is_discrete)?,
        seed,
    };

    let imputed = py
        .allow_threads(|| impute(data.view(), &options))
        .map_err(to_py_error)?;
    Ok(imputed.into_iter().map(|a| a.into_pyarray(py)).collect())
}

/// Adaptive-lasso pruning of a causal adjacency matrix across imputed datasets.
#[pyfunction]
#[pyo3(signature = (
    X_list, causal_order,
    is_discrete=None,
    ad_weight_type="min",
    weights=None,
    prior_knowledge=None,
    seed=None,
))]
#[allow(clippy::too_many_arguments)]
fn estimate_adj_matrix_for_stacked_imputed_datasets<'py>(
    py: Python<'py>,
    X_list: &Bound<'py, PyAny>,
    causal_order: &Bound<'py, PyAny>,
    is_discrete: Option<&Bound<'py, PyAny>>,
    ad_weight_type: &str,
    weights: Option<&Bound<'py, PyAny>>,
    prior_knowledge: Option<&Bound<'py, PyAny>>,
    seed: Option<i64>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let stacked = as_array::<f64>(X_list, "float64")?;
    let datasets = datasets_from_dyn(stacked.view()).map_err(invalid)?;
    let n_features = datasets.first().map_or(0, |d| d.ncols());

    let causal_order = causal_order_from(causal_order, n_features)?;
    let options = PruneOptions {
        is_discrete: flags_from(is_discrete)?,
        weight_mode: ad_weight_type.parse().map_err(invalid)?,
        weights: weights
            .map(|w| as_vector::<f64>(w, "float64", "weights"))
            .transpose()?,
        prior_knowledge: prior_knowledge.map(prior_knowledge_from).transpose()?,
        seed,
    };

    let adjacency = py
        .allow_threads(|| estimate_adjacency(&datasets, &causal_order, &options))
        .map_err(to_py_error)?;
    Ok(adjacency.into_pyarray(py))
}

#[pymodule]
fn pruning_missing_data(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(impute_by_mice, m)?)?;
    m.add_function(wrap_pyfunction!(
        estimate_adj_matrix_for_stacked_imputed_datasets,
        m
    )?)?;
    Ok(())
}
