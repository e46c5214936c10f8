//! Argument checks shared by both entry points.
//!
//! Every check runs before the workspace exists, so a rejected call never
//! touches the filesystem. Validation stops at the first violation.

use thiserror::Error;

/// A rejected argument. Always recoverable by the caller adjusting its inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{name} must be {expected}-dimensional, but it has {found} dimensions.")]
    WrongDimensionality {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("The shape of {name} mustn't contain 0 (found {shape:?}).")]
    EmptyDimension {
        name: &'static str,
        shape: Vec<usize>,
    },
    #[error(
        "Dataset {index} has shape {found:?}, but the first dataset has shape {expected:?}. \
         All datasets must share one shape."
    )]
    DatasetShapeMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("{name} contains NaN or infinite values; all values must be finite.")]
    NonFiniteValues { name: &'static str },
    #[error("{name} contains infinite values; only NaN may mark a missing entry.")]
    InfiniteValues { name: &'static str },
    #[error("The length of causal_order ({found}) must equal n_features ({expected}).")]
    CausalOrderLength { expected: usize, found: usize },
    #[error("Elements of causal_order must be unique between 0 and n_features ({n_features}).")]
    CausalOrderNotPermutation { n_features: usize },
    #[error("The length of is_discrete ({found}) must be equal to n_features ({expected}).")]
    DiscreteFlagsLength { expected: usize, found: usize },
    #[error("ad_weight_type must be \"min\" or \"1se\", got \"{0}\".")]
    UnknownWeightMode(String),
    #[error("The length of weights ({found}) must be equal to n_samples ({expected}).")]
    WeightsLength { expected: usize, found: usize },
    #[error("weights must be finite and non-negative, but weights[{index}] is {value}.")]
    InvalidWeight { index: usize, value: f64 },
    #[error("The shape of prior_knowledge must be {expected:?}, got {found:?}.")]
    PriorKnowledgeShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("prior_knowledge[{row}, {col}] is {value}; entries must be -1, 0 or 1.")]
    PriorKnowledgeValue { row: usize, col: usize, value: f64 },
    #[error("n_imputations must be at least 1.")]
    ZeroImputations,
    #[error("{name} must be a non-negative integer, got {value}.")]
    NegativeCount { name: &'static str, value: i64 },
    #[error(
        "seed {0} is outside the engine's integer range [{min}, {max}].",
        min = SEED_MIN,
        max = SEED_MAX
    )]
    SeedOutOfRange(i64),
}

/// The engine stores seeds as R integers; `i32::MIN` is R's NA marker.
pub const SEED_MIN: i64 = i32::MIN as i64 + 1;
pub const SEED_MAX: i64 = i32::MAX as i64;

pub fn check_seed(seed: Option<i64>) -> Result<(), ValidationError> {
    match seed {
        Some(value) if !(SEED_MIN..=SEED_MAX).contains(&value) => {
            Err(ValidationError::SeedOutOfRange(value))
        }
        _ => Ok(()),
    }
}

/// Converts a count supplied as a signed integer, rejecting negatives.
pub fn check_count(name: &'static str, value: i64) -> Result<usize, ValidationError> {
    usize::try_from(value).map_err(|_| ValidationError::NegativeCount { name, value })
}

/// Checks that every dimension of `shape` is non-zero.
pub fn check_non_empty(name: &'static str, shape: &[usize]) -> Result<(), ValidationError> {
    if shape.contains(&0) {
        return Err(ValidationError::EmptyDimension {
            name,
            shape: shape.to_vec(),
        });
    }
    Ok(())
}

pub fn check_finite<'a>(
    name: &'static str,
    values: impl IntoIterator<Item = &'a f64>,
) -> Result<(), ValidationError> {
    if values.into_iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NonFiniteValues { name });
    }
    Ok(())
}
