use std::borrow::Cow;

use ndarray::{Array1, Array2, Array3, ArrayViewD, Axis, Ix3};

use super::{AdaptiveWeightMode, PruneOptions};
use crate::shared::validate::{ValidationError, check_finite, check_non_empty, check_seed};

/// Everything the serializer needs, checked and with defaults filled in.
#[derive(Debug)]
pub(crate) struct PruneRequest<'a> {
    pub datasets: &'a [Array2<f64>],
    pub causal_order: &'a [usize],
    pub is_discrete: Option<&'a [bool]>,
    pub weight_mode: AdaptiveWeightMode,
    pub weights: Cow<'a, Array1<f64>>,
    pub prior_knowledge: Option<&'a Array2<i8>>,
    pub n_samples: usize,
    pub n_features: usize,
}

/// Checks the shared shape of a collection of imputed datasets.
///
/// Returns `(n_imputations, n_samples, n_features)`.
fn check_datasets(datasets: &[Array2<f64>]) -> Result<(usize, usize, usize), ValidationError> {
    let Some(first) = datasets.first() else {
        return Err(ValidationError::EmptyDimension {
            name: "X_list",
            shape: vec![0],
        });
    };
    let expected = first.dim();
    for (index, dataset) in datasets.iter().enumerate().skip(1) {
        if dataset.dim() != expected {
            return Err(ValidationError::DatasetShapeMismatch {
                index,
                expected,
                found: dataset.dim(),
            });
        }
    }
    let shape = (datasets.len(), expected.0, expected.1);
    check_non_empty("X_list", &[shape.0, shape.1, shape.2])?;
    for dataset in datasets {
        check_finite("X_list", dataset.iter())?;
    }
    Ok(shape)
}

/// Stacks imputed datasets into one `(n_imputations, n_samples, n_features)` array.
pub fn stack_datasets(datasets: &[Array2<f64>]) -> Result<Array3<f64>, ValidationError> {
    check_datasets(datasets)?;
    let views: Vec<_> = datasets.iter().map(|d| d.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|_| ValidationError::EmptyDimension {
        name: "X_list",
        shape: vec![datasets.len()],
    })
}

/// Splits a dynamically shaped array into its imputed datasets.
///
/// This is where a wrong-dimension input is caught: the array must be
/// `(n_imputations, n_samples, n_features)`.
pub fn datasets_from_dyn(array: ArrayViewD<'_, f64>) -> Result<Vec<Array2<f64>>, ValidationError> {
    let found = array.ndim();
    let array = array
        .into_dimensionality::<Ix3>()
        .map_err(|_| ValidationError::WrongDimensionality {
            name: "X_list",
            expected: 3,
            found,
        })?;
    check_non_empty("X_list", array.shape())?;
    Ok(array.outer_iter().map(|d| d.to_owned()).collect())
}

fn check_causal_order(causal_order: &[usize], n_features: usize) -> Result<(), ValidationError> {
    if causal_order.len() != n_features {
        return Err(ValidationError::CausalOrderLength {
            expected: n_features,
            found: causal_order.len(),
        });
    }
    let mut seen = vec![false; n_features];
    for &feature in causal_order {
        match seen.get_mut(feature) {
            Some(slot) if !*slot => *slot = true,
            _ => return Err(ValidationError::CausalOrderNotPermutation { n_features }),
        }
    }
    Ok(())
}

/// Reads a causal order supplied as floating-point indices.
///
/// Every entry must be an exact non-negative integer below `n_features`;
/// `1.9` is rejected rather than truncated to `1`.
pub fn causal_order_from_values(
    values: &[f64],
    n_features: usize,
) -> Result<Vec<usize>, ValidationError> {
    values
        .iter()
        .map(|&v| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < n_features as f64 {
                Ok(v as usize)
            } else {
                Err(ValidationError::CausalOrderNotPermutation { n_features })
            }
        })
        .collect()
}

fn check_weights(weights: &Array1<f64>, n_samples: usize) -> Result<(), ValidationError> {
    if weights.len() != n_samples {
        return Err(ValidationError::WeightsLength {
            expected: n_samples,
            found: weights.len(),
        });
    }
    if let Some((index, &value)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(ValidationError::InvalidWeight { index, value });
    }
    Ok(())
}

fn check_prior_knowledge(
    prior_knowledge: &Array2<i8>,
    n_features: usize,
) -> Result<(), ValidationError> {
    let expected = (n_features, n_features);
    if prior_knowledge.dim() != expected {
        return Err(ValidationError::PriorKnowledgeShape {
            expected,
            found: prior_knowledge.dim(),
        });
    }
    if let Some(((row, col), &value)) = prior_knowledge
        .indexed_iter()
        .find(|(_, v)| !matches!(**v, -1..=1))
    {
        return Err(ValidationError::PriorKnowledgeValue {
            row,
            col,
            value: f64::from(value),
        });
    }
    Ok(())
}

/// Validates every pruning argument, fail-fast, in the documented order.
pub(crate) fn validate<'a>(
    datasets: &'a [Array2<f64>],
    causal_order: &'a [usize],
    options: &'a PruneOptions,
) -> Result<PruneRequest<'a>, ValidationError> {
    let (_, n_samples, n_features) = check_datasets(datasets)?;

    check_causal_order(causal_order, n_features)?;

    if let Some(flags) = &options.is_discrete {
        if flags.len() != n_features {
            return Err(ValidationError::DiscreteFlagsLength {
                expected: n_features,
                found: flags.len(),
            });
        }
    }

    let weights = match &options.weights {
        Some(weights) => {
            check_weights(weights, n_samples)?;
            Cow::Borrowed(weights)
        }
        None => Cow::Owned(Array1::ones(n_samples)),
    };

    if let Some(prior_knowledge) = &options.prior_knowledge {
        check_prior_knowledge(prior_knowledge, n_features)?;
    }

    check_seed(options.seed)?;

    Ok(PruneRequest {
        datasets,
        causal_order,
        is_discrete: options.is_discrete.as_deref(),
        weight_mode: options.weight_mode,
        weights,
        prior_knowledge: options.prior_knowledge.as_ref(),
        n_samples,
        n_features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn, array};

    fn datasets() -> Vec<Array2<f64>> {
        vec![
            array![[0.1, 1.0, 2.0], [0.2, 1.1, 2.2], [0.3, 1.2, 2.4], [0.4, 1.3, 2.6]],
            array![[0.0, 0.9, 2.1], [0.1, 1.0, 2.3], [0.2, 1.1, 2.5], [0.3, 1.2, 2.7]],
        ]
    }

    #[test]
    fn defaults_fill_in_uniform_weights() {
        let data = datasets();
        let options = PruneOptions::default();
        let request = validate(&data, &[2, 0, 1], &options).unwrap();
        assert_eq!(request.n_samples, 4);
        assert_eq!(request.n_features, 3);
        assert_eq!(request.weights.as_ref(), &Array1::<f64>::ones(4));
        assert_eq!(request.weight_mode, AdaptiveWeightMode::Min);
        assert!(request.is_discrete.is_none());
        assert!(request.prior_knowledge.is_none());
    }

    #[test]
    fn datasets_must_share_a_shape_and_be_non_empty() {
        let mut data = datasets();
        data.push(Array2::zeros((3, 3)));
        assert_eq!(
            check_datasets(&data),
            Err(ValidationError::DatasetShapeMismatch {
                index: 2,
                expected: (4, 3),
                found: (3, 3),
            })
        );

        assert!(matches!(
            check_datasets(&[]),
            Err(ValidationError::EmptyDimension { .. })
        ));
        assert_eq!(
            check_datasets(&[Array2::zeros((2, 0))]),
            Err(ValidationError::EmptyDimension {
                name: "X_list",
                shape: vec![1, 2, 0],
            })
        );
    }

    #[test]
    fn datasets_must_be_finite() {
        let mut data = datasets();
        data[1][[2, 1]] = f64::NAN;
        assert_eq!(
            check_datasets(&data),
            Err(ValidationError::NonFiniteValues { name: "X_list" })
        );
    }

    #[test]
    fn dynamic_input_must_be_three_dimensional() {
        let two_d = Array::<f64, _>::zeros(IxDyn(&[4, 3]));
        assert_eq!(
            datasets_from_dyn(two_d.view()),
            Err(ValidationError::WrongDimensionality {
                name: "X_list",
                expected: 3,
                found: 2,
            })
        );

        let empty = Array::<f64, _>::zeros(IxDyn(&[1, 2, 0]));
        assert!(matches!(
            datasets_from_dyn(empty.view()),
            Err(ValidationError::EmptyDimension { .. })
        ));

        let three_d = Array::<f64, _>::from_shape_fn(IxDyn(&[2, 4, 3]), |idx| idx[0] as f64);
        let split = datasets_from_dyn(three_d.view()).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[1].dim(), (4, 3));
        assert!(split[1].iter().all(|&v| v == 1.0));
    }

    #[test]
    fn stacking_preserves_order() {
        let data = datasets();
        let stacked = stack_datasets(&data).unwrap();
        assert_eq!(stacked.dim(), (2, 4, 3));
        assert_eq!(stacked[[1, 3, 2]], 2.7);
    }

    #[test]
    fn causal_order_must_be_a_permutation() {
        assert!(check_causal_order(&[2, 0, 1], 3).is_ok());
        assert_eq!(
            check_causal_order(&[2, 0], 3),
            Err(ValidationError::CausalOrderLength {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            check_causal_order(&[0, 1, 0], 3),
            Err(ValidationError::CausalOrderNotPermutation { n_features: 3 })
        );
        assert_eq!(
            check_causal_order(&[0, 1, 3], 3),
            Err(ValidationError::CausalOrderNotPermutation { n_features: 3 })
        );
    }

    #[test]
    fn fractional_causal_order_entries_are_rejected() {
        assert_eq!(causal_order_from_values(&[2.0, 0.0, 1.0], 3), Ok(vec![2, 0, 1]));
        for bad in [
            [0.0, 1.9, 2.0],
            [0.0, -1.0, 2.0],
            [0.0, 1.0, 3.0],
            [0.0, f64::NAN, 2.0],
        ] {
            assert_eq!(
                causal_order_from_values(&bad, 3),
                Err(ValidationError::CausalOrderNotPermutation { n_features: 3 }),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn weights_must_match_samples_and_be_non_negative() {
        assert!(check_weights(&Array1::ones(4), 4).is_ok());
        assert_eq!(
            check_weights(&Array1::ones(3), 4),
            Err(ValidationError::WeightsLength {
                expected: 4,
                found: 3
            })
        );
        assert!(matches!(
            check_weights(&array![1.0, -0.5, 1.0, 1.0], 4),
            Err(ValidationError::InvalidWeight { index: 1, .. })
        ));
        assert!(matches!(
            check_weights(&array![1.0, 1.0, f64::INFINITY, 1.0], 4),
            Err(ValidationError::InvalidWeight { index: 2, .. })
        ));
    }

    #[test]
    fn prior_knowledge_must_be_square_and_ternary() {
        assert!(check_prior_knowledge(&Array2::from_elem((3, 3), -1), 3).is_ok());
        assert_eq!(
            check_prior_knowledge(&Array2::from_elem((2, 2), -1), 3),
            Err(ValidationError::PriorKnowledgeShape {
                expected: (3, 3),
                found: (2, 2)
            })
        );
        let mut pk = Array2::from_elem((3, 3), 0i8);
        pk[[1, 2]] = 2;
        assert_eq!(
            check_prior_knowledge(&pk, 3),
            Err(ValidationError::PriorKnowledgeValue {
                row: 1,
                col: 2,
                value: 2.0
            })
        );
    }

    #[test]
    fn discrete_flags_and_seed_are_checked_last() {
        let data = datasets();
        let options = PruneOptions {
            is_discrete: Some(vec![true, false]),
            ..PruneOptions::default()
        };
        assert_eq!(
            validate(&data, &[0, 1, 2], &options).unwrap_err(),
            ValidationError::DiscreteFlagsLength {
                expected: 3,
                found: 2
            }
        );

        let options = PruneOptions {
            seed: Some(i64::MAX),
            ..PruneOptions::default()
        };
        assert_eq!(
            validate(&data, &[0, 1, 2], &options).unwrap_err(),
            ValidationError::SeedOutOfRange(i64::MAX)
        );
    }
}
