use log::warn;
use ndarray::ArrayView2;

use super::ImputeOptions;
use crate::shared::validate::{ValidationError, check_non_empty, check_seed};

pub(crate) fn validate(
    data: ArrayView2<'_, f64>,
    options: &ImputeOptions,
) -> Result<(), ValidationError> {
    check_non_empty("X", data.shape())?;
    if data.iter().any(|v| v.is_infinite()) {
        return Err(ValidationError::InfiniteValues { name: "X" });
    }
    if options.num_imputations == 0 {
        return Err(ValidationError::ZeroImputations);
    }
    if let Some(flags) = &options.is_discrete {
        // The engine recycles the flags to the column count, so a mismatch is tolerated.
        if flags.len() != data.ncols() {
            warn!(
                "is_discrete has {} entries but X has {} columns; \
                 the engine will recycle the flags",
                flags.len(),
                data.ncols()
            );
        }
    }
    check_seed(options.seed)
}
