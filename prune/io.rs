//! Workspace layout of a pruning call.

use ndarray::Array2;

use super::validate::PruneRequest;
use crate::shared::files::{
    self, FileError, r_logical, write_column, write_int_matrix, write_matrix, write_row,
    write_scalar,
};
use crate::shared::workspace::Workspace;

pub(crate) const DATASET_LIST_FILE: &str = "X_names.csv";
pub(crate) const CAUSAL_ORDER_FILE: &str = "causal_order.csv";
pub(crate) const DISCRETE_FILE: &str = "is_discrete.csv";
pub(crate) const WEIGHT_MODE_FILE: &str = "ad_weight_type.csv";
pub(crate) const WEIGHTS_FILE: &str = "weights.csv";
pub(crate) const PRIOR_KNOWLEDGE_FILE: &str = "prior_knowledge.csv";
pub(crate) const RESULT_FILE: &str = "result_adj_mat.csv";

pub(crate) fn dataset_file_name(index: usize) -> String {
    format!("X_list_{index}.csv")
}

pub(crate) fn write_inputs(
    workspace: &Workspace,
    request: &PruneRequest<'_>,
) -> Result<(), FileError> {
    let mut names = Vec::with_capacity(request.datasets.len());
    for (index, dataset) in request.datasets.iter().enumerate() {
        let name = dataset_file_name(index);
        write_matrix(&workspace.file(&name), dataset.view())?;
        names.push(name);
    }
    write_column(&workspace.file(DATASET_LIST_FILE), &names)?;

    write_column(&workspace.file(CAUSAL_ORDER_FILE), request.causal_order)?;

    if let Some(flags) = request.is_discrete {
        let tokens: Vec<_> = flags.iter().map(|&f| r_logical(f)).collect();
        write_row(&workspace.file(DISCRETE_FILE), &tokens)?;
    }

    write_scalar(&workspace.file(WEIGHT_MODE_FILE), request.weight_mode)?;

    let weights: Vec<String> = request
        .weights
        .iter()
        .map(|&w| ryu::Buffer::new().format(w).to_string())
        .collect();
    write_column(&workspace.file(WEIGHTS_FILE), &weights)?;

    if let Some(prior_knowledge) = request.prior_knowledge {
        write_int_matrix(&workspace.file(PRIOR_KNOWLEDGE_FILE), prior_knowledge.view())?;
    }
    Ok(())
}

pub(crate) fn read_adjacency(
    workspace: &Workspace,
    n_features: usize,
) -> Result<Array2<f64>, FileError> {
    files::read_complete_matrix(&workspace.file(RESULT_FILE), (n_features, n_features))
}
