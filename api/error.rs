use crate::shared::files::FileError;
use crate::shared::validate::ValidationError;
use thiserror::Error;

/// The error returned by both entry points.
///
/// Callers see exactly three categories: a rejected argument (raised before any
/// file is written), a missing engine interpreter, and a runtime failure that
/// wraps everything else with the original message preserved as text.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error(
        "The engine interpreter '{interpreter}' was not found. \
         Install R and make sure it is on PATH."
    )]
    EngineNotFound { interpreter: String },

    #[error("{0}")]
    Runtime(String),
}

impl BridgeError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

impl From<FileError> for BridgeError {
    fn from(value: FileError) -> Self {
        Self::Runtime(value.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(value: std::io::Error) -> Self {
        Self::Runtime(value.to_string())
    }
}
