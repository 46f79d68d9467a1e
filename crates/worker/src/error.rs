use nftdonate_types::{RequestError, ShapeError};
use thiserror::Error;

/// Every way a worker run can fail.
///
/// None of these escape the process: they are rendered into the error
/// document by [`crate::execute`].
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to read input: {0}")]
    Input(String),

    #[error("{0}")]
    Credential(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Failed to write output: {0}")]
    Output(String),
}

impl WorkerError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }
}

impl From<RequestError> for WorkerError {
    fn from(error: RequestError) -> Self {
        Self::Input(error.to_string())
    }
}

impl From<ShapeError> for WorkerError {
    fn from(error: ShapeError) -> Self {
        Self::Model(format!("invalid response format: {error}"))
    }
}
