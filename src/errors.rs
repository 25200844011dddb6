use thiserror::Error;

/// A result type for GP classification algorithm
pub type Result<T> = std::result::Result<T, GpcError>;

/// An error when using [`VariationalGpClassifier`](crate::VariationalGpClassifier) algorithm
#[derive(Error, Debug)]
pub enum GpcError {
    /// When the ELBO or its gradient is not a finite value
    #[error("Numerical error: {0}")]
    NumericalError(String),
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
    /// When error due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValueError(String),
}
