use thiserror::Error;

/// Errors surfaced while building or running a box-head predictor.
///
/// Every variant is fatal for the operation that produced it: construction
/// and dispatch either succeed synchronously or report one of these, and the
/// caller of model construction (or of the forward pass) decides what to do.
#[derive(Error, Debug)]
pub enum PredictorError {
    /// The configuration cannot produce a working predictor.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        message: String,
    },

    /// The configured predictor name was never registered.
    #[error("no predictor registered under {name:?} (known: {known})")]
    NotFound {
        /// The name that was looked up.
        name: String,
        /// Comma-separated list of registered names.
        known: String,
    },

    /// An input tensor did not match the predictor's shape contract.
    #[error("shape mismatch: {message}")]
    ShapeMismatch {
        /// Which dimensions were off, and what was expected.
        message: String,
    },

    /// A second registration attempted to reuse an existing name.
    #[error("predictor {name:?} is already registered")]
    AlreadyRegistered {
        /// The colliding name.
        name: String,
    },
}

impl PredictorError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        PredictorError::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        PredictorError::ShapeMismatch {
            message: message.into(),
        }
    }
}
