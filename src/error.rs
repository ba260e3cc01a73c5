use std::fmt;

use thiserror::Error;

use crate::resampling::ResampleError;

/// Allow-list carried by configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allowed(pub Vec<&'static str>);

impl fmt::Display for Allowed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Errors raised while constructing, fitting or persisting a decoder.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("Input balancing method is not an allowed value. Allowed values: {allowed}. Got: {input}.")]
    BalancingMethod { input: String, allowed: Allowed },

    #[error("Input decoding model is not an allowed value. Allowed values: {allowed}. Got: {input}.")]
    DecoderNotFound { input: String, allowed: Allowed },

    #[error("Input scoring method is not an allowed value. Allowed values: {allowed}. Got: {input}.")]
    ScoringMethodNotFound { input: String, allowed: Allowed },

    #[error("{backend}: {reason}")]
    IncompatibleOption { backend: &'static str, reason: String },

    #[error("Decoder has not been fitted yet")]
    NotFitted,

    #[error("{backend} does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error(transparent)]
    Resampling(#[from] ResampleError),

    #[error("Model fitting failed: {0}")]
    Model(String),

    #[error("Hyperparameter optimization failed: {0}")]
    Optimization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<bincode::Error> for DecoderError {
    fn from(err: bincode::Error) -> Self {
        DecoderError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DecoderError {
    fn from(err: ndarray::ShapeError) -> Self {
        DecoderError::Shape(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecoderError>;
