use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when vehicle attributes violate catalog or range constraints
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Unknown manufacturer: {name}")]
    UnknownManufacturer { name: String },

    #[error("Model '{model}' is not offered by {manufacturer}")]
    UnknownModel { manufacturer: String, model: String },

    #[error("Unknown fuel type: {name}")]
    UnknownFuelType { name: String },

    #[error("Year of manufacture {year} outside supported range {min}-{max}")]
    YearOutOfRange { year: u16, min: u16, max: u16 },

    #[error("Mileage {mileage} exceeds maximum of {max}")]
    MileageOutOfRange { mileage: u32, max: u32 },

    #[error("Unsupported engine size: {liters}L")]
    UnsupportedEngineSize { liters: f64 },

    #[error("Engine size '{input}' is not a number of litres")]
    UnparseableEngineSize { input: String },
}

/// Errors raised while loading the serialized model artifact
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Model artifact not found at {}", .path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("Model artifact at {} is corrupt: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },
}

/// Errors raised by a fitted model while transforming or scoring a row
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("Schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    #[error("Model evaluation failed: {reason}")]
    Inference { reason: String },
}

/// Errors surfaced to callers of the prediction service
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Model unavailable: {source}")]
    ModelUnavailable {
        #[from]
        source: LoadError,
    },

    #[error("Input does not match the model schema: {reason}")]
    SchemaMismatch { reason: String },

    #[error("Inference failure: {reason}")]
    InferenceFailure { reason: String },
}

impl PredictionError {
    /// Stable tag for metrics labels and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::ModelUnavailable { .. } => "model_unavailable",
            PredictionError::SchemaMismatch { .. } => "schema_mismatch",
            PredictionError::InferenceFailure { .. } => "inference_failure",
        }
    }
}

impl From<ValidationError> for PredictionError {
    fn from(err: ValidationError) -> Self {
        PredictionError::SchemaMismatch {
            reason: err.to_string(),
        }
    }
}

impl From<PredictorError> for PredictionError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::SchemaMismatch { reason } => PredictionError::SchemaMismatch { reason },
            PredictorError::Inference { reason } => PredictionError::InferenceFailure { reason },
        }
    }
}
