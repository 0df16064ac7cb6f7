use crate::domain::errors::{LoadError, PredictorError};
use crate::domain::ml::feature_registry::FeatureRow;
use std::sync::Arc;

/// Narrow contract of a fitted price model: transform a named row and
/// return one scalar price. Callers never see the model's internals.
pub trait PricePredictor: Send + Sync {
    /// Transform-and-predict a single row
    fn predict(&self, row: &FeatureRow) -> Result<f64, PredictorError>;

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;
}

/// Source of the shared, read-only model used by prediction requests.
pub trait ModelProvider: Send + Sync {
    fn model(&self) -> Result<Arc<dyn PricePredictor>, LoadError>;
}
