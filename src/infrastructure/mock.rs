//! In-memory stand-ins for the model seams, used by tests and demos.

use crate::domain::errors::{LoadError, PredictorError};
use crate::domain::ml::feature_registry::FeatureRow;
use crate::domain::ports::{ModelProvider, PricePredictor};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Predictor returning a constant (or a constant error), counting calls.
pub struct FixedPricePredictor {
    outcome: Result<f64, PredictorError>,
    calls: AtomicUsize,
}

impl FixedPricePredictor {
    pub fn new(price: f64) -> Self {
        Self {
            outcome: Ok(price),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: PredictorError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PricePredictor for FixedPricePredictor {
    fn predict(&self, _row: &FeatureRow) -> Result<f64, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    fn name(&self) -> &str {
        "Fixed Price Stub"
    }

    fn version(&self) -> &str {
        "test"
    }
}

/// Provider that always hands out the same predictor, or always reports a
/// missing artifact.
pub struct StaticModelProvider {
    model: Option<Arc<dyn PricePredictor>>,
    requests: AtomicUsize,
}

impl StaticModelProvider {
    pub fn with_model(model: Arc<dyn PricePredictor>) -> Self {
        Self {
            model: Some(model),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            model: None,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ModelProvider for StaticModelProvider {
    fn model(&self) -> Result<Arc<dyn PricePredictor>, LoadError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.model.clone().ok_or_else(|| LoadError::ArtifactNotFound {
            path: PathBuf::from("<in-memory>"),
        })
    }
}
