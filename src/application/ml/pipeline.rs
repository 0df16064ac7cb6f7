use super::preprocessing::Preprocessor;
use crate::domain::errors::PredictorError;
use crate::domain::ml::feature_registry::FeatureRow;
use crate::domain::ports::PricePredictor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Serialized layout version understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 2;

pub type ForestRegressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Hold-out metrics computed by the offline trainer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Hyper-parameters the forest was fitted with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub test_rows: usize,
    pub params: ForestParams,
    /// Width of the encoded feature vector the forest was fitted on
    pub input_width: usize,
    pub evaluation: Option<EvaluationReport>,
}

/// Fitted preprocessing + regressor, produced offline and loaded once per process.
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    format_version: u32,
    metadata: ArtifactMetadata,
    preprocessor: Preprocessor,
    regressor: ForestRegressor,
}

impl ModelArtifact {
    pub fn new(
        metadata: ArtifactMetadata,
        preprocessor: Preprocessor,
        regressor: ForestRegressor,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata,
            preprocessor,
            regressor,
        }
    }

    pub fn with_evaluation(mut self, evaluation: Option<EvaluationReport>) -> Self {
        self.metadata.evaluation = evaluation;
        self
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    /// Checks that the fitted preprocessing is internally consistent and
    /// produces the feature width recorded at training time.
    pub fn validate(&self) -> Result<(), PredictorError> {
        self.preprocessor.validate()?;
        let width = self.preprocessor.output_width();
        if width != self.metadata.input_width {
            return Err(PredictorError::SchemaMismatch {
                reason: format!(
                    "preprocessing emits {} features but the forest was fitted on {}",
                    width, self.metadata.input_width
                ),
            });
        }
        Ok(())
    }

    /// Scores many rows in one matrix pass
    pub fn predict_rows(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictorError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let transformed = rows
            .iter()
            .map(|row| self.preprocessor.transform(row))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(row) = transformed
            .iter()
            .find(|row| row.len() != self.metadata.input_width)
        {
            return Err(PredictorError::Inference {
                reason: format!(
                    "encoded row has {} features, model expects {}",
                    row.len(),
                    self.metadata.input_width
                ),
            });
        }

        let matrix =
            DenseMatrix::from_2d_vec(&transformed).map_err(|e| PredictorError::Inference {
                reason: format!("Matrix creation failed: {}", e),
            })?;

        let predictions = self
            .regressor
            .predict(&matrix)
            .map_err(|e| PredictorError::Inference {
                reason: format!("Prediction failed: {}", e),
            })?;

        if predictions.len() != rows.len() {
            return Err(PredictorError::Inference {
                reason: format!(
                    "model returned {} outputs for {} rows",
                    predictions.len(),
                    rows.len()
                ),
            });
        }

        Ok(predictions)
    }
}

impl PricePredictor for ModelArtifact {
    fn predict(&self, row: &FeatureRow) -> Result<f64, PredictorError> {
        let predictions = self.predict_rows(std::slice::from_ref(row))?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| PredictorError::Inference {
                reason: "No prediction returned".to_string(),
            })
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }

    fn version(&self) -> &str {
        &self.metadata.version
    }
}
