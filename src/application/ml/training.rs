//! Offline fitting of the price pipeline from a historical sales dataset.
//!
//! Used by the `train_model` binary only; the serving path never trains.

use super::pipeline::{
    ArtifactMetadata, EvaluationReport, ForestParams, ForestRegressor, ModelArtifact,
};
use super::preprocessing::Preprocessor;
use crate::domain::ml::feature_registry::{
    CATEGORICAL_FEATURES, ENGINE_SIZE, FUEL_TYPE, FeatureRow, MANUFACTURER, MILEAGE, MODEL,
    NUMERIC_FEATURES, YEAR_OF_MANUFACTURE,
};
use crate::domain::ports::PricePredictor;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// One row of the sales dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SalesRecord {
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Engine size")]
    pub engine_size: f64,
    #[serde(rename = "Fuel type")]
    pub fuel_type: String,
    #[serde(rename = "Year of manufacture")]
    pub year: f64,
    #[serde(rename = "Mileage")]
    pub mileage: f64,
    #[serde(rename = "Price")]
    pub price: f64,
}

impl SalesRecord {
    pub fn to_feature_row(&self) -> FeatureRow {
        FeatureRow::new()
            .with_categorical(MANUFACTURER, self.manufacturer.as_str())
            .with_categorical(MODEL, self.model.as_str())
            .with_numeric(ENGINE_SIZE, self.engine_size)
            .with_categorical(FUEL_TYPE, self.fuel_type.as_str())
            .with_numeric(YEAR_OF_MANUFACTURE, self.year)
            .with_numeric(MILEAGE, self.mileage)
    }
}

/// Training configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub forest: ForestParams,
    /// Share of rows used for fitting; the rest is held out for evaluation
    pub train_fraction: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            forest: ForestParams {
                n_trees: 100,
                max_depth: 10,
                min_samples_split: 5,
                seed: 42,
            },
            train_fraction: 0.8,
        }
    }
}

/// Fitted artifact plus the hold-out predictions used to evaluate it
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub holdout_predictions: Vec<f64>,
    pub holdout_actuals: Vec<f64>,
}

pub fn read_sales_csv<R: Read>(reader: R) -> Result<Vec<SalesRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: SalesRecord =
            result.with_context(|| format!("Malformed sales record at row {}", line + 1))?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_sales_file(path: &Path) -> Result<Vec<SalesRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    read_sales_csv(BufReader::new(file))
}

/// Shuffles with a fixed seed and splits into (train, test).
pub fn train_test_split<T: Clone>(items: &[T], train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut indices: Vec<usize> = (0..items.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let split = ((items.len() as f64) * train_fraction.clamp(0.0, 1.0)).floor() as usize;
    let train = indices[..split].iter().map(|&i| items[i].clone()).collect();
    let test = indices[split..].iter().map(|&i| items[i].clone()).collect();
    (train, test)
}

/// MAE, RMSE and R² of predictions against actual prices.
pub fn evaluate(predictions: &[f64], actuals: &[f64]) -> Option<EvaluationReport> {
    let n = predictions.len();
    if n == 0 || n != actuals.len() {
        return None;
    }

    let sq_err: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    let abs_err: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, t)| (p - t).abs())
        .sum();
    let mean = actuals.iter().sum::<f64>() / n as f64;
    let variance = actuals.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n as f64;
    let mse = sq_err / n as f64;

    Some(EvaluationReport {
        samples: n,
        mae: abs_err / n as f64,
        rmse: mse.sqrt(),
        r2: if variance > 0.0 { 1.0 - mse / variance } else { 0.0 },
    })
}

/// Fits preprocessing and forest on the training split and evaluates on the rest.
pub fn train(records: &[SalesRecord], params: &TrainingParams) -> Result<TrainingOutcome> {
    if records.is_empty() {
        bail!("No sales records to train on");
    }

    let (train_set, test_set) = if params.train_fraction >= 1.0 {
        (records.to_vec(), Vec::new())
    } else {
        train_test_split(records, params.train_fraction, params.forest.seed)
    };

    if train_set.is_empty() {
        bail!(
            "Training split is empty ({} records, fraction {})",
            records.len(),
            params.train_fraction
        );
    }

    let train_rows: Vec<FeatureRow> = train_set.iter().map(SalesRecord::to_feature_row).collect();
    let preprocessor = Preprocessor::fit(&train_rows, NUMERIC_FEATURES, CATEGORICAL_FEATURES)
        .context("Failed to fit preprocessing")?;

    let x_train = train_rows
        .iter()
        .map(|row| preprocessor.transform(row))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to transform training rows")?;
    let y_train: Vec<f64> = train_set.iter().map(|r| r.price).collect();

    let x_matrix =
        DenseMatrix::from_2d_vec(&x_train).map_err(|e| anyhow::anyhow!("Matrix error: {}", e))?;

    let forest = params.forest;
    let rf_params = RandomForestRegressorParameters::default()
        .with_n_trees(forest.n_trees)
        .with_max_depth(forest.max_depth)
        .with_min_samples_split(forest.min_samples_split)
        .with_seed(forest.seed);

    info!(
        "Training Random Forest Regressor (Trees: {}, Depth: {}, MinSplit: {}) on {} rows",
        forest.n_trees,
        forest.max_depth,
        forest.min_samples_split,
        train_set.len()
    );

    let regressor: ForestRegressor = RandomForestRegressor::fit(&x_matrix, &y_train, rf_params)
        .map_err(|e| anyhow::anyhow!("Training error: {}", e))?;

    let trained_at = Utc::now();
    let metadata = ArtifactMetadata {
        version: format!("rf-{}", trained_at.format("%Y%m%d%H%M%S")),
        trained_at,
        training_rows: train_set.len(),
        test_rows: test_set.len(),
        params: forest,
        input_width: preprocessor.output_width(),
        evaluation: None,
    };
    let mut artifact = ModelArtifact::new(metadata, preprocessor, regressor);

    let test_rows: Vec<FeatureRow> = test_set.iter().map(SalesRecord::to_feature_row).collect();
    let holdout_actuals: Vec<f64> = test_set.iter().map(|r| r.price).collect();
    let holdout_predictions = artifact
        .predict_rows(&test_rows)
        .context("Failed to score hold-out rows")?;

    let evaluation = evaluate(&holdout_predictions, &holdout_actuals);
    if let Some(report) = evaluation {
        info!(
            "OOS Test (n={}): RMSE={:.2}, MAE={:.2}, R²={:.4}",
            report.samples, report.rmse, report.mae, report.r2
        );
    }
    artifact = artifact.with_evaluation(evaluation);

    info!(
        "Trained model {} ({} train / {} test rows)",
        artifact.version(),
        train_set.len(),
        test_set.len()
    );

    Ok(TrainingOutcome {
        artifact,
        holdout_predictions,
        holdout_actuals,
    })
}

/// Writes the artifact as JSON. Atomic: temp file then rename.
pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create model directory")?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path).context("Failed to create temp artifact file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, artifact).context("Failed to serialize artifact")?;
        writer.flush().context("Failed to flush artifact file")?;
    }
    fs::rename(&temp_path, path).context("Failed to move artifact into place")?;

    info!("Saved model artifact to {:?}", path);
    Ok(())
}
