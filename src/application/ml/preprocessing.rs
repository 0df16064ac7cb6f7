//! Column preprocessing fitted alongside the regressor.
//!
//! Numeric columns are centred on the median and scaled by the
//! interquartile range; categorical columns are one-hot encoded with unknown
//! categories mapped to an all-zero block. Output layout is every numeric
//! column first (in fitted order) followed by one block per categorical
//! column.

use crate::domain::errors::PredictorError;
use crate::domain::ml::feature_registry::{FeatureRow, FeatureValue};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};
use std::collections::BTreeSet;

/// Median/IQR scaler, robust to the long tail of mileage values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustScaler {
    columns: Vec<String>,
    centers: Vec<f64>,
    scales: Vec<f64>,
}

impl RobustScaler {
    /// Fits one (center, scale) pair per column; `values[i]` holds column `i`.
    pub fn fit(columns: &[&str], values: &[Vec<f64>]) -> Result<Self, PredictorError> {
        if columns.len() != values.len() {
            return Err(PredictorError::SchemaMismatch {
                reason: format!(
                    "scaler got {} columns but {} value vectors",
                    columns.len(),
                    values.len()
                ),
            });
        }

        let mut centers = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());

        for (name, column) in columns.iter().zip(values) {
            if column.is_empty() {
                return Err(PredictorError::Inference {
                    reason: format!("cannot fit scaler on empty column '{}'", name),
                });
            }
            let mut data = Data::new(column.clone());
            let q1 = data.quantile(0.25);
            let median = data.quantile(0.5);
            let q3 = data.quantile(0.75);
            let iqr = q3 - q1;

            centers.push(median);
            scales.push(if iqr.is_finite() && iqr > 0.0 { iqr } else { 1.0 });
        }

        Ok(Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            centers,
            scales,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Checks that every column has a finite center and a positive scale.
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.centers.len() != self.columns.len() || self.scales.len() != self.columns.len() {
            return Err(PredictorError::SchemaMismatch {
                reason: format!(
                    "scaler has {} columns but {} centers and {} scales",
                    self.columns.len(),
                    self.centers.len(),
                    self.scales.len()
                ),
            });
        }
        for ((name, center), scale) in self.columns.iter().zip(&self.centers).zip(&self.scales) {
            if !center.is_finite() || !scale.is_finite() || *scale <= 0.0 {
                return Err(PredictorError::SchemaMismatch {
                    reason: format!(
                        "scaler column '{}' has invalid center {} / scale {}",
                        name, center, scale
                    ),
                });
            }
        }
        Ok(())
    }

    fn scale(&self, index: usize, value: f64) -> Result<f64, PredictorError> {
        match (self.centers.get(index), self.scales.get(index)) {
            (Some(center), Some(scale)) => Ok((value - center) / scale),
            _ => Err(PredictorError::Inference {
                reason: format!("scaler has no parameters for column {}", index),
            }),
        }
    }
}

/// One-hot encoder with sorted category vocabularies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Learns the category vocabulary of each column; `values[i]` holds column `i`.
    pub fn fit(columns: &[&str], values: &[Vec<String>]) -> Result<Self, PredictorError> {
        if columns.len() != values.len() {
            return Err(PredictorError::SchemaMismatch {
                reason: format!(
                    "encoder got {} columns but {} value vectors",
                    columns.len(),
                    values.len()
                ),
            });
        }

        let categories = values
            .iter()
            .map(|column| {
                column
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<String>>()
                    .into_iter()
                    .collect()
            })
            .collect();

        Ok(Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            categories,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Checks that each column has a vocabulary of distinct categories.
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.categories.len() != self.columns.len() {
            return Err(PredictorError::SchemaMismatch {
                reason: format!(
                    "encoder has {} columns but {} vocabularies",
                    self.columns.len(),
                    self.categories.len()
                ),
            });
        }
        for (name, vocabulary) in self.columns.iter().zip(&self.categories) {
            let distinct: BTreeSet<&String> = vocabulary.iter().collect();
            if vocabulary.is_empty() || distinct.len() != vocabulary.len() {
                return Err(PredictorError::SchemaMismatch {
                    reason: format!("encoder column '{}' has an invalid vocabulary", name),
                });
            }
        }
        Ok(())
    }

    fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    fn encode_into(
        &self,
        index: usize,
        value: &str,
        out: &mut Vec<f64>,
    ) -> Result<(), PredictorError> {
        let vocabulary = self
            .categories
            .get(index)
            .ok_or_else(|| PredictorError::Inference {
                reason: format!("encoder has no vocabulary for column {}", index),
            })?;
        let hit = vocabulary.iter().position(|c| c == value);
        out.extend((0..vocabulary.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
        Ok(())
    }
}

/// Numeric scaling plus categorical encoding, applied to named rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    scaler: RobustScaler,
    encoder: OneHotEncoder,
}

impl Preprocessor {
    /// Fits both stages on training rows. Every row must carry every column
    /// with the right type.
    pub fn fit(
        rows: &[FeatureRow],
        numeric: &[&str],
        categorical: &[&str],
    ) -> Result<Self, PredictorError> {
        let mut numeric_values = vec![Vec::with_capacity(rows.len()); numeric.len()];
        let mut categorical_values = vec![Vec::with_capacity(rows.len()); categorical.len()];

        for row in rows {
            for (i, name) in numeric.iter().enumerate() {
                numeric_values[i].push(numeric_cell(row, name)?);
            }
            for (i, name) in categorical.iter().enumerate() {
                categorical_values[i].push(categorical_cell(row, name)?.to_string());
            }
        }

        Ok(Self {
            scaler: RobustScaler::fit(numeric, &numeric_values)?,
            encoder: OneHotEncoder::fit(categorical, &categorical_values)?,
        })
    }

    /// Input columns the fitted preprocessing expects, numeric first
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.scaler
            .columns()
            .iter()
            .chain(self.encoder.columns())
            .map(String::as_str)
    }

    pub fn output_width(&self) -> usize {
        self.scaler.columns().len() + self.encoder.width()
    }

    /// Rejects fitted state whose parameter vectors disagree in length.
    pub fn validate(&self) -> Result<(), PredictorError> {
        self.scaler.validate()?;
        self.encoder.validate()
    }

    /// Transforms one row into the model's dense feature vector.
    ///
    /// The row must carry exactly the fitted columns with matching types;
    /// nothing is coerced.
    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>, PredictorError> {
        if let Some(extra) = row
            .names()
            .find(|name| !self.input_columns().any(|c| c == *name))
        {
            return Err(PredictorError::SchemaMismatch {
                reason: format!("unexpected column '{}'", extra),
            });
        }

        let mut out = Vec::with_capacity(self.output_width());

        for (i, name) in self.scaler.columns().iter().enumerate() {
            let value = numeric_cell(row, name)?;
            out.push(self.scaler.scale(i, value)?);
        }

        for (i, name) in self.encoder.columns().iter().enumerate() {
            let value = categorical_cell(row, name)?;
            self.encoder.encode_into(i, value, &mut out)?;
        }

        Ok(out)
    }
}

fn numeric_cell(row: &FeatureRow, name: &str) -> Result<f64, PredictorError> {
    match row.get(name) {
        Some(FeatureValue::Numeric(v)) if v.is_finite() => Ok(*v),
        Some(FeatureValue::Numeric(v)) => Err(PredictorError::SchemaMismatch {
            reason: format!("column '{}' has non-finite value {}", name, v),
        }),
        Some(other) => Err(PredictorError::SchemaMismatch {
            reason: format!("column '{}' expects numeric, got {}", name, other.type_name()),
        }),
        None => Err(PredictorError::SchemaMismatch {
            reason: format!("missing column '{}'", name),
        }),
    }
}

fn categorical_cell<'a>(row: &'a FeatureRow, name: &str) -> Result<&'a str, PredictorError> {
    match row.get(name) {
        Some(FeatureValue::Categorical(v)) => Ok(v.as_str()),
        Some(other) => Err(PredictorError::SchemaMismatch {
            reason: format!(
                "column '{}' expects categorical, got {}",
                name,
                other.type_name()
            ),
        }),
        None => Err(PredictorError::SchemaMismatch {
            reason: format!("missing column '{}'", name),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<FeatureRow> {
        [
            ("BMW", 1.0, 10_000.0),
            ("Ford", 2.0, 20_000.0),
            ("BMW", 3.0, 30_000.0),
            ("VW", 4.0, 40_000.0),
            ("Ford", 5.0, 50_000.0),
        ]
        .iter()
        .map(|(make, size, miles)| {
            FeatureRow::new()
                .with_categorical("make", *make)
                .with_numeric("size", *size)
                .with_numeric("miles", *miles)
        })
        .collect()
    }

    fn fitted() -> Preprocessor {
        Preprocessor::fit(&rows(), &["size", "miles"], &["make"]).unwrap()
    }

    #[test]
    fn test_median_row_scales_to_zero() {
        let pre = fitted();
        let row = FeatureRow::new()
            .with_categorical("make", "Ford")
            .with_numeric("size", 3.0)
            .with_numeric("miles", 30_000.0);
        let out = pre.transform(&row).unwrap();

        assert_eq!(pre.output_width(), 2 + 3);
        assert_eq!(out.len(), 5);
        assert!(out[0].abs() < 1e-9);
        assert!(out[1].abs() < 1e-9);
        // Sorted vocabulary: BMW, Ford, VW
        assert_eq!(&out[2..], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_scaling_is_monotonic() {
        let pre = fitted();
        let low = FeatureRow::new()
            .with_categorical("make", "BMW")
            .with_numeric("size", 1.0)
            .with_numeric("miles", 10_000.0);
        let high = FeatureRow::new()
            .with_categorical("make", "BMW")
            .with_numeric("size", 5.0)
            .with_numeric("miles", 50_000.0);
        let low = pre.transform(&low).unwrap();
        let high = pre.transform(&high).unwrap();
        assert!(low[0] < 0.0 && high[0] > 0.0);
        assert!(low[1] < high[1]);
    }

    #[test]
    fn test_unknown_category_encodes_as_zeros() {
        let pre = fitted();
        let row = FeatureRow::new()
            .with_categorical("make", "Porsche")
            .with_numeric("size", 2.0)
            .with_numeric("miles", 5_000.0);
        let out = pre.transform(&row).unwrap();
        assert_eq!(&out[2..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_constant_column_does_not_divide_by_zero() {
        let rows: Vec<FeatureRow> = (0..4)
            .map(|_| FeatureRow::new().with_numeric("size", 2.0))
            .collect();
        let pre = Preprocessor::fit(&rows, &["size"], &[]).unwrap();
        let out = pre
            .transform(&FeatureRow::new().with_numeric("size", 4.0))
            .unwrap();
        assert_eq!(out, vec![2.0]);
    }

    #[test]
    fn test_schema_mismatches_are_rejected() {
        let pre = fitted();

        let missing = FeatureRow::new()
            .with_categorical("make", "BMW")
            .with_numeric("size", 2.0);
        let err = pre.transform(&missing).unwrap_err();
        assert!(matches!(err, PredictorError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("miles"));

        let wrong_type = FeatureRow::new()
            .with_categorical("make", "BMW")
            .with_categorical("size", "2.0")
            .with_numeric("miles", 1.0);
        assert!(matches!(
            pre.transform(&wrong_type),
            Err(PredictorError::SchemaMismatch { .. })
        ));

        let extra = rows()[0].clone().with_numeric("doors", 5.0);
        let err = pre.transform(&extra).unwrap_err();
        assert!(err.to_string().contains("doors"));

        let nan = FeatureRow::new()
            .with_categorical("make", "BMW")
            .with_numeric("size", f64::NAN)
            .with_numeric("miles", 1.0);
        assert!(pre.transform(&nan).is_err());
    }

    #[test]
    fn test_fitted_state_validates() {
        assert!(fitted().validate().is_ok());
    }

    #[test]
    fn test_short_scaler_parameters_are_errors_not_panics() {
        let mut pre = fitted();
        pre.scaler.centers.pop();
        assert!(matches!(
            pre.validate(),
            Err(PredictorError::SchemaMismatch { .. })
        ));
        assert!(pre.transform(&rows()[0]).is_err());
    }

    #[test]
    fn test_missing_vocabulary_is_error_not_panic() {
        let mut pre = fitted();
        pre.encoder.categories.clear();
        assert!(pre.validate().is_err());
        assert!(matches!(
            pre.transform(&rows()[0]),
            Err(PredictorError::Inference { .. })
        ));
    }

    #[test]
    fn test_duplicate_or_empty_vocabulary_rejected() {
        let mut pre = fitted();
        pre.encoder.categories[0] = vec!["BMW".to_string(), "BMW".to_string()];
        assert!(pre.validate().is_err());

        pre.encoder.categories[0].clear();
        assert!(pre.validate().is_err());
    }

    #[test]
    fn test_non_positive_scale_rejected() {
        let mut pre = fitted();
        pre.scaler.scales[0] = 0.0;
        assert!(pre.validate().is_err());
    }

    #[test]
    fn test_fit_rejects_malformed_training_rows() {
        let mut bad = rows();
        bad[2].remove("miles");
        assert!(Preprocessor::fit(&bad, &["size", "miles"], &["make"]).is_err());
    }
}
