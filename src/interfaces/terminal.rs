//! Plain-text rendering of valuations for the terminal.

use crate::application::explanation::{FEATURE_IMPORTANCE, explanation_text, group_thousands};
use crate::application::ml::pipeline::ArtifactMetadata;
use crate::domain::errors::{LoadError, PredictionError};
use crate::domain::valuation::PredictionResult;
use crate::domain::vehicle::{
    EngineSize, FuelType, MAX_MILEAGE, MAX_MODEL_YEAR, MIN_MODEL_YEAR, Manufacturer,
    VehicleAttributes,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;
use std::path::Path;

const RULE: &str = "══════════════════════════════════════════════════════";

/// Formats a pound amount with no pence and thousands separators, e.g. `£25,000`.
pub fn format_gbp(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let whole = rounded.abs().to_u64().unwrap_or(0);
    let sign = if rounded.is_sign_negative() && whole != 0 {
        "-"
    } else {
        ""
    };
    format!("{}£{}", sign, group_thousands(whole))
}

pub fn render_prediction(attrs: &VehicleAttributes, result: &PredictionResult) -> String {
    let mut out = String::new();
    let b = &result.breakdown;

    let _ = writeln!(out, "\n{}", RULE);
    let _ = writeln!(out, "  PREDICTED RESALE PRICE");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "  {} {} ({}, {}, {}, {} miles)",
        attrs.manufacturer,
        attrs.model,
        attrs.year,
        attrs.fuel_type,
        attrs.engine_size,
        group_thousands(u64::from(attrs.mileage))
    );
    let _ = writeln!(out, "\n  {}", format_gbp(result.price));
    let _ = writeln!(out, "  Confidence: {:.1}%", result.confidence * 100.0);
    if result.floor_applied {
        let _ = writeln!(out, "  (raised to the minimum reportable price)");
    }

    let _ = writeln!(out, "\n  Price Breakdown & Insights:");
    let _ = writeln!(out, "    Base Value:        {}", format_gbp(b.base_price));
    let _ = writeln!(out, "    Age Depreciation: -{}", format_gbp(b.depreciation));
    let _ = writeln!(out, "    Mileage Impact:   -{}", format_gbp(b.mileage_impact));
    let _ = writeln!(out, "    Engine Bonus:     +{}", format_gbp(b.engine_bonus));
    let _ = writeln!(
        out,
        "    (indicative figures, not derived from the model's estimate)"
    );

    let _ = writeln!(out, "\n  Explanation:");
    for line in wrap(&explanation_text(attrs), 70) {
        let _ = writeln!(out, "    {}", line);
    }

    let _ = writeln!(out, "\n  Feature Importance:");
    for (feature, weight) in FEATURE_IMPORTANCE {
        let bar_len = (weight * 100.0).round() as usize;
        let _ = writeln!(
            out,
            "    {:<13} {:>4.0}% {}",
            feature,
            weight * 100.0,
            "█".repeat(bar_len / 2)
        );
    }

    let _ = writeln!(
        out,
        "\n  Model: {} ({})",
        result.model_name, result.model_version
    );
    let _ = writeln!(out, "{}", RULE);
    out
}

/// User-facing message for a failed prediction
pub fn render_error(err: &PredictionError) -> String {
    match err {
        PredictionError::ModelUnavailable { source } => match source {
            LoadError::ArtifactNotFound { path } => format!(
                "Error: model file not found at {}.\nCannot make predictions without the model file.",
                path.display()
            ),
            LoadError::ArtifactCorrupt { path, reason } => format!(
                "Error loading model from {}: {}\nCannot make predictions without the model file.",
                path.display(),
                reason
            ),
        },
        PredictionError::SchemaMismatch { reason } => format!(
            "Error making prediction: {}\nPlease ensure the input data format matches the model's expected format.",
            reason
        ),
        PredictionError::InferenceFailure { reason } => {
            format!("Error making prediction: {}", reason)
        }
    }
}

/// Valid choices for every input field
pub fn render_catalog() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Manufacturers and models:");
    for manufacturer in Manufacturer::all() {
        let _ = writeln!(
            out,
            "  {:<8} {}",
            manufacturer.as_str(),
            manufacturer.models().join(", ")
        );
    }
    let fuels: Vec<&str> = FuelType::all().iter().map(FuelType::as_str).collect();
    let _ = writeln!(out, "Fuel types: {}", fuels.join(", "));
    let sizes: Vec<String> = EngineSize::all().iter().map(|s| s.to_string()).collect();
    let _ = writeln!(out, "Engine sizes: {}", sizes.join(", "));
    let _ = writeln!(
        out,
        "Year of manufacture: {}-{}",
        MIN_MODEL_YEAR, MAX_MODEL_YEAR
    );
    let _ = writeln!(
        out,
        "Mileage: 0-{} miles",
        group_thousands(u64::from(MAX_MILEAGE))
    );
    out
}

/// Summary of the loaded artifact and its hold-out evaluation
pub fn render_model_info(path: &Path, metadata: &ArtifactMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model Stats");
    let _ = writeln!(out, "  File:          {}", path.display());
    let _ = writeln!(out, "  Version:       {}", metadata.version);
    let _ = writeln!(
        out,
        "  Trained at:    {}",
        metadata.trained_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "  Training data: {} rows ({} held out)",
        group_thousands(metadata.training_rows as u64),
        group_thousands(metadata.test_rows as u64)
    );
    let _ = writeln!(
        out,
        "  Forest:        {} trees, depth {}, min split {}",
        metadata.params.n_trees, metadata.params.max_depth, metadata.params.min_samples_split
    );
    let _ = writeln!(out, "  Inputs:        {} encoded features", metadata.input_width);
    match &metadata.evaluation {
        Some(eval) => {
            let _ = writeln!(out, "  R² Score:      {:.2}", eval.r2);
            let _ = writeln!(
                out,
                "  MAE:           {}",
                format_gbp(Decimal::from_f64_retain(eval.mae).unwrap_or_default())
            );
            let _ = writeln!(
                out,
                "  RMSE:          {}",
                format_gbp(Decimal::from_f64_retain(eval.rmse).unwrap_or_default())
            );
        }
        None => {
            let _ = writeln!(out, "  Evaluation:    not available (trained without hold-out)");
        }
    }
    out
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::pipeline::{EvaluationReport, ForestParams};
    use crate::domain::valuation::PriceBreakdown;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn vehicle() -> VehicleAttributes {
        VehicleAttributes {
            manufacturer: Manufacturer::BMW,
            model: "X3".to_string(),
            fuel_type: FuelType::Diesel,
            year: 2019,
            engine_size: EngineSize::from_liters(2.0).unwrap(),
            mileage: 48_000,
        }
    }

    fn result() -> PredictionResult {
        PredictionResult {
            request_id: Uuid::new_v4(),
            price: dec!(21450.60),
            raw_model_output: 21450.6,
            floor_applied: false,
            confidence: 0.9234,
            breakdown: PriceBreakdown::for_vehicle(&vehicle()),
            model_name: "SmartCore Random Forest".to_string(),
            model_version: "rf-20240601120000".to_string(),
        }
    }

    #[test]
    fn test_format_gbp() {
        assert_eq!(format_gbp(dec!(25000)), "£25,000");
        assert_eq!(format_gbp(dec!(10560.00)), "£10,560");
        assert_eq!(format_gbp(dec!(617.5)), "£618");
        assert_eq!(format_gbp(dec!(-1234.4)), "-£1,234");
        assert_eq!(format_gbp(Decimal::ZERO), "£0");
    }

    #[test]
    fn test_render_prediction_sections() {
        let text = render_prediction(&vehicle(), &result());
        assert!(text.contains("£21,451"));
        assert!(text.contains("Confidence: 92.3%"));
        assert!(text.contains("Base Value:        £35,000"));
        assert!(text.contains("Age Depreciation: -£21,000"));
        assert!(text.contains("Mileage Impact:   -£2,400"));
        assert!(text.contains("Engine Bonus:     +£2,000"));
        assert!(text.contains("48,000 miles"));
        assert!(text.contains("Feature Importance"));
        assert!(!text.contains("minimum reportable price"));
    }

    #[test]
    fn test_render_error_messages() {
        let err = PredictionError::ModelUnavailable {
            source: LoadError::ArtifactNotFound {
                path: PathBuf::from("model.json"),
            },
        };
        let text = render_error(&err);
        assert!(text.contains("model.json"));
        assert!(text.contains("Cannot make predictions without the model file."));

        let err = PredictionError::SchemaMismatch {
            reason: "Model 'Golf' is not offered by BMW".to_string(),
        };
        assert!(render_error(&err).contains("expected format"));
    }

    #[test]
    fn test_render_catalog_lists_choices() {
        let text = render_catalog();
        assert!(text.contains("718 Cayman"));
        assert!(text.contains("Electric"));
        assert!(text.contains("5.0L"));
        assert!(text.contains("2000-2024"));
        assert!(text.contains("300,000"));
    }

    #[test]
    fn test_render_model_info() {
        let metadata = ArtifactMetadata {
            version: "rf-1".to_string(),
            trained_at: chrono::Utc::now(),
            training_rows: 40_000,
            test_rows: 10_000,
            params: ForestParams {
                n_trees: 100,
                max_depth: 10,
                min_samples_split: 5,
                seed: 42,
            },
            input_width: 21,
            evaluation: Some(EvaluationReport {
                samples: 10_000,
                mae: 1245.3,
                rmse: 2010.9,
                r2: 0.921,
            }),
        };
        let text = render_model_info(Path::new("data/model/car_price_model.json"), &metadata);
        assert!(text.contains("File:          data/model/car_price_model.json"));
        assert!(text.contains("40,000 rows"));
        assert!(text.contains("21 encoded features"));
        assert!(text.contains("R² Score:      0.92"));
        assert!(text.contains("MAE:           £1,245"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let lines = wrap("one two three four five six seven", 10);
        assert!(lines.iter().all(|l| l.len() <= 10));
        assert_eq!(lines.join(" "), "one two three four five six seven");
    }
}
