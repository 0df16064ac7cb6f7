use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_registry::vehicle_to_row;
use crate::domain::ports::ModelProvider;
use crate::domain::valuation::{
    ConfidencePolicy, PRICE_FLOOR, PredictionResult, PriceBreakdown, apply_price_floor,
};
use crate::domain::vehicle::VehicleAttributes;
use crate::infrastructure::observability::Metrics;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Turns vehicle attributes into a floored price estimate plus the
/// display-only breakdown.
pub struct PredictionService {
    models: Arc<dyn ModelProvider>,
    confidence: ConfidencePolicy,
    metrics: Option<Metrics>,
}

impl PredictionService {
    pub fn new(models: Arc<dyn ModelProvider>, confidence: ConfidencePolicy) -> Self {
        Self {
            models,
            confidence,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Values one vehicle.
    ///
    /// Fails with `ModelUnavailable` before touching the input when no model
    /// can be obtained, `SchemaMismatch` when the attributes or the row do not
    /// fit the fitted preprocessing, and `InferenceFailure` when the model
    /// errors or returns a non-finite value.
    pub fn predict(&self, attrs: &VehicleAttributes) -> Result<PredictionResult, PredictionError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("predict", %request_id);
        let _enter = span.enter();

        let started = Instant::now();
        let result = self.run(request_id, attrs);

        if let Some(metrics) = &self.metrics {
            metrics.observe_prediction_latency(started.elapsed().as_secs_f64());
            match &result {
                Ok(prediction) => {
                    metrics.inc_predictions("ok");
                    if prediction.floor_applied {
                        metrics.price_floor_applied_total.inc();
                    }
                    metrics
                        .last_predicted_price
                        .set(prediction.price.to_f64().unwrap_or(0.0));
                }
                Err(e) => metrics.inc_predictions(e.kind()),
            }
        }

        match &result {
            Ok(prediction) => info!(
                "Predicted {} {} ({}): £{} (raw {:.2}, floor applied: {})",
                attrs.manufacturer,
                attrs.model,
                attrs.year,
                prediction.price,
                prediction.raw_model_output,
                prediction.floor_applied
            ),
            Err(e) => warn!("Prediction failed [{}]: {}", e.kind(), e),
        }

        result
    }

    /// Values many vehicles in parallel against the shared model.
    /// Results are returned in input order.
    pub fn predict_batch(
        &self,
        vehicles: &[VehicleAttributes],
    ) -> Vec<Result<PredictionResult, PredictionError>> {
        info!("Valuing batch of {} vehicles", vehicles.len());
        vehicles.par_iter().map(|attrs| self.predict(attrs)).collect()
    }

    fn run(
        &self,
        request_id: Uuid,
        attrs: &VehicleAttributes,
    ) -> Result<PredictionResult, PredictionError> {
        let model = self.models.model()?;

        attrs.validate()?;
        let row = vehicle_to_row(attrs);

        let raw = model.predict(&row)?;
        debug!("Raw model output: {}", raw);

        if !raw.is_finite() {
            return Err(PredictionError::InferenceFailure {
                reason: format!("model returned non-finite value {}", raw),
            });
        }
        let raw_price =
            Decimal::from_f64(raw).ok_or_else(|| PredictionError::InferenceFailure {
                reason: format!("model output {} is outside the representable price range", raw),
            })?;

        let floor_applied = raw_price < PRICE_FLOOR;
        let price = apply_price_floor(raw_price).round_dp(2);

        Ok(PredictionResult {
            request_id,
            price,
            raw_model_output: raw,
            floor_applied,
            confidence: self.confidence.confidence(),
            breakdown: PriceBreakdown::for_vehicle(attrs),
            model_name: model.name().to_string(),
            model_version: model.version().to_string(),
        })
    }
}
