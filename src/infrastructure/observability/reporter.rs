//! Push-based metrics reporter for AutoValue
//!
//! Emits a structured JSON snapshot through the log stream.
//!
//! **Security**: This system only SENDS data, never accepts requests.

use crate::infrastructure::observability::metrics::Metrics;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Metrics snapshot for JSON output
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub model: ModelSnapshot,
    pub predictions: PredictionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ModelSnapshot {
    pub loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct PredictionSnapshot {
    pub succeeded: u64,
    pub model_unavailable: u64,
    pub schema_mismatch: u64,
    pub inference_failure: u64,
    pub floor_applied: u64,
    pub last_price: f64,
}

/// Push-based metrics reporter.
/// No HTTP server, no incoming connections - only outbound data.
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Collect current metrics snapshot
    pub fn collect_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: ModelSnapshot {
                loaded: self.metrics.model_loaded.get() > 0.0,
            },
            predictions: PredictionSnapshot {
                succeeded: self.metrics.predictions_with_outcome("ok"),
                model_unavailable: self.metrics.predictions_with_outcome("model_unavailable"),
                schema_mismatch: self.metrics.predictions_with_outcome("schema_mismatch"),
                inference_failure: self.metrics.predictions_with_outcome("inference_failure"),
                floor_applied: self.metrics.price_floor_applied_total.get() as u64,
                last_price: self.metrics.last_predicted_price.get(),
            },
        }
    }

    /// Output the snapshot as a structured JSON log line
    pub fn report(&self) {
        let snapshot = self.collect_snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                // Prefix so the line can be filtered out of the log stream
                info!("METRICS_JSON:{}", json);
            }
            Err(e) => warn!("Failed to serialize metrics: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("ok");
        metrics.inc_predictions("model_unavailable");
        metrics.price_floor_applied_total.inc();
        metrics.last_predicted_price.set(12_500.0);
        metrics.model_loaded.set(1.0);

        let reporter = MetricsReporter::new(metrics);
        let snapshot = reporter.collect_snapshot();

        assert!(snapshot.model.loaded);
        assert_eq!(snapshot.predictions.succeeded, 1);
        assert_eq!(snapshot.predictions.model_unavailable, 1);
        assert_eq!(snapshot.predictions.floor_applied, 1);
        assert_eq!(snapshot.predictions.last_price, 12_500.0);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"schema_mismatch\":0"));
    }
}
