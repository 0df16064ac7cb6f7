//! Prometheus metrics definitions for AutoValue
//!
//! All metrics use the `autovalue_` prefix and are read-only.

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the valuation service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Artifact load attempts by outcome
    pub model_loads_total: CounterVec,
    /// Model cache state (0=empty, 1=loaded)
    pub model_loaded: Gauge,
    /// Prediction requests by outcome
    pub predictions_total: CounterVec,
    /// Predictions raised to the price floor
    pub price_floor_applied_total: Counter,
    /// End-to-end prediction latency in seconds
    pub prediction_latency_seconds: Histogram,
    /// Most recent predicted price
    pub last_predicted_price: Gauge,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let model_loads_total = CounterVec::new(
            Opts::new(
                "autovalue_model_loads_total",
                "Model artifact load attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(model_loads_total.clone()))?;

        let model_loaded = Gauge::with_opts(Opts::new(
            "autovalue_model_loaded",
            "Model artifact cached (0=no, 1=yes)",
        ))?;
        registry.register(Box::new(model_loaded.clone()))?;

        let predictions_total = CounterVec::new(
            Opts::new(
                "autovalue_predictions_total",
                "Prediction requests by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let price_floor_applied_total = Counter::with_opts(Opts::new(
            "autovalue_price_floor_applied_total",
            "Predictions raised to the minimum price",
        ))?;
        registry.register(Box::new(price_floor_applied_total.clone()))?;

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "autovalue_prediction_latency_seconds",
                "Prediction latency in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]),
        )?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        let last_predicted_price = Gauge::with_opts(Opts::new(
            "autovalue_last_predicted_price",
            "Most recent predicted resale price",
        ))?;
        registry.register(Box::new(last_predicted_price.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            model_loads_total,
            model_loaded,
            predictions_total,
            price_floor_applied_total,
            prediction_latency_seconds,
            last_predicted_price,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_model_loads(&self, outcome: &str) {
        self.model_loads_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_predictions(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    pub fn predictions_with_outcome(&self, outcome: &str) -> u64 {
        self.predictions_total.with_label_values(&[outcome]).get() as u64
    }

    pub fn observe_prediction_latency(&self, seconds: f64) {
        self.prediction_latency_seconds.observe(seconds);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}
