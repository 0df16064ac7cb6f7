//! Push-based observability for AutoValue
//!
//! This module provides observability through **outbound data only** - no HTTP server,
//! no incoming requests. Metrics are kept in a Prometheus registry and pushed as a
//! structured JSON log line (for Loki, Fluentd, CloudWatch).
//!
//! **Security**: This system only SENDS data, it never accepts requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
