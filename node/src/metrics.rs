//! # Prometheus Metrics
//!
//! Operational metrics for the vault node, scraped at `/metrics` on the
//! metrics port. Everything is registered in a dedicated
//! [`prometheus::Registry`] under the `custodia` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metric handles shared by the request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Deposits credited.
    pub deposits_total: IntCounter,
    /// Withdrawals paid out.
    pub withdrawals_total: IntCounter,
    /// Rejected vault operations, by error kind.
    pub rejections_total: IntCounterVec,
    /// Events forwarded to WebSocket subscribers.
    pub events_published_total: IntCounter,
    /// Supported assets, native included.
    pub registered_assets: IntGauge,
    /// Time spent inside a vault call, in seconds.
    pub operation_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("custodia".into()), None)?;

        let deposits_total = IntCounter::new("deposits_total", "Total number of credited deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("withdrawals_total", "Total number of paid withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Vault operations rejected, by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let events_published_total = IntCounter::new(
            "events_published_total",
            "Vault events forwarded to subscribers",
        )?;
        registry.register(Box::new(events_published_total.clone()))?;

        let registered_assets =
            IntGauge::new("registered_assets", "Supported assets, native included")?;
        registry.register(Box::new(registered_assets.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Time spent inside a vault call in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            deposits_total,
            withdrawals_total,
            rejections_total,
            events_published_total,
            registered_assets,
            operation_latency_seconds,
        })
    }

    /// Counts a rejected operation under its error kind.
    pub fn record_rejection(&self, kind: &str) {
        self.rejections_total.with_label_values(&[kind]).inc();
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_labelled_by_kind() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.record_rejection("BankCapExceeded");
        metrics.record_rejection("BankCapExceeded");
        metrics.deposits_total.inc();

        let text = metrics.encode().unwrap();
        assert!(text.contains("custodia_rejections_total{kind=\"BankCapExceeded\"} 2"));
        assert!(text.contains("custodia_deposits_total 1"));
    }
}
