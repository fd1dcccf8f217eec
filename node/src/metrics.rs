//! # Prometheus Metrics
//!
//! Exposes operational metrics for the vault node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] under
//! the `stakevault` namespace so they do not collide with any default
//! global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use stakevault_contracts::VaultSummary;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc` internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct VaultMetrics {
    registry: Registry,
    /// Successful stakes.
    pub stakes_total: IntCounter,
    /// Successful withdrawals.
    pub withdrawals_total: IntCounter,
    /// Rejected or rolled-back operations, by operation and error code.
    pub rejected_operations_total: IntCounterVec,
    /// Sum of all recorded principal, in gwei.
    pub total_recorded: IntGauge,
    /// Vault holding in the delegate pool, in gwei.
    pub pool_holding: IntGauge,
    /// Depositors with a ledger record.
    pub depositors: IntGauge,
    /// Time spent inside a vault operation, by operation.
    pub operation_latency_seconds: HistogramVec,
}

impl VaultMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("stakevault".into()), None)?;

        let stakes_total = IntCounter::new("stakes_total", "Total number of successful stakes")?;
        registry.register(Box::new(stakes_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("withdrawals_total", "Total number of successful withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let rejected_operations_total = IntCounterVec::new(
            Opts::new(
                "rejected_operations_total",
                "Operations that failed and left no state change",
            ),
            &["operation", "code"],
        )?;
        registry.register(Box::new(rejected_operations_total.clone()))?;

        let total_recorded = IntGauge::new(
            "total_recorded_gwei",
            "Sum of principal recorded across all depositors",
        )?;
        registry.register(Box::new(total_recorded.clone()))?;

        let pool_holding = IntGauge::new(
            "pool_holding_gwei",
            "Value the delegate pool recognises as held by the vault",
        )?;
        registry.register(Box::new(pool_holding.clone()))?;

        let depositors = IntGauge::new("depositors", "Number of depositors ever seen")?;
        registry.register(Box::new(depositors.clone()))?;

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Vault operation latency in seconds, including the pool call",
            )
            .buckets(vec![
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
            ]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            stakes_total,
            withdrawals_total,
            rejected_operations_total,
            total_recorded,
            pool_holding,
            depositors,
            operation_latency_seconds,
        })
    }

    /// Refreshes the gauges from a vault summary.
    pub fn observe(&self, summary: &VaultSummary) {
        self.total_recorded
            .set(i64::try_from(summary.total_recorded).unwrap_or(i64::MAX));
        self.pool_holding
            .set(i64::try_from(summary.pool_holding).unwrap_or(i64::MAX));
        self.depositors
            .set(i64::try_from(summary.depositors).unwrap_or(i64::MAX));
    }

    /// Counts a failed operation.
    pub fn reject(&self, operation: &str, code: &str) {
        self.rejected_operations_total
            .with_label_values(&[operation, code])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<VaultMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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
