//! Observability for the dashboard client
//!
//! Provides:
//! - Prometheus metrics (fetch latency, stale discards, status polls, resync triggers)
//! - Structured event logging with tracing

use prometheus::{
    register_histogram, register_int_counter, Encoder, Histogram, IntCounter, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for backend request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    fetch_latency_seconds: Histogram,
    fetches_issued: IntCounter,
    fetches_discarded: IntCounter,
    fetch_errors: IntCounter,
    status_polls: IntCounter,
    status_poll_errors: IntCounter,
    resync_triggers: IntCounter,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "dashboard_fetch_latency_seconds",
                "Time from issuing a fetch until its result arrived",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            fetches_issued: register_int_counter!(
                "dashboard_fetches_issued_total",
                "Fetches issued by fetch hooks"
            )
            .expect("Failed to register fetches_issued"),

            fetches_discarded: register_int_counter!(
                "dashboard_fetches_discarded_total",
                "Fetch results dropped because a newer request was issued"
            )
            .expect("Failed to register fetches_discarded"),

            fetch_errors: register_int_counter!(
                "dashboard_fetch_errors_total",
                "Fetches that resolved with an error"
            )
            .expect("Failed to register fetch_errors"),

            status_polls: register_int_counter!(
                "dashboard_status_polls_total",
                "System status polls issued by the readiness gate"
            )
            .expect("Failed to register status_polls"),

            status_poll_errors: register_int_counter!(
                "dashboard_status_poll_errors_total",
                "System status polls that failed"
            )
            .expect("Failed to register status_poll_errors"),

            resync_triggers: register_int_counter!(
                "dashboard_resync_triggers_total",
                "Resync requests sent by the readiness gate"
            )
            .expect("Failed to register resync_triggers"),
        }
    }
}

/// Handle to the process-wide dashboard metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new)
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn inc_fetches_issued(&self) {
        self.inner().fetches_issued.inc();
    }

    pub fn inc_fetches_discarded(&self) {
        self.inner().fetches_discarded.inc();
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors.inc();
    }

    pub fn inc_status_polls(&self) {
        self.inner().status_polls.inc();
    }

    pub fn inc_status_poll_errors(&self) {
        self.inner().status_poll_errors.inc();
    }

    pub fn inc_resync_triggers(&self) {
        self.inner().resync_triggers.inc();
    }

    pub fn fetches_discarded(&self) -> u64 {
        self.inner().fetches_discarded.get()
    }

    pub fn resync_triggers(&self) -> u64 {
        self.inner().resync_triggers.get()
    }

    /// Prometheus text exposition of everything in the default registry
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for pipeline events
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_gate_started(&self, last_resync: Option<&str>) {
        info!(
            event = "gate_started",
            component = %self.component,
            last_resync = ?last_resync,
            "Readiness gate polling system status"
        );
    }

    pub fn log_gate_skipped(&self, last_resync: &str) {
        debug!(
            event = "gate_skipped",
            component = %self.component,
            last_resync = %last_resync,
            "Last resync is recent, readiness gate inactive"
        );
    }

    pub fn log_status_poll_failed(&self, attempt: u64, message: &str) {
        warn!(
            event = "status_poll_failed",
            component = %self.component,
            attempt = attempt,
            error = %message,
            "System status poll failed, retrying"
        );
    }

    pub fn log_resync_triggered(&self, success: bool, message: Option<&str>) {
        if success {
            info!(
                event = "resync_triggered",
                component = %self.component,
                "Triggered cluster resync"
            );
        } else {
            warn!(
                event = "resync_trigger_failed",
                component = %self.component,
                error = ?message,
                "Resync trigger failed, not retrying this session"
            );
        }
    }

    pub fn log_gate_ready(&self, last_discovered_at: &str, attempts: u64) {
        info!(
            event = "gate_ready",
            component = %self.component,
            last_discovered_at = %last_discovered_at,
            attempts = attempts,
            "Cluster discovery complete"
        );
    }

    pub fn log_fetch_discarded(&self, key: &str, token: u64, latest: u64) {
        debug!(
            event = "fetch_discarded",
            component = %self.component,
            key = %key,
            token = token,
            latest = latest,
            "Discarded stale fetch result"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_metrics_creation() {
        let metrics = DashboardMetrics::new();

        metrics.observe_fetch_latency(0.02);
        metrics.inc_fetches_issued();
        metrics.inc_fetches_discarded();
        metrics.inc_fetch_errors();
        metrics.inc_status_polls();
        metrics.inc_status_poll_errors();
        metrics.inc_resync_triggers();

        assert!(metrics.fetches_discarded() >= 1);
        assert!(metrics.render().contains("dashboard_fetches_issued_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("readiness_gate");
        assert_eq!(logger.component, "readiness_gate");
    }
}
