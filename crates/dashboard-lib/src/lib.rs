//! Data-fetch and view-model pipeline for the cost dashboard
//!
//! This crate provides:
//! - A typed HTTP client for the dashboard backend
//! - Cache keys, query parameters and automatic time granularity
//! - A fetch hook that discards results of superseded requests
//! - Transformers from metric series to summary, trend and efficiency views
//! - A readiness gate that waits for cluster discovery before the app runs
//! - A shared client-side store and observability helpers

pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod granularity;
pub mod models;
pub mod observability;
pub mod query;
pub mod readiness;
pub mod store;
pub mod transform;

pub use client::ApiClient;
pub use endpoints::{InventoryKind, InventorySource, MetricTarget, MetricView};
pub use envelope::{extract_payload, failure_message, ApiResponse};
pub use error::ApiError;
pub use fetch::{FetchHook, FetchOptions, FetchState};
pub use granularity::{pick_granularity, with_auto_granularity, Granularity};
pub use models::*;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use query::{build_key, QueryParams};
pub use readiness::{GateConfig, GateHandle, GatePhase, GateView, Popup, ReadinessGate};
pub use store::AppStore;
pub use transform::{
    compute_efficiency_score, to_efficiency_metrics, to_summary_metric, to_trend_metrics,
    EfficiencyMetric, SummaryMetric, TrendMetricPoint,
};
