//! Wire models decoded at the API boundary
//!
//! Every optional field on the backend becomes an `Option` here so that the
//! transformers never have to inspect loosely-typed JSON.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// CPU and memory usage for one sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuMemoryUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_usage_nano_cores: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<f64>,
}

/// Storage usage for one sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_bytes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_bytes: Option<f64>,
}

/// Network traffic for one sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rx_bytes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_bytes: Option<f64>,
}

impl NetworkUsage {
    /// Combined inbound and outbound bytes, if either side was reported
    pub fn total_bytes(&self) -> Option<f64> {
        match (self.rx_bytes, self.tx_bytes) {
            (None, None) => None,
            (rx, tx) => Some(rx.unwrap_or(0.0) + tx.unwrap_or(0.0)),
        }
    }
}

/// Cost components in USD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost_usd: Option<f64>,
}

/// A single sample in a metric series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub time: String,
    #[serde(default, alias = "usage", skip_serializing_if = "Option::is_none")]
    pub cpu_memory: Option<CpuMemoryUsage>,
    #[serde(default, alias = "filesystem", skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostBreakdown>,
}

/// Time-ordered samples for one entity (node, pod, namespace, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub points: Vec<MetricPoint>,
}

/// Payload of the raw and cost metric endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default)]
    pub series: Vec<MetricSeries>,
}

/// Backend discovery/resync status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    #[serde(default)]
    pub last_discovered_at: Option<String>,
    #[serde(default)]
    pub last_error_at: Option<String>,
    #[serde(default)]
    pub last_error_message: Option<String>,
    #[serde(default)]
    pub resync_running: bool,
}

impl SystemStatus {
    /// Time of the last completed discovery; blank values count as absent
    pub fn discovered_at(&self) -> Option<&str> {
        self.last_discovered_at
            .as_deref()
            .filter(|at| !at.trim().is_empty())
    }

    /// Discovery has completed at least once and no resync is in progress
    pub fn is_settled(&self) -> bool {
        self.discovered_at().is_some() && !self.resync_running
    }
}

/// Backend log file listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFiles {
    #[serde(default)]
    pub files: Vec<String>,
}

/// A page of inventory objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// One Kubernetes object from the inventory endpoints.
///
/// Store-backed container records carry no `metadata`, so the name falls back
/// to the flattened fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl InventoryItem {
    pub fn name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .or_else(|| self.str_field("name"))
            .or_else(|| self.str_field("container_name"))
            .or_else(|| self.str_field("node_name"))
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.namespace.as_deref())
            .or_else(|| self.str_field("namespace"))
    }

    pub fn created_at(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.creation_timestamp.as_ref())
            .map(|t| t.0.to_rfc3339())
            .or_else(|| self.str_field("created_at").map(str::to_string))
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Dashboard settings stored on the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_interval_secs: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Unit prices used for cost calculation, in USD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPrices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_core_hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb_hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_gb_hour: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_gb: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Alert rule configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub rules: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// LLM assistant configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An alert currently firing on the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlert {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}
