//! View models derived from raw metric series
//!
//! All transformers are pure and rebuild their output from the latest
//! response on every call.

use serde::{Deserialize, Serialize};

use crate::models::{CostBreakdown, MetricResponse, MetricSeries};

/// Most recent usage and cost for one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetric {
    pub id: String,
    pub name: String,
    /// CPU usage in nanocores
    pub cpu_usage: f64,
    /// Memory usage in bytes
    pub memory_usage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_usage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// Cost components of a trend point, in USD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendCost {
    pub cpu: f64,
    pub memory: f64,
    pub storage: f64,
    pub network: f64,
    pub total: f64,
}

impl From<&CostBreakdown> for TrendCost {
    fn from(cost: &CostBreakdown) -> Self {
        Self {
            cpu: cost.cpu_cost_usd.unwrap_or(0.0),
            memory: cost.memory_cost_usd.unwrap_or(0.0),
            storage: cost.storage_cost_usd.unwrap_or(0.0),
            network: cost.network_cost_usd.unwrap_or(0.0),
            total: cost.total_cost_usd.unwrap_or(0.0),
        }
    }
}

/// One point of a cost/usage trend chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendMetricPoint {
    pub timestamp: String,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub cost: TrendCost,
}

/// Efficiency score for one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyMetric {
    pub id: String,
    pub name: String,
    /// 0..=100
    pub efficiency_score: u8,
    /// Percentage of combined usage attributed to CPU
    pub cpu_share: f64,
    /// Percentage of combined usage attributed to memory
    pub memory_share: f64,
}

/// Summarize a series from its last point only.
///
/// This is the latest sample, not an average over the range. An empty series
/// yields zero usage and no optional fields.
pub fn to_summary_metric(series: &MetricSeries) -> SummaryMetric {
    let mut summary = SummaryMetric {
        id: series.key.clone(),
        name: series.name.clone().unwrap_or_else(|| series.key.clone()),
        ..Default::default()
    };

    let Some(last) = series.points.last() else {
        return summary;
    };

    if let Some(usage) = &last.cpu_memory {
        summary.cpu_usage = usage.cpu_usage_nano_cores.unwrap_or(0.0);
        summary.memory_usage = usage.memory_usage_bytes.unwrap_or(0.0);
    }
    summary.storage_usage = last.storage.as_ref().and_then(|s| s.used_bytes);
    summary.network_usage = last.network.as_ref().and_then(|n| n.total_bytes());
    summary.cost = last.cost.as_ref().and_then(|c| c.total_cost_usd);

    summary
}

/// Trend points of the first series; any further series are ignored
pub fn to_trend_metrics(response: &MetricResponse) -> Vec<TrendMetricPoint> {
    let Some(series) = response.series.first() else {
        return Vec::new();
    };

    series
        .points
        .iter()
        .map(|point| {
            let usage = point.cpu_memory.as_ref();
            TrendMetricPoint {
                timestamp: point.time.clone(),
                cpu_usage: usage.and_then(|u| u.cpu_usage_nano_cores).unwrap_or(0.0),
                memory_usage: usage.and_then(|u| u.memory_usage_bytes).unwrap_or(0.0),
                cost: point.cost.as_ref().map(TrendCost::from).unwrap_or_default(),
            }
        })
        .collect()
}

/// CPU share of combined usage as a 0..=100 score.
///
/// Heuristic: nanocores and bytes are summed as if they shared a unit, so the
/// value is a ranking aid rather than a utilization measure. Zero usage
/// scores 0.
pub fn compute_efficiency_score(summary: &SummaryMetric) -> u8 {
    let combined = summary.cpu_usage + summary.memory_usage;
    if combined <= 0.0 || !combined.is_finite() {
        return 0;
    }

    (summary.cpu_usage / combined * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Efficiency view models, one per series
pub fn to_efficiency_metrics(response: &MetricResponse) -> Vec<EfficiencyMetric> {
    response
        .series
        .iter()
        .map(|series| {
            let summary = to_summary_metric(series);
            let combined = summary.cpu_usage + summary.memory_usage;
            let (cpu_share, memory_share) = if combined > 0.0 {
                (
                    summary.cpu_usage / combined * 100.0,
                    summary.memory_usage / combined * 100.0,
                )
            } else {
                (0.0, 0.0)
            };

            EfficiencyMetric {
                efficiency_score: compute_efficiency_score(&summary),
                id: summary.id,
                name: summary.name,
                cpu_share,
                memory_share,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CpuMemoryUsage, MetricPoint, NetworkUsage, StorageUsage};

    fn point(time: &str, cpu: f64, memory: f64) -> MetricPoint {
        MetricPoint {
            time: time.to_string(),
            cpu_memory: Some(CpuMemoryUsage {
                cpu_usage_nano_cores: Some(cpu),
                memory_usage_bytes: Some(memory),
            }),
            ..Default::default()
        }
    }

    fn series(key: &str, points: Vec<MetricPoint>) -> MetricSeries {
        MetricSeries {
            key: key.to_string(),
            name: None,
            points,
        }
    }

    #[test]
    fn test_summary_of_empty_series() {
        let summary = to_summary_metric(&series("node-a", vec![]));

        assert_eq!(summary.id, "node-a");
        assert_eq!(summary.name, "node-a");
        assert_eq!(summary.cpu_usage, 0.0);
        assert_eq!(summary.memory_usage, 0.0);
        assert!(summary.storage_usage.is_none());
        assert!(summary.network_usage.is_none());
        assert!(summary.cost.is_none());
    }

    #[test]
    fn test_summary_reads_last_point_only() {
        let mut last = point("t2", 300.0, 700.0);
        last.storage = Some(StorageUsage {
            used_bytes: Some(10.0),
            capacity_bytes: Some(100.0),
        });
        last.network = Some(NetworkUsage {
            rx_bytes: Some(5.0),
            tx_bytes: Some(6.0),
        });
        last.cost = Some(CostBreakdown {
            total_cost_usd: Some(2.5),
            ..Default::default()
        });

        let mut s = series("pod-1", vec![point("t1", 1000.0, 1000.0), last]);
        s.name = Some("api".to_string());
        let summary = to_summary_metric(&s);

        assert_eq!(summary.name, "api");
        assert_eq!(summary.cpu_usage, 300.0);
        assert_eq!(summary.memory_usage, 700.0);
        assert_eq!(summary.storage_usage, Some(10.0));
        assert_eq!(summary.network_usage, Some(11.0));
        assert_eq!(summary.cost, Some(2.5));
    }

    #[test]
    fn test_trend_uses_first_series_only() {
        let mut first = MetricPoint {
            time: "t1".to_string(),
            ..Default::default()
        };
        first.cost = Some(CostBreakdown {
            total_cost_usd: Some(5.0),
            ..Default::default()
        });

        let response = MetricResponse {
            series: vec![
                series("a", vec![first]),
                series("b", vec![point("t1", 1.0, 1.0), point("t2", 1.0, 1.0)]),
            ],
            ..Default::default()
        };

        let trend = to_trend_metrics(&response);
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].timestamp, "t1");
        assert_eq!(trend[0].cost.total, 5.0);
        assert_eq!(trend[0].cost.cpu, 0.0);
        assert_eq!(trend[0].cpu_usage, 0.0);
    }

    #[test]
    fn test_trend_of_empty_response() {
        assert!(to_trend_metrics(&MetricResponse::default()).is_empty());
    }

    #[test]
    fn test_efficiency_score_zero_usage() {
        let summary = SummaryMetric::default();
        assert_eq!(compute_efficiency_score(&summary), 0);
    }

    #[test]
    fn test_efficiency_score_ratio() {
        let summary = SummaryMetric {
            cpu_usage: 1.0,
            memory_usage: 3.0,
            ..Default::default()
        };
        assert_eq!(compute_efficiency_score(&summary), 25);

        let cpu_only = SummaryMetric {
            cpu_usage: 42.0,
            ..Default::default()
        };
        assert_eq!(compute_efficiency_score(&cpu_only), 100);
    }

    #[test]
    fn test_efficiency_metrics_per_series() {
        let response = MetricResponse {
            series: vec![
                series("ns-a", vec![point("t1", 2.0, 2.0)]),
                series("ns-b", vec![]),
            ],
            ..Default::default()
        };

        let metrics = to_efficiency_metrics(&response);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].efficiency_score, 50);
        assert_eq!(metrics[0].cpu_share, 50.0);
        assert_eq!(metrics[0].memory_share, 50.0);
        assert_eq!(metrics[1].efficiency_score, 0);
        assert_eq!(metrics[1].cpu_share, 0.0);
    }
}
