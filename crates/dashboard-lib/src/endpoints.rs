//! Endpoint families exposed by the backend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Entity kind a metric query is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricTarget {
    Cluster,
    Nodes,
    Pods,
    Containers,
    Namespaces,
    Deployments,
}

impl MetricTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricTarget::Cluster => "cluster",
            MetricTarget::Nodes => "nodes",
            MetricTarget::Pods => "pods",
            MetricTarget::Containers => "containers",
            MetricTarget::Namespaces => "namespaces",
            MetricTarget::Deployments => "deployments",
        }
    }

    /// The cluster endpoint has no per-entity variant
    pub fn accepts_id(&self) -> bool {
        !matches!(self, MetricTarget::Cluster)
    }
}

impl fmt::Display for MetricTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cluster" => Ok(MetricTarget::Cluster),
            "node" | "nodes" => Ok(MetricTarget::Nodes),
            "pod" | "pods" => Ok(MetricTarget::Pods),
            "container" | "containers" => Ok(MetricTarget::Containers),
            "namespace" | "namespaces" => Ok(MetricTarget::Namespaces),
            "deployment" | "deployments" => Ok(MetricTarget::Deployments),
            other => Err(format!("unknown metric target: {}", other)),
        }
    }
}

/// Which series of a target to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricView {
    Raw,
    RawSummary,
    RawEfficiency,
    Cost,
    CostSummary,
    CostTrend,
}

impl MetricView {
    /// Path segments under the target, e.g. `["raw", "summary"]`
    pub fn segments(&self) -> &'static [&'static str] {
        match self {
            MetricView::Raw => &["raw"],
            MetricView::RawSummary => &["raw", "summary"],
            MetricView::RawEfficiency => &["raw", "efficiency"],
            MetricView::Cost => &["cost"],
            MetricView::CostSummary => &["cost", "summary"],
            MetricView::CostTrend => &["cost", "trend"],
        }
    }

    /// Series name used in cache keys, e.g. `raw/summary`
    pub fn series_name(&self) -> String {
        self.segments().join("/")
    }
}

/// Whether inventory comes from the backend's store or the live cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventorySource {
    #[default]
    Store,
    Live,
}

impl InventorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventorySource::Store => "store",
            InventorySource::Live => "live",
        }
    }
}

/// Kubernetes resource kinds listed by the inventory endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    Nodes,
    Pods,
    Containers,
    Deployments,
    Namespaces,
    Services,
    Ingresses,
    Jobs,
    CronJobs,
    DaemonSets,
    StatefulSets,
    PersistentVolumes,
    PersistentVolumeClaims,
    ResourceQuotas,
    Hpas,
}

impl InventoryKind {
    pub const ALL: [InventoryKind; 15] = [
        InventoryKind::Nodes,
        InventoryKind::Pods,
        InventoryKind::Containers,
        InventoryKind::Deployments,
        InventoryKind::Namespaces,
        InventoryKind::Services,
        InventoryKind::Ingresses,
        InventoryKind::Jobs,
        InventoryKind::CronJobs,
        InventoryKind::DaemonSets,
        InventoryKind::StatefulSets,
        InventoryKind::PersistentVolumes,
        InventoryKind::PersistentVolumeClaims,
        InventoryKind::ResourceQuotas,
        InventoryKind::Hpas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryKind::Nodes => "nodes",
            InventoryKind::Pods => "pods",
            InventoryKind::Containers => "containers",
            InventoryKind::Deployments => "deployments",
            InventoryKind::Namespaces => "namespaces",
            InventoryKind::Services => "services",
            InventoryKind::Ingresses => "ingresses",
            InventoryKind::Jobs => "jobs",
            InventoryKind::CronJobs => "cronjobs",
            InventoryKind::DaemonSets => "daemonsets",
            InventoryKind::StatefulSets => "statefulsets",
            InventoryKind::PersistentVolumes => "persistentvolumes",
            InventoryKind::PersistentVolumeClaims => "persistentvolumeclaims",
            InventoryKind::ResourceQuotas => "resourcequotas",
            InventoryKind::Hpas => "hpas",
        }
    }

    /// Cluster-scoped kinds have no namespace column
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            InventoryKind::Nodes | InventoryKind::Namespaces | InventoryKind::PersistentVolumes
        )
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace(['-', '_'], "");
        InventoryKind::ALL
            .iter()
            .copied()
            .find(|kind| {
                let name = kind.as_str();
                name == wanted || name == format!("{}s", wanted) || name == format!("{}es", wanted)
            })
            .ok_or_else(|| format!("unknown inventory kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_target_parsing() {
        assert_eq!("Node".parse::<MetricTarget>(), Ok(MetricTarget::Nodes));
        assert_eq!("cluster".parse::<MetricTarget>(), Ok(MetricTarget::Cluster));
        assert!("widgets".parse::<MetricTarget>().is_err());
        assert!(!MetricTarget::Cluster.accepts_id());
        assert!(MetricTarget::Pods.accepts_id());
    }

    #[test]
    fn test_metric_view_segments() {
        assert_eq!(MetricView::RawEfficiency.series_name(), "raw/efficiency");
        assert_eq!(MetricView::Cost.segments(), &["cost"]);
    }

    #[test]
    fn test_inventory_kind_parsing() {
        assert_eq!("pods".parse::<InventoryKind>(), Ok(InventoryKind::Pods));
        assert_eq!("pod".parse::<InventoryKind>(), Ok(InventoryKind::Pods));
        assert_eq!(
            "persistent-volume-claims".parse::<InventoryKind>(),
            Ok(InventoryKind::PersistentVolumeClaims)
        );
        assert_eq!("cronjob".parse::<InventoryKind>(), Ok(InventoryKind::CronJobs));
        assert_eq!("hpa".parse::<InventoryKind>(), Ok(InventoryKind::Hpas));
        assert_eq!("ingress".parse::<InventoryKind>(), Ok(InventoryKind::Ingresses));
        assert!("secrets".parse::<InventoryKind>().is_err());
        assert!(!InventoryKind::Nodes.is_namespaced());
    }
}
