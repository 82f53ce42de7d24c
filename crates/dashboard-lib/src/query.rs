//! Query parameters and cache keys for metric requests

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::granularity::Granularity;

/// Filters and paging for metric and inventory queries.
///
/// Every field is optional. Absent fields are omitted both from the query
/// string and from cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl QueryParams {
    /// Query string pairs for a GET request. The metric list is comma-joined.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((name, value));
            }
        };

        push("start", self.start.clone());
        push("end", self.end.clone());
        push("granularity", self.granularity.map(|g| g.to_string()));
        push("namespace", self.namespace.clone());
        push("team", self.team.clone());
        push("service", self.service.clone());
        push("env", self.env.clone());
        push(
            "metric",
            (!self.metric.is_empty()).then(|| self.metric.join(",")),
        );
        push("limit", self.limit.map(|v| v.to_string()));
        push("offset", self.offset.map(|v| v.to_string()));
        push("sort", self.sort.clone());

        pairs
    }
}

/// Build the cache key for `(resource, series, params)`.
///
/// Object keys are sorted before encoding, so two parameter sets with the
/// same values always share a key.
pub fn build_key(resource: &str, series: &str, params: Option<&QueryParams>) -> String {
    let params = params
        .and_then(|p| serde_json::to_value(p).ok())
        .unwrap_or_else(|| Value::Object(Map::new()));

    let key = json!({
        "scope": "metrics",
        "resource": resource,
        "series": series,
        "params": params,
    });

    canonicalize(key).to_string()
}

/// Rebuild every object with its keys in lexicographic order
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_params_produce_equal_keys() {
        let a = QueryParams {
            start: Some("2024-01-01".to_string()),
            namespace: Some("prod".to_string()),
            ..Default::default()
        };
        let mut b = QueryParams::default();
        b.namespace = Some("prod".to_string());
        b.start = Some("2024-01-01".to_string());

        assert_eq!(
            build_key("namespaces", "raw/efficiency", Some(&a)),
            build_key("namespaces", "raw/efficiency", Some(&b))
        );
    }

    #[test]
    fn test_absent_fields_are_not_encoded() {
        let params = QueryParams {
            team: Some("payments".to_string()),
            ..Default::default()
        };
        let key = build_key("pods", "cost", Some(&params));

        assert!(key.contains("\"team\":\"payments\""));
        for absent in ["start", "end", "granularity", "namespace", "metric", "limit", "sort"] {
            assert!(
                !key.contains(&format!("\"{}\"", absent)),
                "{} should be omitted from {}",
                absent,
                key
            );
        }
    }

    #[test]
    fn test_falsy_defined_values_are_kept() {
        let params = QueryParams {
            offset: Some(0),
            sort: Some(String::new()),
            ..Default::default()
        };
        let key = build_key("pods", "raw", Some(&params));

        assert!(key.contains("\"offset\":0"));
        assert!(key.contains("\"sort\":\"\""));
    }

    #[test]
    fn test_key_layout_is_sorted() {
        let key = build_key("nodes", "raw", None);
        assert_eq!(
            key,
            r#"{"params":{},"resource":"nodes","scope":"metrics","series":"raw"}"#
        );
    }

    #[test]
    fn test_different_series_produce_different_keys() {
        assert_ne!(
            build_key("nodes", "raw", None),
            build_key("nodes", "cost", None)
        );
    }

    #[test]
    fn test_query_pairs() {
        let params = QueryParams {
            start: Some("2024-01-01T00:00:00".to_string()),
            granularity: Some(Granularity::Hour),
            metric: vec!["cpu".to_string(), "memory".to_string()],
            limit: Some(50),
            ..Default::default()
        };

        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("start", "2024-01-01T00:00:00".to_string()),
                ("granularity", "hour".to_string()),
                ("metric", "cpu,memory".to_string()),
                ("limit", "50".to_string()),
            ]
        );
    }
}
