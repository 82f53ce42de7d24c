//! Kubernetes inventory listing

use anyhow::Result;
use colored::Colorize;
use dashboard_lib::{ApiClient, AppStore, InventoryItem, InventoryKind, InventorySource};
use tabled::Tabled;

use crate::commands::require_payload;
use crate::output::{format_timestamp, print_json, print_warning, OutputFormat};

#[derive(Tabled)]
struct InventoryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl InventoryRow {
    fn new(item: &InventoryItem, timezone: Option<&str>) -> Self {
        Self {
            name: item.name().unwrap_or("-").to_string(),
            namespace: item.namespace().unwrap_or("-").to_string(),
            created: item
                .created_at()
                .map(|ts| format_timestamp(&ts, timezone))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Row for cluster-scoped kinds, which have no namespace
#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<InventoryRow> for ClusterRow {
    fn from(row: InventoryRow) -> Self {
        Self {
            name: row.name,
            created: row.created,
        }
    }
}

/// List one kind of Kubernetes object, from the backend store or the live cluster
pub async fn list(
    client: &ApiClient,
    store: &AppStore,
    kind: InventoryKind,
    live: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let source = if live {
        InventorySource::Live
    } else {
        InventorySource::Store
    };
    let page = require_payload(client.inventory(kind, source, limit, offset).await)?;

    match format {
        OutputFormat::Json => print_json(&page),
        OutputFormat::Table => {
            println!(
                "{} {}",
                kind.to_string().bold(),
                format!("({})", source.as_str()).dimmed()
            );
            println!("{}", "=".repeat(50));

            if page.items.is_empty() {
                print_warning(&format!("No {} found", kind));
                return Ok(());
            }

            let timezone = store.timezone();
            let rows: Vec<InventoryRow> = page
                .items
                .iter()
                .map(|item| InventoryRow::new(item, timezone.as_deref()))
                .collect();
            let table = if kind.is_namespaced() {
                tabled::Table::new(rows)
            } else {
                tabled::Table::new(rows.into_iter().map(ClusterRow::from))
            }
            .with(tabled::settings::Style::rounded())
            .to_string();
            println!("{}", table);

            let shown = page.items.len() as u64;
            match page.total {
                Some(total) => println!(
                    "\nShowing {}-{} of {}",
                    page.offset.unwrap_or(0) + 1,
                    page.offset.unwrap_or(0) + shown,
                    total
                ),
                None => println!("\nTotal: {} {}", shown, kind),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_store_record_without_metadata() {
        let item: InventoryItem = serde_json::from_str(
            r#"{"container_name": "api", "namespace": "shop", "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let row = InventoryRow::new(&item, None);
        assert_eq!(row.name, "api");
        assert_eq!(row.namespace, "shop");
        assert_eq!(row.created, "2024-01-01 00:00");

        let row = InventoryRow::new(&item, Some("America/Los_Angeles"));
        assert_eq!(row.created, "2023-12-31 16:00");
    }

    #[test]
    fn test_row_defaults_missing_fields() {
        let item: InventoryItem = serde_json::from_str("{}").unwrap();
        let row = InventoryRow::new(&item, Some("Europe/Berlin"));
        assert_eq!(row.name, "-");
        assert_eq!(row.namespace, "-");
        assert_eq!(row.created, "-");
    }
}
