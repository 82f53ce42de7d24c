//! Active alerts and the notification refresh loop

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use dashboard_lib::{failure_message, ActiveAlert, ApiClient, AppStore};
use tabled::Tabled;
use tracing::warn;

use crate::commands::{require_payload, require_success};
use crate::output::{
    color_status, format_timestamp, print_header, print_json, print_success, print_warning,
    OutputFormat,
};

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Since")]
    since: String,
}

impl AlertRow {
    fn new(alert: &ActiveAlert, timezone: Option<&str>) -> Self {
        Self {
            id: alert.id.clone(),
            severity: alert
                .severity
                .as_deref()
                .map(color_status)
                .unwrap_or_else(|| "-".to_string()),
            message: alert.message.clone(),
            since: alert
                .created_at
                .as_deref()
                .map(|ts| format_timestamp(ts, timezone))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// List alerts that are currently firing
pub async fn list(client: &ApiClient, store: &AppStore, format: OutputFormat) -> Result<()> {
    let alerts: Vec<ActiveAlert> = require_payload(client.active_alerts().await)?
        .into_iter()
        .filter(|a| !a.resolved)
        .collect();

    match format {
        OutputFormat::Json => print_json(&alerts),
        OutputFormat::Table => {
            print_header("Active Alerts");
            print_alerts(&alerts, store.timezone().as_deref());
        }
    }

    Ok(())
}

/// Mark an alert as resolved
pub async fn resolve(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let result = require_success(client.resolve_alert(id).await)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => print_success(&format!("Alert {} resolved", id)),
    }

    Ok(())
}

/// Poll active alerts on an interval, announcing alerts that were not seen before
pub async fn watch(client: &ApiClient, interval: Duration, format: OutputFormat) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        let result = client.active_alerts().await;
        let (transport, response) = match result {
            Ok(response) => (None, Some(response)),
            Err(e) => (Some(e), None),
        };

        if let Some(message) = failure_message(transport.as_ref(), response.as_ref()) {
            warn!(error = %message, "Failed to refresh alerts");
        } else if let Some(alerts) = response.as_ref().and_then(|r| r.payload()) {
            let fresh = new_alerts(&mut seen, alerts);
            match format {
                OutputFormat::Json => {
                    if !fresh.is_empty() {
                        print_json(&fresh);
                    }
                }
                OutputFormat::Table => {
                    for alert in &fresh {
                        println!(
                            "{} {} {}",
                            "🔔".bold(),
                            alert
                                .severity
                                .as_deref()
                                .map(color_status)
                                .unwrap_or_default(),
                            alert.message
                        );
                    }
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Unresolved alerts not in `seen`; records them as seen.
/// Alerts that stopped firing are forgotten so they announce again if they return.
fn new_alerts<'a>(seen: &mut HashSet<String>, alerts: &'a [ActiveAlert]) -> Vec<&'a ActiveAlert> {
    let active: Vec<&ActiveAlert> = alerts.iter().filter(|a| !a.resolved).collect();
    seen.retain(|id| active.iter().any(|a| &a.id == id));

    active
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect()
}

fn print_alerts(alerts: &[ActiveAlert], timezone: Option<&str>) {
    if alerts.is_empty() {
        print_warning("No active alerts");
        return;
    }

    let rows: Vec<AlertRow> = alerts
        .iter()
        .map(|alert| AlertRow::new(alert, timezone))
        .collect();
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!("\nTotal: {} alerts", alerts.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: &str, resolved: bool) -> ActiveAlert {
        ActiveAlert {
            id: id.to_string(),
            severity: Some("warning".to_string()),
            message: format!("alert {}", id),
            created_at: None,
            resolved,
        }
    }

    #[test]
    fn test_new_alerts_announces_each_alert_once() {
        let mut seen = HashSet::new();
        let batch = vec![alert("a", false), alert("b", false)];

        let first: Vec<_> = new_alerts(&mut seen, &batch).iter().map(|a| a.id.clone()).collect();
        assert_eq!(first, vec!["a", "b"]);
        assert!(new_alerts(&mut seen, &batch).is_empty());
    }

    #[test]
    fn test_new_alerts_skips_resolved_and_forgets_cleared() {
        let mut seen = HashSet::new();
        new_alerts(&mut seen, &[alert("a", false), alert("b", true)]);
        assert!(seen.contains("a"));
        assert!(!seen.contains("b"));

        new_alerts(&mut seen, &[]);
        assert!(seen.is_empty());

        let returning = [alert("a", false)];
        let again = new_alerts(&mut seen, &returning);
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn test_alert_row_uses_store_timezone() {
        let store = AppStore::in_memory();
        store.set_timezone("Asia/Tokyo");

        let mut firing = alert("a", false);
        firing.created_at = Some("2024-02-01T15:00:00Z".to_string());

        let row = AlertRow::new(&firing, store.timezone().as_deref());
        assert_eq!(row.since, "2024-02-02 00:00");
        assert_eq!(AlertRow::new(&alert("b", false), None).since, "-");
    }
}
