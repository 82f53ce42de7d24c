//! System status, readiness and maintenance commands

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use dashboard_lib::{ApiClient, AppStore, GateConfig, GatePhase, ReadinessGate};
use tabled::Tabled;

use crate::commands::{require_payload, require_success};
use crate::output::{
    color_status, format_time, format_timestamp, print_header, print_info, print_json,
    print_popup, print_success, print_table, print_warning, OutputFormat,
};

#[derive(Tabled, serde::Serialize)]
struct LogFileRow {
    #[tabled(rename = "File")]
    file: String,
}

/// Show the backend's discovery status
pub async fn show_status(client: &ApiClient, store: &AppStore, format: OutputFormat) -> Result<()> {
    let status = require_payload(client.system_status().await)?;
    let timezone = store.timezone();

    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Table => {
            print_header("System Status");
            let state = if status.resync_running {
                color_status("running")
            } else if status.is_settled() {
                color_status("settled")
            } else {
                color_status("warning")
            };
            println!("State:             {}", state);
            println!(
                "Last Discovered:   {}",
                status
                    .discovered_at()
                    .map(|ts| format_timestamp(ts, timezone.as_deref()))
                    .unwrap_or_else(|| "never".dimmed().to_string())
            );
            if let Some(at) = &status.last_error_at {
                println!(
                    "Last Error At:     {}",
                    format_timestamp(at, timezone.as_deref()).red()
                );
            }
            if let Some(message) = &status.last_error_message {
                println!("Last Error:        {}", message.red());
            }
            println!(
                "Last Resync:       {}",
                store
                    .last_resync_time()
                    .map(|t| format_time(t, timezone.as_deref()))
                    .unwrap_or_else(|| "unknown".dimmed().to_string())
            );
        }
    }

    Ok(())
}

/// Block until cluster discovery is complete, printing each popup change
pub async fn wait_ready(
    client: &ApiClient,
    store: &AppStore,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut config = GateConfig::default();
    if force {
        config.freshness_window = chrono::Duration::zero();
    }

    let gate = ReadinessGate::new(Arc::new(client.clone()), Arc::new(store.clone()), config);
    let mut handle = gate.start();
    let mut views = handle.subscribe();

    let mut last_popup = None;
    let view = loop {
        let view = views.borrow_and_update().clone();
        if format == OutputFormat::Table && view.popup != last_popup {
            if let Some(popup) = &view.popup {
                print_popup(popup);
            }
            last_popup = view.popup.clone();
        }
        if view.phase == GatePhase::Ready {
            break view;
        }
        if views.changed().await.is_err() {
            break handle.wait_ready().await;
        }
    };

    match format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Table => {
            if view.phase != GatePhase::Ready {
                print_warning("Readiness gate stopped before discovery completed");
            } else if view.attempts == 0 {
                print_info("Last resync is recent, skipping discovery check");
            } else {
                print_success(&format!(
                    "Cluster discovery complete after {} status checks",
                    view.attempts
                ));
                if view.resync_triggered {
                    print_info("A resync was triggered during this session");
                }
            }
        }
    }

    handle.stop().await;
    Ok(())
}

/// Ask the backend to rediscover the cluster
pub async fn trigger_resync(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = require_success(client.trigger_resync().await)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => print_success("Resync requested"),
    }

    Ok(())
}

/// Ask the backend to write a backup
pub async fn trigger_backup(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = require_success(client.trigger_backup().await)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => print_success("Backup requested"),
    }

    Ok(())
}

/// List backend log files
pub async fn list_logs(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let logs = require_payload(client.log_files().await)?;

    let rows: Vec<LogFileRow> = logs
        .files
        .into_iter()
        .map(|file| LogFileRow { file })
        .collect();

    if format == OutputFormat::Table {
        print_header("Log Files");
    }
    print_table(&rows, format);

    Ok(())
}
