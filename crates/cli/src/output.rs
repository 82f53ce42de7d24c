//! Output formatting utilities

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;
use colored::Colorize;
use dashboard_lib::Popup;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_config(value: Option<&str>) -> Option<Self> {
        value.and_then(|v| Self::from_str(v, true).ok())
    }
}

/// Print rows as a table, or as JSON when requested
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a section header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print the readiness popup
pub fn print_popup(popup: &Popup) {
    match popup {
        Popup::InProgress => print_info(&popup.message()),
        Popup::Error(_) => print_error(&popup.message()),
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: Option<f64>) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let Some(bytes) = bytes else {
        return "-".to_string();
    };

    if bytes >= GB {
        format!("{:.2}Gi", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes / KB)
    } else {
        format!("{:.0}B", bytes)
    }
}

/// Format nanocores as cores or millicores
pub fn format_cpu(nano_cores: Option<f64>) -> String {
    let Some(nano_cores) = nano_cores else {
        return "-".to_string();
    };

    let millicores = nano_cores / 1_000_000.0;
    if millicores >= 1000.0 {
        format!("{:.2}", millicores / 1000.0)
    } else {
        format!("{:.0}m", millicores)
    }
}

/// Format a USD amount
pub fn format_currency(amount: Option<f64>) -> String {
    match amount {
        Some(amount) => format!("${:.2}", amount),
        None => "-".to_string(),
    }
}

/// Format a 0..=100 share as a percentage
pub fn format_share(share: f64) -> String {
    format!("{:.0}%", share)
}

/// Format an RFC 3339 timestamp in `timezone`, otherwise return it as-is
pub fn format_timestamp(ts: &str, timezone: Option<&str>) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => format_time(dt.with_timezone(&Utc), timezone),
        Err(_) => ts.to_string(),
    }
}

/// Format a UTC instant in an IANA timezone such as `Asia/Seoul`.
///
/// A missing or unknown zone name renders UTC.
pub fn format_time(at: DateTime<Utc>, timezone: Option<&str>) -> String {
    match timezone.and_then(|name| name.parse::<Tz>().ok()) {
        Some(tz) => at.with_timezone(&tz).format(TIME_FORMAT).to_string(),
        None => at.format(TIME_FORMAT).to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "ready" | "settled" | "resolved" | "ok" => status.green().to_string(),
        "running" | "in progress" | "warning" => status.yellow().to_string(),
        "critical" | "error" | "failed" => status.red().to_string(),
        "info" => status.blue().to_string(),
        _ => status.to_string(),
    }
}

/// Color an efficiency score
pub fn color_score(score: u8) -> String {
    let formatted = score.to_string();
    if score >= 70 {
        formatted.green().to_string()
    } else if score >= 40 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(None), "-");
        assert_eq!(format_bytes(Some(512.0)), "512B");
        assert_eq!(format_bytes(Some(2048.0)), "2.00Ki");
        assert_eq!(format_bytes(Some(3.0 * 1024.0 * 1024.0 * 1024.0)), "3.00Gi");
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(None), "-");
        assert_eq!(format_cpu(Some(250_000_000.0)), "250m");
        assert_eq!(format_cpu(Some(1_500_000_000.0)), "1.50");
    }

    #[test]
    fn test_format_currency_and_share() {
        assert_eq!(format_currency(Some(1.5)), "$1.50");
        assert_eq!(format_currency(None), "-");
        assert_eq!(format_share(25.4), "25%");
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config(Some("json")), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_config(Some("TABLE")), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_config(Some("yaml")), None);
        assert_eq!(OutputFormat::from_config(None), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-01-01T10:30:00Z", None), "2024-01-01 10:30");
        assert_eq!(format_timestamp("yesterday", None), "yesterday");
        assert_eq!(
            format_timestamp("2024-01-01T12:30:00+02:00", None),
            "2024-01-01 10:30"
        );
    }

    #[test]
    fn test_format_timestamp_in_stored_timezone() {
        assert_eq!(
            format_timestamp("2024-01-01T10:30:00Z", Some("Asia/Seoul")),
            "2024-01-01 19:30"
        );
        // summer time applies
        assert_eq!(
            format_timestamp("2024-07-01T10:30:00Z", Some("Europe/Berlin")),
            "2024-07-01 12:30"
        );
        assert_eq!(
            format_timestamp("2024-01-01T10:30:00Z", Some("Mars/Olympus")),
            "2024-01-01 10:30"
        );
    }

    #[test]
    fn test_format_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 15, 0).unwrap();
        assert_eq!(format_time(at, None), "2024-03-01 23:15");
        assert_eq!(format_time(at, Some("America/New_York")), "2024-03-01 18:15");
    }
}
