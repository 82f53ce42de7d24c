//! Backend settings, unit prices, alert rules and LLM configuration

use anyhow::{bail, Result};
use colored::Colorize;
use dashboard_lib::{ApiClient, AppStore, UnitPrices};
use serde_json::{Map, Value};

use crate::commands::{require_payload, require_success};
use crate::output::{format_currency, print_header, print_json, print_success, OutputFormat};

/// Show dashboard settings and remember timezone/language locally
pub async fn show_settings(client: &ApiClient, store: &AppStore, format: OutputFormat) -> Result<()> {
    let settings = require_payload(client.settings().await)?;

    if let Some(timezone) = &settings.timezone {
        store.set_timezone(timezone.clone());
    }
    if let Some(language) = &settings.language {
        store.set_language(language.clone());
    }

    match format {
        OutputFormat::Json => print_json(&settings),
        OutputFormat::Table => {
            print_header("Settings");
            println!("Timezone:          {}", display(settings.timezone.as_deref()));
            println!("Language:          {}", display(settings.language.as_deref()));
            println!(
                "Scrape Interval:   {}",
                settings
                    .scrape_interval_secs
                    .map(|s| format!("{}s", s))
                    .unwrap_or_else(|| "-".to_string())
            );
            print_extra(&settings.extra);
        }
    }

    Ok(())
}

/// Show unit prices used for cost calculation
pub async fn show_unit_prices(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let prices = require_payload(client.unit_prices().await)?;

    match format {
        OutputFormat::Json => print_json(&prices),
        OutputFormat::Table => {
            print_header("Unit Prices (USD)");
            println!("CPU (core-hour):     {}", format_currency(prices.cpu_core_hour).green());
            println!("Memory (GB-hour):    {}", format_currency(prices.memory_gb_hour).green());
            println!("Storage (GB-hour):   {}", format_currency(prices.storage_gb_hour).green());
            println!("Network (GB):        {}", format_currency(prices.network_gb).green());
            print_extra(&prices.extra);
        }
    }

    Ok(())
}

/// Update selected unit prices, keeping the others as the backend has them
pub async fn set_unit_prices(
    client: &ApiClient,
    update: UnitPrices,
    format: OutputFormat,
) -> Result<()> {
    if update.cpu_core_hour.is_none()
        && update.memory_gb_hour.is_none()
        && update.storage_gb_hour.is_none()
        && update.network_gb.is_none()
    {
        bail!("Nothing to update: pass at least one price");
    }

    let current = require_payload(client.unit_prices().await)?;
    let merged = merge_prices(current, update);
    require_success(client.upsert_unit_prices(&merged).await)?;

    match format {
        OutputFormat::Json => print_json(&merged),
        OutputFormat::Table => print_success("Unit prices updated"),
    }

    Ok(())
}

/// Show alert rule configuration
pub async fn show_alert_rules(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let rules = require_payload(client.alert_rules().await)?;

    match format {
        OutputFormat::Json => print_json(&rules),
        OutputFormat::Table => {
            print_header("Alert Rules");
            println!(
                "Enabled:           {}",
                match rules.enabled {
                    Some(true) => "yes".green().to_string(),
                    Some(false) => "no".red().to_string(),
                    None => "-".to_string(),
                }
            );
            println!("Rules:             {}", rules.rules.len());
            for rule in &rules.rules {
                println!("  - {}", rule);
            }
            print_extra(&rules.extra);
        }
    }

    Ok(())
}

/// Show LLM assistant configuration
pub async fn show_llm(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let llm = require_payload(client.llm_config().await)?;

    match format {
        OutputFormat::Json => print_json(&llm),
        OutputFormat::Table => {
            print_header("LLM Configuration");
            println!("Provider:          {}", display(llm.provider.as_deref()));
            println!("Model:             {}", display(llm.model.as_deref()));
            println!("Base URL:          {}", display(llm.base_url.as_deref()));
            print_extra(&llm.extra);
        }
    }

    Ok(())
}

fn merge_prices(current: UnitPrices, update: UnitPrices) -> UnitPrices {
    UnitPrices {
        cpu_core_hour: update.cpu_core_hour.or(current.cpu_core_hour),
        memory_gb_hour: update.memory_gb_hour.or(current.memory_gb_hour),
        storage_gb_hour: update.storage_gb_hour.or(current.storage_gb_hour),
        network_gb: update.network_gb.or(current.network_gb),
        extra: current.extra,
    }
}

fn display(value: Option<&str>) -> String {
    value
        .map(|v| v.cyan().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_extra(extra: &Map<String, Value>) {
    if extra.is_empty() {
        return;
    }

    println!();
    println!("{}", "Other".bold());
    println!("{}", "-".repeat(50));
    for (key, value) in extra {
        println!("{:<19}{}", format!("{}:", key), value);
    }
}
