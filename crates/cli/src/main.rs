//! Cost Dashboard CLI
//!
//! A terminal dashboard for Kubernetes usage and cost metrics: system
//! readiness, metric pages, inventory, alerts and backend settings.

mod commands;
mod config;
mod output;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::metrics::{MetricQuery, Page};
use commands::{alerts, info, inventory, metrics, system};
use dashboard_lib::client::DEFAULT_TIMEOUT;
use dashboard_lib::{ApiClient, AppStore, DashboardMetrics, InventoryKind, UnitPrices};
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Cost Dashboard CLI
#[derive(Parser)]
#[command(name = "costdash")]
#[command(author, version, about = "Terminal dashboard for Kubernetes cost observability", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via COSTDASH_API_URL env var)
    #[arg(long, env = "COSTDASH_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show backend discovery status
    Status,

    /// Wait until cluster discovery has completed
    Ready {
        /// Check even if the last resync is recent
        #[arg(long)]
        force: bool,
    },

    /// Trigger a cluster resync
    Resync,

    /// Trigger a backend backup
    Backup,

    /// List backend log files
    Logs,

    /// Usage and cost metrics
    #[command(subcommand)]
    Metrics(MetricsCommands),

    /// List Kubernetes objects
    Inventory {
        /// Object kind (nodes, pods, deployments, services, ...)
        kind: InventoryKind,

        /// Query the live cluster instead of the backend store
        #[arg(long)]
        live: bool,

        /// Maximum number of objects
        #[arg(long)]
        limit: Option<u64>,

        /// Number of objects to skip
        #[arg(long)]
        offset: Option<u64>,
    },

    /// Active alerts
    #[command(subcommand)]
    Alerts(AlertsCommands),

    /// Backend configuration
    #[command(subcommand)]
    Info(InfoCommands),
}

#[derive(Subcommand)]
pub enum MetricsCommands {
    /// Latest usage and cost per entity
    Summary(MetricQuery),

    /// Cost over time
    Trend(MetricQuery),

    /// Efficiency score per entity
    Efficiency(MetricQuery),
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// List active alerts
    List,

    /// Resolve an alert
    Resolve {
        /// Alert ID
        id: String,
    },

    /// Poll for new alerts until interrupted
    Watch {
        /// Seconds between polls
        #[arg(long, default_value = "30")]
        interval: u64,
    },
}

#[derive(Subcommand)]
pub enum InfoCommands {
    /// Show dashboard settings
    Settings,

    /// Show unit prices
    UnitPrices,

    /// Show alert rules
    AlertRules,

    /// Show LLM configuration
    Llm,

    /// Update unit prices
    SetUnitPrices {
        /// USD per CPU core-hour
        #[arg(long)]
        cpu_core_hour: Option<f64>,

        /// USD per GB-hour of memory
        #[arg(long)]
        memory_gb_hour: Option<f64>,

        /// USD per GB-hour of storage
        #[arg(long)]
        storage_gb_hour: Option<f64>,

        /// USD per GB of network traffic
        #[arg(long)]
        network_gb: Option<f64>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stderr)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn open_store() -> AppStore {
    let opened = config::state_path().and_then(|path| {
        AppStore::open(&path).with_context(|| format!("Failed to open {}", path.display()))
    });

    match opened {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Falling back to an in-memory store");
            AppStore::in_memory()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = config::Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable configuration");
        config::Config::default()
    });

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli
        .format
        .or_else(|| output::OutputFormat::from_config(config.default_format.as_deref()))
        .unwrap_or_default();
    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);
    let default_namespace = config.default_namespace.as_deref();

    // Initialize client
    let client = ApiClient::with_timeout(&api_url, timeout)
        .with_context(|| format!("Invalid API URL: {}", api_url))?;
    let store = open_store();

    // Execute command
    let result = match cli.command {
        Commands::Status => system::show_status(&client, &store, format).await,
        Commands::Ready { force } => system::wait_ready(&client, &store, force, format).await,
        Commands::Resync => system::trigger_resync(&client, format).await,
        Commands::Backup => system::trigger_backup(&client, format).await,
        Commands::Logs => system::list_logs(&client, format).await,
        Commands::Metrics(metrics_cmd) => {
            let (page, query) = match metrics_cmd {
                MetricsCommands::Summary(query) => (Page::Summary, query),
                MetricsCommands::Trend(query) => (Page::Trend, query),
                MetricsCommands::Efficiency(query) => (Page::Efficiency, query),
            };
            metrics::show(&client, &store, page, &query, default_namespace, format).await
        }
        Commands::Inventory {
            kind,
            live,
            limit,
            offset,
        } => inventory::list(&client, &store, kind, live, limit, offset, format).await,
        Commands::Alerts(alerts_cmd) => match alerts_cmd {
            AlertsCommands::List => alerts::list(&client, &store, format).await,
            AlertsCommands::Resolve { id } => alerts::resolve(&client, &id, format).await,
            AlertsCommands::Watch { interval } => {
                alerts::watch(&client, Duration::from_secs(interval), format).await
            }
        },
        Commands::Info(info_cmd) => match info_cmd {
            InfoCommands::Settings => info::show_settings(&client, &store, format).await,
            InfoCommands::UnitPrices => info::show_unit_prices(&client, format).await,
            InfoCommands::AlertRules => info::show_alert_rules(&client, format).await,
            InfoCommands::Llm => info::show_llm(&client, format).await,
            InfoCommands::SetUnitPrices {
                cpu_core_hour,
                memory_gb_hour,
                storage_gb_hour,
                network_gb,
            } => {
                let update = UnitPrices {
                    cpu_core_hour,
                    memory_gb_hour,
                    storage_gb_hour,
                    network_gb,
                    ..Default::default()
                };
                info::set_unit_prices(&client, update, format).await
            }
        },
    };

    if cli.print_metrics {
        println!("{}", DashboardMetrics::new().render());
    }

    result
}
