//! Metric views: summary, trend and efficiency

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use dashboard_lib::{
    build_key, extract_payload, failure_message, to_efficiency_metrics, to_summary_metric,
    to_trend_metrics, with_auto_granularity, ApiClient, ApiResponse, AppStore, FetchHook,
    FetchOptions, FetchState, Granularity, MetricResponse, MetricTarget, MetricView, QueryParams,
};
use tabled::Tabled;
use tracing::debug;

use crate::output::{
    color_score, format_bytes, format_cpu, format_currency, format_share, format_time,
    format_timestamp, print_error, print_header, print_json, print_warning, OutputFormat,
};

/// Which page of the metrics dashboard to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Summary,
    Trend,
    Efficiency,
}

impl Page {
    fn view(&self) -> MetricView {
        match self {
            Page::Summary => MetricView::RawSummary,
            Page::Trend => MetricView::CostTrend,
            Page::Efficiency => MetricView::RawEfficiency,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Page::Summary => "Usage Summary",
            Page::Trend => "Cost Trend",
            Page::Efficiency => "Efficiency",
        }
    }
}

/// Target and filters shared by every metric page
#[derive(Debug, Clone, Args)]
pub struct MetricQuery {
    /// Entity kind (cluster, nodes, pods, containers, namespaces, deployments)
    pub target: MetricTarget,

    /// Restrict to a single entity
    #[arg(long)]
    pub id: Option<String>,

    /// Range start (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// Range end (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Bucket size (minute, hour, day); picked from the range when omitted
    #[arg(long)]
    pub granularity: Option<Granularity>,

    /// Filter by namespace
    #[arg(long, short)]
    pub namespace: Option<String>,

    /// Filter by team label
    #[arg(long)]
    pub team: Option<String>,

    /// Filter by service label
    #[arg(long)]
    pub service: Option<String>,

    /// Filter by environment label
    #[arg(long)]
    pub env: Option<String>,

    /// Maximum number of series
    #[arg(long)]
    pub limit: Option<u64>,

    /// Number of series to skip
    #[arg(long)]
    pub offset: Option<u64>,

    /// Sort order understood by the backend
    #[arg(long)]
    pub sort: Option<String>,

    /// Refetch every SECS seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,
}

impl MetricQuery {
    /// Query parameters, with the configured namespace as fallback
    pub fn to_params(&self, default_namespace: Option<&str>) -> QueryParams {
        QueryParams {
            start: self.start.clone(),
            end: self.end.clone(),
            granularity: self.granularity,
            namespace: self
                .namespace
                .clone()
                .or_else(|| default_namespace.map(str::to_string)),
            team: self.team.clone(),
            service: self.service.clone(),
            env: self.env.clone(),
            metric: Vec::new(),
            limit: self.limit,
            offset: self.offset,
            sort: self.sort.clone(),
        }
    }

    fn resource(&self) -> String {
        match self.id.as_deref().filter(|_| self.target.accepts_id()) {
            Some(id) => format!("{}/{}", self.target, id),
            None => self.target.to_string(),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Storage")]
    storage: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Cost")]
    cost: String,
}

#[derive(Tabled)]
struct TrendRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "CPU $")]
    cpu_cost: String,
    #[tabled(rename = "Memory $")]
    memory_cost: String,
    #[tabled(rename = "Storage $")]
    storage_cost: String,
    #[tabled(rename = "Network $")]
    network_cost: String,
    #[tabled(rename = "Total")]
    total: String,
}

#[derive(Tabled)]
struct EfficiencyRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "CPU Share")]
    cpu_share: String,
    #[tabled(rename = "Memory Share")]
    memory_share: String,
}

/// Display preferences that change how a page renders.
///
/// A change between watch ticks refetches the page.
fn display_deps(store: &AppStore) -> Vec<String> {
    vec![
        store.timezone().unwrap_or_default(),
        store.language().unwrap_or_default(),
    ]
}

/// Fetch and render one metric page, optionally refreshing on an interval
pub async fn show(
    client: &ApiClient,
    store: &AppStore,
    page: Page,
    query: &MetricQuery,
    default_namespace: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let view = page.view();
    let params = with_auto_granularity(&query.to_params(default_namespace), Utc::now());
    let key = build_key(&query.resource(), &view.series_name(), Some(&params));
    debug!(key = %key, "Fetching metric page");

    let mut hook: FetchHook<ApiResponse<MetricResponse>> = FetchHook::new(FetchOptions {
        deps: display_deps(store),
        ..Default::default()
    });
    let producer = {
        let client = client.clone();
        let target = query.target;
        let id = query.id.clone();
        move || {
            let client = client.clone();
            let id = id.clone();
            let params = params.clone();
            async move {
                client
                    .metric_series(target, id.as_deref(), view, &params)
                    .await
            }
        }
    };
    hook.sync(key.clone(), producer.clone());

    let Some(interval) = query.watch.map(Duration::from_secs) else {
        let state = hook.settled().await;
        return render(page, &state, store.timezone().as_deref(), format);
    };

    loop {
        let state = hook.settled().await;
        if format == OutputFormat::Table {
            println!(
                "\n{} {}",
                "Updated".dimmed(),
                format_time(Utc::now(), store.timezone().as_deref()).dimmed()
            );
        }
        if let Err(e) = render(page, &state, store.timezone().as_deref(), format) {
            print_error(&e.to_string());
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        hook.set_deps(display_deps(store));
        if !hook.sync(key.clone(), producer.clone()) {
            hook.refetch();
        }
    }

    Ok(())
}

fn render(
    page: Page,
    state: &FetchState<ApiResponse<MetricResponse>>,
    timezone: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(message) = failure_message(state.error.as_ref(), state.data.as_ref()) {
        bail!(message);
    }

    let Some(response) = extract_payload(state.data.as_ref()) else {
        print_warning("No metric data returned");
        return Ok(());
    };

    if format == OutputFormat::Table {
        print_header(page.title());
        if let Some(granularity) = &response.granularity {
            println!("Granularity: {}", granularity.to_string().cyan());
        }
    }

    match page {
        Page::Summary => render_summary(response, format),
        Page::Trend => render_trend(response, timezone, format),
        Page::Efficiency => render_efficiency(response, format),
    }

    Ok(())
}

fn render_summary(response: &MetricResponse, format: OutputFormat) {
    let summaries: Vec<_> = response.series.iter().map(to_summary_metric).collect();

    match format {
        OutputFormat::Json => print_json(&summaries),
        OutputFormat::Table => {
            let rows: Vec<SummaryRow> = summaries
                .iter()
                .map(|s| SummaryRow {
                    name: s.name.clone(),
                    cpu: format_cpu(Some(s.cpu_usage)),
                    memory: format_bytes(Some(s.memory_usage)),
                    storage: format_bytes(s.storage_usage),
                    network: format_bytes(s.network_usage),
                    cost: format_currency(s.cost),
                })
                .collect();
            print_rows(rows, summaries.len(), "series");
        }
    }
}

fn render_trend(response: &MetricResponse, timezone: Option<&str>, format: OutputFormat) {
    let points = to_trend_metrics(response);

    match format {
        OutputFormat::Json => print_json(&points),
        OutputFormat::Table => {
            let total: f64 = points.iter().map(|p| p.cost.total).sum();
            let rows: Vec<TrendRow> = points
                .iter()
                .map(|p| TrendRow {
                    time: format_timestamp(&p.timestamp, timezone),
                    cpu: format_cpu(Some(p.cpu_usage)),
                    memory: format_bytes(Some(p.memory_usage)),
                    cpu_cost: format_currency(Some(p.cost.cpu)),
                    memory_cost: format_currency(Some(p.cost.memory)),
                    storage_cost: format_currency(Some(p.cost.storage)),
                    network_cost: format_currency(Some(p.cost.network)),
                    total: format_currency(Some(p.cost.total)),
                })
                .collect();
            print_rows(rows, points.len(), "points");
            if !points.is_empty() {
                println!("Total cost: {}", format_currency(Some(total)).green().bold());
            }
        }
    }
}

fn render_efficiency(response: &MetricResponse, format: OutputFormat) {
    let metrics = to_efficiency_metrics(response);

    match format {
        OutputFormat::Json => print_json(&metrics),
        OutputFormat::Table => {
            let rows: Vec<EfficiencyRow> = metrics
                .iter()
                .map(|m| EfficiencyRow {
                    name: m.name.clone(),
                    score: color_score(m.efficiency_score),
                    cpu_share: format_share(m.cpu_share),
                    memory_share: format_share(m.memory_share),
                })
                .collect();
            print_rows(rows, metrics.len(), "series");
        }
    }
}

fn print_rows<T: Tabled>(rows: Vec<T>, count: usize, noun: &str) {
    if rows.is_empty() {
        print_warning(&format!("No {} found", noun));
        return;
    }

    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!("\nTotal: {} {}", count, noun);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(target: MetricTarget) -> MetricQuery {
        MetricQuery {
            target,
            id: None,
            start: None,
            end: None,
            granularity: None,
            namespace: None,
            team: None,
            service: None,
            env: None,
            limit: None,
            offset: None,
            sort: None,
            watch: None,
        }
    }

    #[test]
    fn test_to_params_falls_back_to_default_namespace() {
        let q = query(MetricTarget::Pods);
        assert_eq!(
            q.to_params(Some("payments")).namespace.as_deref(),
            Some("payments")
        );

        let mut q = query(MetricTarget::Pods);
        q.namespace = Some("billing".into());
        assert_eq!(
            q.to_params(Some("payments")).namespace.as_deref(),
            Some("billing")
        );
    }

    #[test]
    fn test_resource_includes_id_when_target_accepts_it() {
        let mut q = query(MetricTarget::Nodes);
        q.id = Some("worker-1".into());
        assert_eq!(q.resource(), "nodes/worker-1");

        let mut q = query(MetricTarget::Cluster);
        q.id = Some("ignored".into());
        assert_eq!(q.resource(), "cluster");
    }

    #[test]
    fn test_render_reports_application_failure() {
        let mut state = FetchState::default();
        state.data = Some(ApiResponse::<MetricResponse>::failure(None, "backend unavailable"));
        let err = render(Page::Summary, &state, None, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[test]
    fn test_display_deps_follow_store_preferences() {
        let store = AppStore::in_memory();
        assert_eq!(display_deps(&store), vec![String::new(), String::new()]);

        store.set_timezone("Asia/Seoul");
        store.set_language("ko");
        assert_eq!(display_deps(&store), vec!["Asia/Seoul", "ko"]);
    }

    #[tokio::test]
    async fn test_timezone_change_triggers_refetch() {
        let store = AppStore::in_memory();
        let mut hook: FetchHook<u8> = FetchHook::new(FetchOptions {
            deps: display_deps(&store),
            ..Default::default()
        });
        let producer = || async { Ok(1u8) };

        assert!(hook.sync("cluster", producer));
        hook.settled().await;
        hook.set_deps(display_deps(&store));
        assert!(!hook.sync("cluster", producer));

        store.set_timezone("Europe/Berlin");
        hook.set_deps(display_deps(&store));
        assert!(hook.sync("cluster", producer));
        assert_eq!(hook.settled().await.token(), 2);
    }
}
