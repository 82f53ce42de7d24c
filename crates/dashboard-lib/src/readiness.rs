//! Startup readiness gate
//!
//! Polls system status until the backend's cluster discovery has completed,
//! triggering at most one resync per session when discovery never ran. The
//! gate only activates when the last recorded resync is missing or older
//! than the freshness window.
//!
//! Polls are re-scheduled after each response, so a slow response delays the
//! next poll instead of overlapping it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::envelope::{failure_message, ApiResponse};
use crate::error::Result;
use crate::granularity::parse_timestamp;
use crate::models::SystemStatus;
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::store::AppStore;

/// Delay between the end of one status poll and the start of the next
pub const POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// A resync newer than this keeps the gate inactive
pub const FRESHNESS_WINDOW_HOURS: i64 = 3;

/// Backend calls the gate depends on
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn system_status(&self) -> Result<ApiResponse<SystemStatus>>;
    async fn trigger_resync(&self) -> Result<ApiResponse<Value>>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn system_status(&self) -> Result<ApiResponse<SystemStatus>> {
        ApiClient::system_status(self).await
    }

    async fn trigger_resync(&self) -> Result<ApiResponse<Value>> {
        ApiClient::trigger_resync(self).await
    }
}

/// Where the time of the last completed resync is kept
pub trait ResyncStore: Send + Sync {
    fn last_resync_time(&self) -> Option<DateTime<Utc>>;
    fn record_resync(&self, at: DateTime<Utc>);
}

impl ResyncStore for AppStore {
    fn last_resync_time(&self) -> Option<DateTime<Utc>> {
        AppStore::last_resync_time(self)
    }

    fn record_resync(&self, at: DateTime<Utc>) {
        self.set_last_resync_time(at);
    }
}

/// Gate timing
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub poll_interval: Duration,
    pub freshness_window: chrono::Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            freshness_window: chrono::Duration::hours(FRESHNESS_WINDOW_HOURS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePhase {
    /// Not started
    Idle,
    /// Waiting for discovery to complete
    Polling,
    /// Discovery complete or recent enough; the app may proceed
    Ready,
}

/// Overlay shown on top of the polling state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Popup {
    InProgress,
    Error(String),
}

impl Popup {
    pub fn message(&self) -> String {
        match self {
            Popup::InProgress => "Cluster discovery is in progress".to_string(),
            Popup::Error(detail) => format!("Failed to fetch system status: {}", detail),
        }
    }
}

/// What the gate currently shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateView {
    pub phase: GatePhase,
    pub popup: Option<Popup>,
    pub status: Option<SystemStatus>,
    pub resync_triggered: bool,
    pub attempts: u64,
}

impl Default for GateView {
    fn default() -> Self {
        Self {
            phase: GatePhase::Idle,
            popup: None,
            status: None,
            resync_triggered: false,
            attempts: 0,
        }
    }
}

/// Whether the gate must run, given the last recorded resync
pub fn is_gate_needed(
    last_resync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    freshness_window: chrono::Duration,
) -> bool {
    match last_resync {
        None => true,
        Some(at) => now - at > freshness_window,
    }
}

/// Classified result of one status poll
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Failed(String),
    InProgress(SystemStatus),
    Settled(SystemStatus),
}

impl PollOutcome {
    pub fn classify(result: &Result<ApiResponse<SystemStatus>>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(err) => return PollOutcome::Failed(err.to_string()),
        };

        if let Some(message) = failure_message(None, Some(response)) {
            return PollOutcome::Failed(message);
        }

        match response.payload() {
            None => PollOutcome::Failed("status response had no data".to_string()),
            Some(status) if status.is_settled() => PollOutcome::Settled(status.clone()),
            Some(status) => PollOutcome::InProgress(status.clone()),
        }
    }
}

/// The readiness gate state machine
pub struct ReadinessGate {
    source: Arc<dyn StatusSource>,
    store: Arc<dyn ResyncStore>,
    config: GateConfig,
    view: watch::Sender<GateView>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl ReadinessGate {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn ResyncStore>,
        config: GateConfig,
    ) -> Self {
        let (view, _) = watch::channel(GateView::default());
        Self {
            source,
            store,
            config,
            view,
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("readiness_gate"),
        }
    }

    pub fn is_needed(&self, now: DateTime<Utc>) -> bool {
        is_gate_needed(
            self.store.last_resync_time(),
            now,
            self.config.freshness_window,
        )
    }

    pub fn view(&self) -> GateView {
        self.view.borrow().clone()
    }

    /// Spawn the polling task. When the last resync is still fresh, no task
    /// is spawned and the handle reports `Ready` immediately.
    pub fn start(self) -> GateHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let view_rx = self.view.subscribe();

        if !self.is_needed(Utc::now()) {
            if let Some(last) = self.store.last_resync_time() {
                self.logger.log_gate_skipped(&last.to_rfc3339());
            }
            self.view.send_modify(|v| v.phase = GatePhase::Ready);
            return GateHandle {
                shutdown: shutdown_tx,
                view: view_rx,
                task: None,
            };
        }

        let task = tokio::spawn(self.run(shutdown_rx));
        GateHandle {
            shutdown: shutdown_tx,
            view: view_rx,
            task: Some(task),
        }
    }

    /// Poll until ready or until shutdown is signalled
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let last = self.store.last_resync_time().map(|t| t.to_rfc3339());
        self.logger.log_gate_started(last.as_deref());

        loop {
            // an in-flight poll is never cancelled; its result is still applied
            if self.poll_once().await == GatePhase::Ready {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.recv() => {
                    debug!("Readiness gate stopped before discovery completed");
                    break;
                }
            }
        }
    }

    /// Run one poll and apply its outcome
    pub async fn poll_once(&mut self) -> GatePhase {
        self.metrics.inc_status_polls();
        let result = self.source.system_status().await;
        let attempts = self.view.borrow().attempts + 1;

        let outcome = PollOutcome::classify(&result);
        match outcome {
            PollOutcome::Failed(message) => {
                self.metrics.inc_status_poll_errors();
                self.logger.log_status_poll_failed(attempts, &message);
                self.view.send_modify(|v| {
                    v.attempts = attempts;
                    v.phase = GatePhase::Polling;
                    v.popup = Some(Popup::Error(message));
                });
                GatePhase::Polling
            }
            PollOutcome::InProgress(status) => {
                let needs_resync =
                    status.discovered_at().is_none() && !self.view.borrow().resync_triggered;

                self.view.send_modify(|v| {
                    v.attempts = attempts;
                    v.phase = GatePhase::Polling;
                    v.popup = Some(Popup::InProgress);
                    v.status = Some(status);
                    if needs_resync {
                        v.resync_triggered = true;
                    }
                });

                if needs_resync {
                    self.trigger_resync().await;
                }
                GatePhase::Polling
            }
            PollOutcome::Settled(status) => {
                let discovered = status.discovered_at().unwrap_or_default().to_string();
                let at = parse_timestamp(&discovered).unwrap_or_else(|| {
                    warn!(
                        last_discovered_at = %discovered,
                        "Unparseable discovery timestamp, recording current time"
                    );
                    Utc::now()
                });
                self.store.record_resync(at);
                self.logger.log_gate_ready(&discovered, attempts);

                self.view.send_modify(|v| {
                    v.attempts = attempts;
                    v.phase = GatePhase::Ready;
                    v.popup = None;
                    v.status = Some(status);
                });
                GatePhase::Ready
            }
        }
    }

    async fn trigger_resync(&self) {
        self.metrics.inc_resync_triggers();
        let result = self.source.trigger_resync().await;

        let error = match &result {
            Ok(response) => failure_message(None, Some(response)),
            Err(err) => Some(err.to_string()),
        };
        self.logger
            .log_resync_triggered(error.is_none(), error.as_deref());
    }
}

/// Handle to a running gate. Dropping it stops polling after the current
/// poll completes.
pub struct GateHandle {
    shutdown: broadcast::Sender<()>,
    view: watch::Receiver<GateView>,
    task: Option<JoinHandle<()>>,
}

impl GateHandle {
    pub fn view(&self) -> GateView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateView> {
        self.view.clone()
    }

    /// Wait until the gate reports `Ready`. If the gate stops first, the
    /// last view is returned.
    pub async fn wait_ready(&mut self) -> GateView {
        let ready = self
            .view
            .wait_for(|v| v.phase == GatePhase::Ready)
            .await
            .map(|v| (*v).clone());
        match ready {
            Ok(view) => view,
            Err(_) => self.view(),
        }
    }

    /// Signal the polling task to stop and wait for it to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(());
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Readiness gate task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted status source; repeats the last response once the script runs out
    struct FakeSource {
        script: Mutex<VecDeque<Result<ApiResponse<SystemStatus>>>>,
        polls: AtomicU32,
        resyncs: AtomicU32,
    }

    impl FakeSource {
        fn new(script: Vec<Result<ApiResponse<SystemStatus>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                polls: AtomicU32::new(0),
                resyncs: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn system_status(&self) -> Result<ApiResponse<SystemStatus>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }

        async fn trigger_resync(&self) -> Result<ApiResponse<Value>> {
            self.resyncs.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse::success(Value::Null))
        }
    }

    fn status(discovered: Option<&str>, running: bool) -> Result<ApiResponse<SystemStatus>> {
        Ok(ApiResponse::success(SystemStatus {
            last_discovered_at: discovered.map(str::to_string),
            resync_running: running,
            ..Default::default()
        }))
    }

    fn gate(source: Arc<FakeSource>, store: &AppStore) -> ReadinessGate {
        ReadinessGate::new(source, Arc::new(store.clone()), GateConfig::default())
    }

    #[test]
    fn test_gate_needed_only_when_stale() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let window = chrono::Duration::hours(FRESHNESS_WINDOW_HOURS);

        assert!(is_gate_needed(None, now, window));
        assert!(!is_gate_needed(Some(now - chrono::Duration::hours(1)), now, window));
        assert!(is_gate_needed(Some(now - chrono::Duration::hours(4)), now, window));
    }

    #[test]
    fn test_classify_poll_outcomes() {
        let transport: Result<ApiResponse<SystemStatus>> =
            Err(ApiError::Transport("timeout".to_string()));
        assert!(matches!(
            PollOutcome::classify(&transport),
            PollOutcome::Failed(msg) if msg.contains("timeout")
        ));

        let app_failure: Result<ApiResponse<SystemStatus>> =
            Ok(ApiResponse::failure(None, "k8s api unreachable"));
        assert_eq!(
            PollOutcome::classify(&app_failure),
            PollOutcome::Failed("k8s api unreachable".to_string())
        );

        assert!(matches!(
            PollOutcome::classify(&status(None, false)),
            PollOutcome::InProgress(_)
        ));
        assert!(matches!(
            PollOutcome::classify(&status(Some("2024-01-01T00:00:00Z"), true)),
            PollOutcome::InProgress(_)
        ));
        assert!(matches!(
            PollOutcome::classify(&status(Some("2024-01-01T00:00:00Z"), false)),
            PollOutcome::Settled(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_resync_once_then_records_discovery() {
        let source = FakeSource::new(vec![
            status(None, false),
            status(Some("2024-01-01T00:00:00Z"), false),
        ]);
        let store = AppStore::in_memory();

        let mut handle = gate(source.clone(), &store).start();
        let view = handle.wait_ready().await;

        assert_eq!(view.phase, GatePhase::Ready);
        assert!(view.popup.is_none());
        assert!(view.resync_triggered);
        assert_eq!(view.attempts, 2);
        assert_eq!(source.resyncs.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.last_resync_time(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_triggered_at_most_once_per_session() {
        let source = FakeSource::new(vec![
            status(None, false),
            status(None, true),
            status(None, false),
            status(Some("2024-02-01T08:00:00Z"), false),
        ]);
        let store = AppStore::in_memory();

        let mut handle = gate(source.clone(), &store).start();
        handle.wait_ready().await;

        assert_eq!(source.polls.load(Ordering::SeqCst), 4);
        assert_eq!(source.resyncs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_discovery_time_keeps_polling_and_triggers_resync() {
        let source = FakeSource::new(vec![
            status(Some(""), false),
            status(Some("2024-03-01T06:00:00Z"), false),
        ]);
        let store = AppStore::in_memory();
        let mut gate = gate(source.clone(), &store);

        assert_eq!(gate.poll_once().await, GatePhase::Polling);
        assert_eq!(gate.view().popup, Some(Popup::InProgress));
        assert!(gate.view().resync_triggered);
        assert_eq!(source.resyncs.load(Ordering::SeqCst), 1);
        assert!(store.last_resync_time().is_none());

        assert_eq!(gate.poll_once().await, GatePhase::Ready);
        assert_eq!(
            store.last_resync_time(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_error_popup_keeps_previous_status() {
        let source = FakeSource::new(vec![
            status(Some("2024-01-01T00:00:00Z"), true),
            Err(ApiError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            status(Some("2024-01-01T00:00:00Z"), false),
        ]);
        let store = AppStore::in_memory();
        let mut gate = gate(source.clone(), &store);

        assert_eq!(gate.poll_once().await, GatePhase::Polling);
        assert_eq!(gate.view().popup, Some(Popup::InProgress));
        // discovery already ran, so no resync is needed
        assert_eq!(source.resyncs.load(Ordering::SeqCst), 0);

        assert_eq!(gate.poll_once().await, GatePhase::Polling);
        let view = gate.view();
        assert!(matches!(view.popup, Some(Popup::Error(ref m)) if m.contains("bad gateway")));
        assert!(view.status.as_ref().unwrap().resync_running);

        assert_eq!(gate.poll_once().await, GatePhase::Ready);
        assert!(gate.view().popup.is_none());
    }

    #[tokio::test]
    async fn test_fresh_resync_skips_polling() {
        let source = FakeSource::new(vec![status(None, false)]);
        let store = AppStore::in_memory();
        store.set_last_resync_time(Utc::now() - chrono::Duration::minutes(30));

        let mut handle = gate(source.clone(), &store).start();
        let view = handle.wait_ready().await;

        assert_eq!(view.phase, GatePhase::Ready);
        assert_eq!(source.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_poll() {
        let source = FakeSource::new(vec![status(Some("2024-01-01T00:00:00Z"), true)]);
        let store = AppStore::in_memory();

        let handle = gate(source.clone(), &store).start();
        tokio::time::sleep(Duration::from_millis(12_000)).await;
        let polls = source.polls.load(Ordering::SeqCst);
        assert_eq!(polls, 3);
        assert_eq!(handle.view().phase, GatePhase::Polling);

        handle.stop().await;
        tokio::time::sleep(Duration::from_millis(20_000)).await;
        assert_eq!(source.polls.load(Ordering::SeqCst), polls);
        assert!(store.last_resync_time().is_none());
    }
}
