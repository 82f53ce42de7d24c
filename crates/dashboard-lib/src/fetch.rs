//! Request/cache primitive used by every dashboard view
//!
//! A [`FetchHook`] belongs to one view. It refetches when its key or
//! dependency list changes, and applies a result only if no newer request has
//! been issued since. Results of superseded requests are dropped silently.
//! There is no retry, no expiry and no cancellation of in-flight requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::observability::{DashboardMetrics, StructuredLogger};

/// Boxed future returned by a producer
pub type ProducerFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'static>>;

type Producer<T> = Arc<dyn Fn() -> ProducerFuture<T> + Send + Sync>;

/// Options controlling when a hook fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// When false, `sync` never issues a request
    pub enabled: bool,
    /// Extra values that trigger a refetch when they change
    pub deps: Vec<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            deps: Vec::new(),
        }
    }
}

/// Snapshot of a hook's data, error and loading flag
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
    token: u64,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            token: 0,
        }
    }
}

impl<T> FetchState<T> {
    /// Token of the most recently issued request (0 before the first one)
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// One view's subscription to a keyed backend query.
///
/// Must be driven from within a Tokio runtime.
pub struct FetchHook<T> {
    options: FetchOptions,
    key: Option<String>,
    synced_deps: Option<Vec<String>>,
    producer: Option<Producer<T>>,
    state: Arc<watch::Sender<FetchState<T>>>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl<T> FetchHook<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(options: FetchOptions) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            options,
            key: None,
            synced_deps: None,
            producer: None,
            state: Arc::new(state),
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("fetch_hook"),
        }
    }

    /// Render-time call: remember the latest producer and fetch if the key or
    /// dependencies changed since the last sync.
    ///
    /// Returns true when a request was issued.
    pub fn sync<F, Fut>(&mut self, key: impl Into<String>, producer: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let key = key.into();
        self.producer = Some(Arc::new(move || Box::pin(producer()) as ProducerFuture<T>));

        if !self.options.enabled {
            return false;
        }

        let changed = self.key.as_deref() != Some(key.as_str())
            || self.synced_deps.as_ref() != Some(&self.options.deps);
        if !changed {
            return false;
        }

        self.key = Some(key);
        self.synced_deps = Some(self.options.deps.clone());
        self.issue()
    }

    /// Replace the dependency list; takes effect on the next `sync`
    pub fn set_deps(&mut self, deps: Vec<String>) {
        self.options.deps = deps;
    }

    /// Enable or disable automatic fetching on `sync`
    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
    }

    /// Re-run the last producer. Only the newest outstanding request's result
    /// is applied.
    pub fn refetch(&self) -> bool {
        self.issue()
    }

    /// Current snapshot
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    /// Wait until the latest request has resolved
    pub async fn settled(&self) -> FetchState<T> {
        let mut rx = self.state.subscribe();
        let settled = rx.wait_for(|s| !s.is_loading).await.map(|s| (*s).clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    fn issue(&self) -> bool {
        let Some(producer) = self.producer.clone() else {
            return false;
        };
        let key = self.key.clone().unwrap_or_default();

        let mut token = 0;
        self.state.send_modify(|s| {
            s.token += 1;
            s.is_loading = true;
            token = s.token;
        });
        self.metrics.inc_fetches_issued();

        let state = Arc::clone(&self.state);
        let metrics = self.metrics.clone();
        let logger = self.logger.clone();
        let request = producer();

        tokio::spawn(async move {
            let started = Instant::now();
            let result = request.await;
            metrics.observe_fetch_latency(started.elapsed().as_secs_f64());

            let failed = result.is_err();
            let applied = state.send_if_modified(move |s| {
                if s.token != token {
                    return false;
                }
                match result {
                    Ok(data) => {
                        s.data = Some(data);
                        s.error = None;
                    }
                    Err(err) => s.error = Some(err),
                }
                s.is_loading = false;
                true
            });

            if !applied {
                metrics.inc_fetches_discarded();
                let latest = state.borrow().token;
                logger.log_fetch_discarded(&key, token, latest);
            } else if failed {
                metrics.inc_fetch_errors();
            }
        });

        true
    }
}
