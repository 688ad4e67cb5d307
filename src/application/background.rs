//! Detached background work that must outlive the request that triggered it.
//!
//! Submitted work runs on its own tokio task under its own timeout. The submitter
//! never waits for it and never sees its errors; failures are logged and counted.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{Instrument, debug, info_span, warn};

use crate::application::repos::RepoError;
use crate::cache::CacheError;

pub(crate) const METRIC_TASK_FAILED_TOTAL: &str = "webook_background_task_failed_total";
pub(crate) const METRIC_TASK_TIMEOUT_TOTAL: &str = "webook_background_task_timeout_total";
pub(crate) const METRIC_TASK_DROPPED_TOTAL: &str = "webook_background_task_dropped_total";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_CONCURRENCY: usize = 256;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    /// Deadline applied to each task, independent of the submitting request.
    pub timeout: Duration,
    /// Maximum tasks in flight; submissions beyond it are dropped.
    pub concurrency: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl From<&crate::config::ArticlesSettings> for BackgroundConfig {
    fn from(settings: &crate::config::ArticlesSettings) -> Self {
        Self {
            timeout: settings.background_timeout,
            concurrency: settings.background_concurrency.get(),
        }
    }
}

#[derive(Clone)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

struct Inner {
    timeout: Duration,
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl BackgroundTasks {
    pub fn new(config: BackgroundConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                timeout: config.timeout,
                permits: Arc::new(Semaphore::new(config.concurrency)),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Run `work` in the background. Returns immediately.
    pub fn submit<F>(&self, task: &'static str, work: F)
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            warn!(task, "no async runtime available; dropping background task");
            counter!(METRIC_TASK_DROPPED_TOTAL, "task" => task).increment(1);
            return;
        };
        let Ok(permit) = self.inner.permits.clone().try_acquire_owned() else {
            warn!(task, "background capacity exhausted; dropping task");
            counter!(METRIC_TASK_DROPPED_TOTAL, "task" => task).increment(1);
            return;
        };

        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        };
        let timeout = self.inner.timeout;

        handle.spawn(
            async move {
                let _guard = guard;
                match tokio::time::timeout(timeout, work).await {
                    Ok(Ok(())) => debug!("background task finished"),
                    Ok(Err(err)) => {
                        warn!(error = %err, "background task failed");
                        counter!(METRIC_TASK_FAILED_TOTAL, "task" => task).increment(1);
                    }
                    Err(_) => {
                        warn!(
                            timeout_ms = timeout.as_millis() as u64,
                            "background task timed out"
                        );
                        counter!(METRIC_TASK_TIMEOUT_TOTAL, "task" => task).increment(1);
                    }
                }
            }
            .instrument(info_span!("background", task)),
        );
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve once no submitted task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new(BackgroundConfig::default())
    }
}

/// Decrements the in-flight count on completion, timeout or panic.
struct InFlight {
    inner: Arc<Inner>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
