use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinSet;

/// Spawner for work detached from the request that scheduled it.
///
/// Tasks run on the ambient tokio runtime. Their errors and panics are logged
/// here and never reach the caller. Finished tasks are reaped on every spawn;
/// [`BackgroundTasks::drain`] waits for whatever is still running at shutdown.
#[derive(Clone, Default)]
pub(crate) struct BackgroundTasks {
    inner: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut set = self.lock();
        reap_finished(&mut set);
        set.spawn(async move {
            if let Err(err) = task.await {
                tracing::error!(task = name, error = %format!("{err:#}"), "Background task failed");
            }
        });
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        let mut set = self.lock();
        reap_finished(&mut set);
        set.len()
    }

    /// Waits up to `timeout` for pending tasks. Returns how many were abandoned.
    pub(crate) async fn drain(&self, timeout: Duration) -> usize {
        let mut set = std::mem::take(&mut *self.lock());
        let total = set.len();
        if total == 0 {
            return 0;
        }

        tracing::info!(pending = total, "Draining background tasks");

        let joined = tokio::time::timeout(timeout, async {
            while let Some(result) = set.join_next().await {
                log_join_error(result);
            }
        })
        .await;

        if joined.is_ok() {
            return 0;
        }

        let abandoned = set.len();
        tracing::warn!(abandoned, "Background tasks still running after drain timeout");
        set.abort_all();
        abandoned
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn reap_finished(set: &mut JoinSet<()>) {
    while let Some(result) = set.try_join_next() {
        log_join_error(result);
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        if err.is_panic() {
            tracing::error!(error = %err, "Background task panicked");
        }
    }
}
