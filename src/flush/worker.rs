use super::flusher::Flusher;
use crate::core::{CollateError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

/// Longest uninterrupted sleep between cancellation checks.
pub const SLEEP_SLICE: Duration = Duration::from_secs(1);

/// Background task running [`Flusher::flush_once`] on a fixed period.
///
/// Ticks never overlap: a tick, including its file I/O, completes before
/// the next sleep starts. Cancellation is cooperative and only observed
/// between ticks.
pub struct FlushWorker {
    cancel: CancellationToken,
    finished: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

impl FlushWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// Fails with [`CollateError::Worker`] when called outside a runtime.
    pub fn spawn(flusher: Flusher, period: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| {
            CollateError::Worker(format!("flush worker needs a tokio runtime: {err}"))
        })?;
        let cancel = CancellationToken::new();
        let finished = Arc::new(AtomicBool::new(false));

        let join_handle = runtime.spawn(run_flush_loop(
            Arc::new(flusher),
            period,
            cancel.clone(),
            Arc::clone(&finished),
        ));

        Ok(Self {
            cancel,
            finished,
            join_handle: Some(join_handle),
        })
    }

    /// Request the loop to stop at the next opportunity. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Signals the worker to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| CollateError::Worker(format!("flush worker join: {err}")))?;
        }
        Ok(())
    }
}

impl Drop for FlushWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_flush_loop(
    flusher: Arc<Flusher>,
    period: Duration,
    cancel: CancellationToken,
    finished: Arc<AtomicBool>,
) {
    event!(Level::INFO, period_ms = period.as_millis() as u64, "flush worker started");
    let mut elapsed = Duration::ZERO;

    while !cancel.is_cancelled() {
        if !sleep_cancellable(next_sleep(period, elapsed), &cancel).await {
            break;
        }

        let started = Instant::now();
        let tick = Arc::clone(&flusher);
        match tokio::task::spawn_blocking(move || tick.flush_once()).await {
            Ok(Ok(report)) => event!(
                Level::DEBUG,
                skipped = report.skipped,
                scanned = report.orders_scanned,
                written = report.orders_written,
                items = report.items_flushed,
                deferred = report.orders_deferred,
                "flush tick complete"
            ),
            Ok(Err(err)) => event!(Level::ERROR, error = %err, "flush tick failed"),
            Err(err) => event!(Level::ERROR, error = %err, "flush tick panicked"),
        }
        elapsed = started.elapsed();
    }

    let was_finished = finished.swap(true, Ordering::AcqRel);
    debug_assert!(!was_finished, "finished flag set twice");
    event!(Level::INFO, "flush worker finished");
}

/// Time to wait before the next tick: the period minus the time the
/// previous tick took, never negative.
pub fn next_sleep(period: Duration, elapsed: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

/// Sleep for `total` in slices of at most [`SLEEP_SLICE`].
///
/// Returns false as soon as cancellation is requested, true when the full
/// duration elapsed.
pub async fn sleep_cancellable(total: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        let slice = (deadline - now).min(SLEEP_SLICE);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = sleep(slice) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::OutputWriter;
    use crate::storage::OrderStore;

    fn idle_flusher() -> Flusher {
        Flusher::new(Arc::new(OrderStore::new()), OutputWriter::new("missing-output-dir"))
    }

    #[test]
    fn test_next_sleep_subtracts_tick_time() {
        let period = Duration::from_millis(1_000);
        assert_eq!(next_sleep(period, Duration::ZERO), period);
        assert_eq!(
            next_sleep(period, Duration::from_millis(300)),
            Duration::from_millis(700)
        );
        assert_eq!(next_sleep(period, period), Duration::ZERO);
        assert_eq!(next_sleep(period, Duration::from_secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_spawn_outside_runtime_is_an_error() {
        let result = FlushWorker::spawn(idle_flusher(), Duration::from_millis(10));
        assert!(matches!(result, Err(CollateError::Worker(_))));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_observable() {
        let worker = FlushWorker::spawn(idle_flusher(), Duration::from_millis(10)).unwrap();
        assert!(!worker.is_cancelled());

        worker.cancel();
        worker.cancel();
        assert!(worker.is_cancelled());

        worker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_sleep_runs_to_completion() {
        let cancel = CancellationToken::new();
        let started = Instant::now();
        assert!(sleep_cancellable(Duration::from_millis(30), &cancel).await);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_zero_sleep_returns_immediately() {
        let cancel = CancellationToken::new();
        assert!(sleep_cancellable(Duration::ZERO, &cancel).await);
    }

    #[tokio::test]
    async fn test_sleep_observes_pending_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!sleep_cancellable(Duration::from_secs(60), &cancel).await);
    }

    #[tokio::test]
    async fn test_sleep_aborts_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        assert!(!sleep_cancellable(Duration::from_secs(60), &cancel).await);
        assert!(started.elapsed() < SLEEP_SLICE);
    }
}
