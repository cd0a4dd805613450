use crate::config::OrderBookConfig;
use crate::core::{FieldBag, Result};
use crate::flush::{FlushWorker, Flusher, OutputWriter};
use crate::storage::{ApplyOutcome, DiscardReason, OrderStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Level, event};

/// Accumulates order fragments and writes completed items to disk.
///
/// Ingestion is synchronous and safe from any number of threads or tasks.
/// Writing happens on a background worker owned by the book.
///
/// # Examples
///
/// ```no_run
/// use collate_orders::{FieldBag, OrderBook, OrderBookConfig};
///
/// # async fn run() -> collate_orders::Result<()> {
/// let book = OrderBook::start(OrderBookConfig::new("out").flush_interval_ms(1_000))?;
/// book.ingest(
///     &FieldBag::new()
///         .with("order reference", "A1")
///         .with("marketplace", "M")
///         .with("name", "Jo"),
/// );
/// book.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct OrderBook {
    store: Arc<OrderStore>,
    worker: FlushWorker,
    config: OrderBookConfig,
}

impl OrderBook {
    /// Validate the configuration and start the flush worker on the current
    /// tokio runtime. Fails when called outside a runtime.
    pub fn start(config: OrderBookConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(OrderStore::new());
        let flusher = Flusher::new(Arc::clone(&store), OutputWriter::new(&config.output_dir));
        let worker = FlushWorker::spawn(flusher, config.flush_interval())?;

        Ok(Self {
            store,
            worker,
            config,
        })
    }

    pub fn config(&self) -> &OrderBookConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<OrderStore> {
        &self.store
    }

    /// Merge one fragment. Never fails: unusable fragments are dropped and
    /// reported through the outcome.
    pub fn ingest(&self, bag: &FieldBag) -> ApplyOutcome {
        match self.store.apply(bag) {
            Ok(outcome) => outcome,
            Err(err) => {
                event!(Level::ERROR, error = %err, "field-bag dropped");
                ApplyOutcome::Discarded(DiscardReason::StoreUnavailable)
            }
        }
    }

    /// Merge one JSON element of an input batch.
    pub fn ingest_json(&self, value: Value) -> ApplyOutcome {
        match FieldBag::from_json(value) {
            Ok(bag) => self.ingest(&bag),
            Err(_) => ApplyOutcome::Discarded(DiscardReason::NotAnObject),
        }
    }

    /// Merge a batch of fragments, returning how many were merged.
    pub fn ingest_all<'a>(&self, bags: impl IntoIterator<Item = &'a FieldBag>) -> usize {
        bags.into_iter()
            .filter(|bag| self.ingest(bag).is_merged())
            .count()
    }

    /// Ask the flush worker to stop. Returns immediately.
    pub fn cancel_writing(&self) {
        self.worker.cancel();
    }

    /// True once the flush worker has exited after cancellation.
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Cancel the worker and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.worker.stop().await
    }
}
