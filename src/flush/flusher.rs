use super::writer::{OutputWriter, render_snapshot};
use crate::core::Result;
use crate::storage::OrderStore;
use log::warn;
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// Counters for one flush tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// The output directory was missing and nothing was attempted.
    pub skipped: bool,
    pub orders_scanned: usize,
    pub orders_written: usize,
    pub items_flushed: usize,
    /// Orders with ready items that could not be written this tick.
    pub orders_deferred: usize,
}

/// Scan-detect-emit-prune over one store.
#[derive(Debug, Clone)]
pub struct Flusher {
    store: Arc<OrderStore>,
    writer: OutputWriter,
}

impl Flusher {
    pub fn new(store: Arc<OrderStore>, writer: OutputWriter) -> Self {
        Self { store, writer }
    }

    /// Run one tick.
    ///
    /// Items are removed from the store only after their rows were appended,
    /// so an order whose file is busy keeps its items for the next tick.
    ///
    /// Rows are rendered from a copy taken before the append. A fragment that
    /// updates an already-ready item while its row is being written is lost
    /// when the item is removed; flushed item numbers are not expected to be
    /// ingested again.
    pub fn flush_once(&self) -> Result<FlushReport> {
        let span = info_span!("flush.tick", dir = %self.writer.output_dir().display());
        let _enter = span.enter();

        let mut report = FlushReport::default();
        if !self.writer.dir_exists() {
            event!(Level::DEBUG, "output directory missing, tick skipped");
            report.skipped = true;
            return Ok(report);
        }

        for order in self.store.snapshot()? {
            report.orders_scanned += 1;
            let Some(snapshot) = order.ready_snapshot()? else {
                continue;
            };

            let path = self.writer.path_for(order.key());
            if let Err(err) = self.writer.ensure_header(&path) {
                warn!("cannot create output for order {}: {}", order.key(), err);
                report.orders_deferred += 1;
                continue;
            }

            let lines = render_snapshot(&snapshot);
            if !self.writer.append_if_available(&path, &lines) {
                report.orders_deferred += 1;
                continue;
            }

            let removed =
                order.remove_items(snapshot.lines.iter().map(|line| line.item_key.as_str()))?;
            report.orders_written += 1;
            report.items_flushed += removed;
            event!(
                Level::DEBUG,
                order = %order.key(),
                items = removed,
                "order items flushed"
            );
        }

        Ok(report)
    }
}
