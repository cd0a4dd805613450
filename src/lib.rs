// ============================================================================
// collate-orders library
// ============================================================================

//! Incremental order collation.
//!
//! Order fragments ("field-bags") arrive in any order and in any number of
//! batches. The [`OrderBook`] merges them into orders keyed by
//! `<marketplace>-<order reference>` and a background worker periodically
//! writes every item whose order is complete to
//! `<output_dir>/<marketplace>-<order reference>.csv`, exactly once.

pub mod config;
pub mod core;
pub mod facade;
pub mod feed;
pub mod flush;
pub mod storage;

pub use config::{DEFAULT_FLUSH_INTERVAL_MS, OrderBookConfig, interval_or_default};
pub use self::core::{CollateError, Field, FieldBag, FieldValue, Result};
pub use facade::OrderBook;
pub use feed::{InputBatch, InputScanner, extract_elements};
pub use flush::{FlushReport, FlushWorker, Flusher, OutputWriter};
pub use storage::{ApplyOutcome, DiscardReason, Order, OrderItem, OrderStore};
