pub mod flusher;
pub mod worker;
pub mod writer;

pub use flusher::{FlushReport, Flusher};
pub use worker::{FlushWorker, SLEEP_SLICE, next_sleep, sleep_cancellable};
pub use writer::{OutputWriter, file_name, header_line, render_line, render_snapshot};
