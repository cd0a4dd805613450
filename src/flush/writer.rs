//! Per-order CSV output.
//!
//! Each order gets `<output_dir>/<marketplace>-<order reference>.csv`. The
//! header row is written once when the file is created; every successful
//! flush appends one row per item followed by a blank line.

use crate::core::{CollateError, Field, Result};
use crate::storage::{OrderHeader, ReadyLine, ReadySnapshot};
use log::warn;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{Level, event};

/// Column header naming the ten recognized fields in output order.
pub fn header_line() -> String {
    Field::ALL.map(Field::name).join(",")
}

pub fn render_line(header: &OrderHeader, line: &ReadyLine) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{},{}",
        header.order_ref,
        header.marketplace,
        header.name,
        header.surname,
        line.item_key,
        line.item.sku,
        line.item.price,
        line.item.quantity,
        header.postal_service,
        header.postcode
    )
}

pub fn render_snapshot(snapshot: &ReadySnapshot) -> Vec<String> {
    snapshot
        .lines
        .iter()
        .map(|line| render_line(&snapshot.header, line))
        .collect()
}

/// File name for an order key.
///
/// Characters that would escape the output directory or are invalid on
/// common file systems, a leading `.` and `%` itself are percent-encoded,
/// so distinct keys always map to distinct files.
pub fn file_name(order_key: &str) -> String {
    let mut stem = String::with_capacity(order_key.len());
    for (index, c) in order_key.chars().enumerate() {
        let reserved = matches!(c, '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
            || c.is_control()
            || (index == 0 && c == '.');
        if !reserved {
            stem.push(c);
            continue;
        }
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    format!("{stem}.csv")
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn dir_exists(&self) -> bool {
        self.output_dir.is_dir()
    }

    pub fn path_for(&self, order_key: &str) -> PathBuf {
        self.output_dir.join(file_name(order_key))
    }

    /// Create `path` with the header row unless it already exists.
    /// Returns true when the file was created by this call.
    pub fn ensure_header(&self, path: &Path) -> Result<bool> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(CollateError::io(path, e)),
        };
        writeln!(file, "{}", header_line()).map_err(|e| CollateError::io(path, e))?;
        Ok(true)
    }

    /// Append `lines` plus a blank separator line if nobody else holds the
    /// file.
    ///
    /// Availability is probed with a non-blocking shared lock; a file held
    /// exclusively elsewhere yields `false` and nothing is written. The probe
    /// is advisory: the flush worker is the only writer of these files.
    pub fn append_if_available(&self, path: &Path, lines: &[String]) -> bool {
        let probe = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                event!(Level::DEBUG, path = %path.display(), error = %e, "output file unavailable");
                return false;
            }
        };
        match probe.try_lock_shared() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                event!(Level::DEBUG, path = %path.display(), "output file locked, deferring");
                return false;
            }
            Err(TryLockError::Error(e)) => {
                warn!("cannot probe {}: {}", path.display(), e);
                return false;
            }
        }

        let mut block = String::new();
        for line in lines {
            block.push_str(line);
            block.push('\n');
        }
        block.push('\n');

        let written = OpenOptions::new()
            .append(true)
            .open(path)
            .and_then(|mut file| {
                file.write_all(block.as_bytes())?;
                file.flush()
            });

        match written {
            Ok(()) => true,
            Err(e) => {
                warn!("append to {} failed: {}", path.display(), e);
                false
            }
        }
    }
}
