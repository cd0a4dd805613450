use super::extract::extract_elements;
use crate::core::{CollateError, Result};
use log::warn;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, event};

/// One input file's worth of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBatch {
    pub path: PathBuf,
    pub elements: Vec<Value>,
}

/// Finds `*.json` files in an input directory, each at most once.
#[derive(Debug)]
pub struct InputScanner {
    input_dir: PathBuf,
    seen: HashSet<PathBuf>,
}

impl InputScanner {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            seen: HashSet::new(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// New top-level `*.json` files, sorted by path, marked as seen.
    pub fn scan_new_files(&mut self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            return Err(CollateError::MissingDirectory(self.input_dir.clone()));
        }

        let entries =
            fs::read_dir(&self.input_dir).map_err(|e| CollateError::io(&self.input_dir, e))?;

        let mut new_files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| CollateError::io(&self.input_dir, e))?.path();
            if !path.is_file() || !is_json(&path) {
                continue;
            }
            if self.seen.insert(path.clone()) {
                new_files.push(path);
            }
        }
        new_files.sort();
        Ok(new_files)
    }

    /// Read and extract every new file. Files that cannot be read or parsed
    /// are logged and not retried.
    pub fn read_new_batches(&mut self) -> Result<Vec<InputBatch>> {
        let mut batches = Vec::new();
        for path in self.scan_new_files()? {
            let elements = fs::read_to_string(&path)
                .map_err(|e| CollateError::io(&path, e))
                .and_then(|text| extract_elements(&text));
            match elements {
                Ok(elements) => {
                    event!(
                        Level::DEBUG,
                        path = %path.display(),
                        elements = elements.len(),
                        "input file read"
                    );
                    batches.push(InputBatch { path, elements });
                }
                Err(err) => warn!("skipping input file {}: {}", path.display(), err),
            }
        }
        Ok(batches)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
