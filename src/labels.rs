//! Label registry: loading and reconciling the class-label artifact.
//!
//! The registry guarantees that the label set length matches the model's
//! output cardinality before any prediction is served. Corrections are made
//! in memory first and then persisted best-effort, with a timestamped backup
//! of the original artifact written before any overwrite.

use crate::error::StartupError;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ordered class labels backed by a JSON artifact on disk.
///
/// Mutable only during startup reconciliation; read-only afterwards.
#[derive(Debug)]
pub struct LabelRegistry {
    path: PathBuf,
    classes: Vec<String>,
}

impl LabelRegistry {
    /// Read and parse the label artifact. Unreadable or malformed artifacts
    /// are startup-fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path).map_err(|source| StartupError::LabelRead {
            path: path.clone(),
            source,
        })?;
        let classes: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| StartupError::LabelParse {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), count = classes.len(), "Label artifact loaded");
        Ok(Self { path, classes })
    }

    /// Number of labels currently registered.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Label at `index`, if within range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// The full label slice, in model output order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Up to `n` leading labels, for diagnostics output.
    pub fn sample(&self, n: usize) -> Vec<String> {
        self.classes.iter().take(n).cloned().collect()
    }

    /// Infer the model's class cardinality from its output shape descriptor.
    ///
    /// Scans from the last axis backward; the first known positive dimension
    /// wins. Returns `None` when no axis has a known positive size.
    pub fn infer_units(output_shape: &[Option<usize>]) -> Option<usize> {
        output_shape
            .iter()
            .rev()
            .copied()
            .find_map(|dim| dim.filter(|&units| units > 0))
    }

    /// Align the label set length with the model's output cardinality.
    ///
    /// Pads with `class_<i>` placeholders or truncates to the model's units,
    /// then persists the corrected artifact (backup first). Persistence is
    /// best-effort: once this returns, the in-memory label set is
    /// authoritative even if the disk write failed. Idempotent, so a second
    /// call with the same shape changes nothing and writes no backup.
    pub fn reconcile(&mut self, output_shape: &[Option<usize>]) {
        let Some(units) = Self::infer_units(output_shape) else {
            info!("Model output cardinality unknown; trusting label artifact as-is");
            return;
        };

        let classes_len = self.classes.len();
        info!(
            output_shape = ?output_shape,
            inferred_units = units,
            classes_len,
            "Validating label set against model output"
        );

        if classes_len == units {
            return;
        }

        warn!(
            units,
            classes_len,
            "Label count does not match model output units; adjusting in memory and on disk"
        );

        if classes_len < units {
            let placeholders: Vec<String> =
                (classes_len..units).map(|i| format!("class_{i}")).collect();
            warn!(added = ?placeholders, "Extending label set with placeholders");
            self.classes.extend(placeholders);
        } else {
            let removed = self.classes.split_off(units);
            warn!(removed = ?removed, "Truncating label set to model output units");
        }

        if let Err(e) = self.persist() {
            warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to persist corrected label artifact; serving with in-memory labels"
            );
        }
    }

    // Backup the original artifact with a timestamp suffix, then overwrite it
    // with the corrected label set as pretty-printed JSON.
    fn persist(&self) -> std::io::Result<()> {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let backup_path = PathBuf::from(format!("{}.bak-{timestamp}", self.path.display()));
        fs::copy(&self.path, &backup_path)?;
        info!(backup = %backup_path.display(), "Backed up original label artifact");

        let json = serde_json::to_string_pretty(&self.classes).map_err(std::io::Error::other)?;
        fs::write(&self.path, json)?;
        info!(
            path = %self.path.display(),
            count = self.classes.len(),
            "Updated label artifact on disk"
        );
        Ok(())
    }
}
