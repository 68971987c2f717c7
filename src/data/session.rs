//! Dataset Session Module
//! Owns the loaded dataset for one analysis session, keyed by source file.

use crate::data::loader::{Dataset, LoadError, LoadOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Identity of an input file: canonical path, size and modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceIdentity {
    pub fn of(path: &Path) -> Result<Self, LoadError> {
        let path = fs::canonicalize(path)?;
        let meta = fs::metadata(&path)?;
        Ok(Self {
            path,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct CachedDataset {
    source: SourceIdentity,
    dataset: Dataset,
}

/// Caches the dataset of the last loaded file.
///
/// Loading the same unchanged file again returns the cached (possibly already
/// cleaned) dataset; any other file replaces it.
pub struct DatasetCache {
    options: LoadOptions,
    entry: Option<CachedDataset>,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}

impl DatasetCache {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            entry: None,
        }
    }

    /// Load a CSV file, reusing the cached dataset when the source is unchanged.
    ///
    /// On failure the previous dataset is dropped as well.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&mut Dataset, LoadError> {
        let path = path.as_ref();
        let source = match SourceIdentity::of(path) {
            Ok(source) => source,
            Err(err) => {
                self.invalidate();
                return Err(err);
            }
        };

        if self.is_current(&source) {
            debug!(path = %source.path.display(), "dataset cache hit");
        } else {
            self.invalidate();
            let dataset = Dataset::from_path(&source.path, &self.options)?;
            info!(path = %source.path.display(), rows = dataset.len(), "dataset cached");
            self.entry = Some(CachedDataset { source, dataset });
        }

        self.dataset_mut().ok_or(LoadError::NoData)
    }

    /// Drop the cached dataset.
    pub fn invalidate(&mut self) {
        if let Some(entry) = self.entry.take() {
            debug!(path = %entry.source.path.display(), "dataset cache invalidated");
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.entry.as_ref().map(|e| &e.dataset)
    }

    pub fn dataset_mut(&mut self) -> Option<&mut Dataset> {
        self.entry.as_mut().map(|e| &mut e.dataset)
    }

    /// Identity of the cached source file.
    pub fn source(&self) -> Option<&SourceIdentity> {
        self.entry.as_ref().map(|e| &e.source)
    }

    fn is_current(&self, source: &SourceIdentity) -> bool {
        self.source() == Some(source)
    }
}
