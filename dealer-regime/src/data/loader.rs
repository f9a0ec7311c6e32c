//! Snapshot loader for JSON files.
//!
//! Snapshots are produced by an upstream fetch job and stored one file per
//! ticker per scan. The loader normalizes bar ordering so every downstream
//! component can assume chronological input.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::types::MarketSnapshot;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON snapshot loader.
pub struct SnapshotLoader {
    data_dir: PathBuf,
}

impl SnapshotLoader {
    /// Create a loader rooted at a snapshot directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// List snapshot files in the directory, sorted by name.
    pub fn available_snapshots(&self) -> Result<Vec<PathBuf>, LoaderError> {
        if !self.data_dir.exists() {
            return Ok(vec![]);
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load every snapshot in the directory.
    pub fn load_all(&self) -> Result<Vec<MarketSnapshot>, LoaderError> {
        self.available_snapshots()?
            .iter()
            .map(|path| Self::load_file(path))
            .collect()
    }

    /// Load and normalize a single snapshot file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<MarketSnapshot, LoaderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let snapshot = Self::parse(&content)?;
        debug!(
            ticker = %snapshot.ticker,
            strikes = snapshot.chain.len(),
            intraday_bars = snapshot.intraday_bars.len(),
            "Loaded snapshot from {}",
            path.display()
        );
        Ok(snapshot)
    }

    /// Parse a snapshot from a JSON string.
    pub fn parse(content: &str) -> Result<MarketSnapshot, LoaderError> {
        let mut snapshot: MarketSnapshot = serde_json::from_str(content)?;

        if snapshot.ticker.trim().is_empty() {
            return Err(LoaderError::InvalidData("ticker cannot be empty".to_string()));
        }

        snapshot.daily_bars.sort_by_key(|b| b.date);
        snapshot.benchmark_bars.sort_by_key(|b| b.date);
        snapshot.intraday_bars.sort_by_key(|b| b.timestamp);
        snapshot
            .chain
            .sort_by(|a, b| a.strike.total_cmp(&b.strike));

        Ok(snapshot)
    }
}
