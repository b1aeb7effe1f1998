//! PnL Snapshots
//!
//! Wallet balance snapshots (pnl_history.json) used by the strategic
//! review. Pruned to the trailing 7 days on every append.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot file name
pub const PNL_FILE: &str = "pnl_history.json";

/// Retention window, milliseconds
pub const RETENTION_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Error, Debug)]
pub enum PnlError {
    #[error("Failed to write pnl history: {0}")]
    WriteError(String),
}

/// One balance snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PnlSnapshot {
    /// Unix milliseconds
    pub timestamp: u64,
    /// Wallet balance in SOL
    pub balance: f64,
}

/// pnl_history.json accessor
#[derive(Debug)]
pub struct PnlLog {
    path: PathBuf,
}

impl PnlLog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(PNL_FILE),
        }
    }

    pub fn read_all(&self) -> Vec<PnlSnapshot> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Record a snapshot, dropping anything older than the retention window
    pub fn record(&self, timestamp: u64, balance: f64) -> Result<(), PnlError> {
        let mut snapshots = self.read_all();
        snapshots.push(PnlSnapshot { timestamp, balance });
        let cutoff = timestamp.saturating_sub(RETENTION_MS);
        snapshots.retain(|s| s.timestamp >= cutoff);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PnlError::WriteError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&snapshots)
            .map_err(|e| PnlError::WriteError(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| PnlError::WriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_and_read() {
        let dir = tempdir().unwrap();
        let log = PnlLog::new(dir.path());
        log.record(1_000, 0.2).unwrap();
        log.record(2_000, 0.21).unwrap();

        let snapshots = log.read_all();
        assert_eq!(snapshots.len(), 2);
        assert!((snapshots[1].balance - 0.21).abs() < 1e-9);
    }

    #[test]
    fn test_prunes_past_retention_window() {
        let dir = tempdir().unwrap();
        let log = PnlLog::new(dir.path());

        let now = 10 * RETENTION_MS;
        log.record(now - RETENTION_MS - 1, 0.10).unwrap(); // too old after next append
        log.record(now - RETENTION_MS / 2, 0.15).unwrap();
        log.record(now, 0.20).unwrap();

        let snapshots = log.read_all();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.timestamp >= now - RETENTION_MS));
    }
}
