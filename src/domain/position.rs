//! Position Records
//!
//! The positions.json book shared by the sniper, rotator and yield farmer.
//! Field names stay camelCase on disk; several writers of the original file
//! format disagreed on optional fields, so everything beyond the identity
//! core is optional and survives round-trips via `extra`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default position book file name
pub const POSITIONS_FILE: &str = "positions.json";

#[derive(Error, Debug)]
pub enum PositionError {
    #[error("Failed to read position book: {0}")]
    ReadError(String),

    #[error("Failed to write position book: {0}")]
    WriteError(String),

    #[error("Failed to create data directory: {0}")]
    DirectoryError(String),
}

/// Lifecycle state of a tracked position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "active_holding")]
    ActiveHolding,
    #[serde(rename = "simulated")]
    Simulated,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl PositionStatus {
    /// Closed records are skipped by every monitor
    pub fn is_open(&self) -> bool {
        !matches!(self, PositionStatus::Closed)
    }
}

/// One tracked position (spot token or DLMM pool)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Token mint or DLMM pool address
    pub address: String,
    /// Display name / symbol
    pub name: String,
    /// Entry timestamp, Unix milliseconds
    pub entry_time: u64,
    /// SOL allocated at entry
    pub allocation: f64,
    /// Amount held (ui units); refreshed from chain by the rotator
    pub amount: f64,
    pub status: PositionStatus,
    /// Token decimals, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Entry price in USD, when a price feed was available at entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<f64>,
    /// Pool utilization at entry (yield positions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_util: Option<f64>,
    /// Entry transaction signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Position {
    pub fn new(address: impl Into<String>, name: impl Into<String>, entry_time: u64) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            entry_time,
            allocation: 0.0,
            amount: 0.0,
            status: PositionStatus::Active,
            decimals: None,
            entry_price: None,
            entry_util: None,
            tx_hash: None,
        }
    }

    pub fn with_allocation(mut self, sol: f64) -> Self {
        self.allocation = sol;
        self.amount = sol;
        self
    }

    pub fn with_status(mut self, status: PositionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_entry_price(mut self, price: f64) -> Self {
        self.entry_price = Some(price);
        self
    }

    pub fn with_tx_hash(mut self, sig: impl Into<String>) -> Self {
        self.tx_hash = Some(sig.into());
        self
    }

    /// Position age in milliseconds
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.entry_time)
    }

    /// Position age in hours
    pub fn age_hours(&self, now_ms: u64) -> f64 {
        self.age_ms(now_ms) as f64 / 3_600_000.0
    }

    /// PnL percentage against the entry price, when both prices are known
    pub fn pnl_pct(&self, current_price: f64) -> Option<f64> {
        let entry = self.entry_price?;
        if entry <= 0.0 {
            return None;
        }
        Some(((current_price - entry) / entry) * 100.0)
    }
}

/// The positions.json book. All mutation goes through one instance held
/// behind a lock by the application layer; the file has a single writer.
#[derive(Debug)]
pub struct PositionBook {
    path: PathBuf,
    positions: Vec<Position>,
}

impl PositionBook {
    /// Load the book, treating a missing or corrupt file as empty.
    /// A corrupt book is logged and reset rather than aborting the agent.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(POSITIONS_FILE);
        let positions = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(positions) => positions,
                Err(e) => {
                    tracing::error!("Corrupt position book at {}: {e}; resetting", path.display());
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, positions }
    }

    /// All records, including closed ones not yet pruned
    pub fn all(&self) -> &[Position] {
        &self.positions
    }

    /// Open records only
    pub fn open(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.status.is_open())
    }

    pub fn open_count(&self) -> usize {
        self.open().count()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.positions
            .iter()
            .any(|p| p.address == address && p.status.is_open())
    }

    pub fn get_mut(&mut self, address: &str) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| p.address == address)
    }

    /// Append a record and persist
    pub fn push(&mut self, position: Position) -> Result<(), PositionError> {
        self.positions.push(position);
        self.save()
    }

    /// Drop the record for `address` entirely and persist
    pub fn remove(&mut self, address: &str) -> Result<(), PositionError> {
        self.positions.retain(|p| p.address != address);
        self.save()
    }

    /// Keep only records whose address passes the filter, persisting when
    /// anything was evicted. Returns the number of evicted records.
    pub fn retain_addresses<F>(&mut self, keep: F) -> Result<usize, PositionError>
    where
        F: Fn(&str) -> bool,
    {
        let before = self.positions.len();
        self.positions.retain(|p| keep(&p.address));
        let evicted = before - self.positions.len();
        if evicted > 0 {
            self.save()?;
        }
        Ok(evicted)
    }

    /// Mark a position closed and persist
    pub fn close(&mut self, address: &str) -> Result<(), PositionError> {
        if let Some(p) = self.get_mut(address) {
            p.status = PositionStatus::Closed;
        }
        self.save()
    }

    /// Rewrite the book wholesale
    pub fn save(&self) -> Result<(), PositionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PositionError::DirectoryError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.positions)
            .map_err(|e| PositionError::WriteError(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| PositionError::WriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_position(address: &str) -> Position {
        Position::new(address, "TEST", 1_700_000_000_000)
            .with_allocation(0.05)
            .with_entry_price(1.5)
    }

    #[test]
    fn test_status_round_trip_matches_file_format() {
        let json = serde_json::to_string(&PositionStatus::ActiveHolding).unwrap();
        assert_eq!(json, "\"active_holding\"");
        let json = serde_json::to_string(&PositionStatus::Closed).unwrap();
        assert_eq!(json, "\"CLOSED\"");
    }

    #[test]
    fn test_position_serializes_camel_case() {
        let value = serde_json::to_value(sample_position("Mint111")).unwrap();
        assert!(value.get("entryTime").is_some());
        assert!(value.get("entryPrice").is_some());
        assert!(value.get("entry_time").is_none());
    }

    #[test]
    fn test_pnl_pct() {
        let p = sample_position("Mint111");
        let pnl = p.pnl_pct(3.0).unwrap();
        assert!((pnl - 100.0).abs() < 1e-9);
        assert!(p.pnl_pct(1.5).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_pnl_pct_without_entry_price() {
        let p = Position::new("Mint111", "TEST", 0);
        assert!(p.pnl_pct(2.0).is_none());
    }

    #[test]
    fn test_age_hours() {
        let p = sample_position("Mint111");
        let two_hours_later = p.entry_time + 2 * 3_600_000;
        assert!((p.age_hours(two_hours_later) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_book_push_and_reload() {
        let dir = tempdir().unwrap();
        let mut book = PositionBook::load(dir.path());
        book.push(sample_position("Mint111")).unwrap();
        book.push(sample_position("Mint222")).unwrap();

        let reloaded = PositionBook::load(dir.path());
        assert_eq!(reloaded.all().len(), 2);
        assert!(reloaded.contains("Mint111"));
    }

    #[test]
    fn test_book_close_skips_open_iteration() {
        let dir = tempdir().unwrap();
        let mut book = PositionBook::load(dir.path());
        book.push(sample_position("Mint111")).unwrap();
        book.close("Mint111").unwrap();

        assert_eq!(book.open_count(), 0);
        assert!(!book.contains("Mint111"));
        assert_eq!(book.all().len(), 1);
    }

    #[test]
    fn test_book_retain_evicts_and_persists() {
        let dir = tempdir().unwrap();
        let mut book = PositionBook::load(dir.path());
        book.push(sample_position("Mint111")).unwrap();
        book.push(sample_position("Mint222")).unwrap();

        let evicted = book.retain_addresses(|a| a == "Mint222").unwrap();
        assert_eq!(evicted, 1);

        let reloaded = PositionBook::load(dir.path());
        assert_eq!(reloaded.all().len(), 1);
        assert!(reloaded.contains("Mint222"));
    }

    #[test]
    fn test_corrupt_book_resets_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(POSITIONS_FILE), "{ not json").unwrap();
        let book = PositionBook::load(dir.path());
        assert!(book.all().is_empty());
    }
}
