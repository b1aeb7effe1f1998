//! Trade History
//!
//! Append-only action log (history.json): every discovery signal, trade,
//! exit and governance action lands here. Capped to the most recent 1000
//! entries on each append. Also answers the cooldown query: which mints
//! were sold too recently to re-enter.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// History file name
pub const HISTORY_FILE: &str = "history.json";

/// Most-recent entries kept on disk
pub const MAX_ENTRIES: usize = 1000;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history: {0}")]
    ReadError(String),

    #[error("Failed to write history: {0}")]
    WriteError(String),
}

/// One log record. Beyond the id/timestamp/type core the shape is
/// free-form; producers attach whatever fields describe the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// RFC 3339
    pub timestamp: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl HistoryEntry {
    pub fn new(entry_type: impl Into<String>) -> Self {
        Self::with_timestamp(entry_type, Utc::now())
    }

    pub fn with_timestamp(entry_type: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: at.to_rfc3339(),
            entry_type: entry_type.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Attach a free-form field
    pub fn field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// history.json accessor. Like the position book, a single instance is
/// shared behind a lock so the file has one writer.
#[derive(Debug)]
pub struct TradeHistory {
    path: PathBuf,
}

impl TradeHistory {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(HISTORY_FILE),
        }
    }

    /// All entries; missing or corrupt file reads as empty
    pub fn read_all(&self) -> Vec<HistoryEntry> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Append an entry, trimming to the newest MAX_ENTRIES
    pub fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.read_all();
        tracing::info!(
            "Action logged: {} {}",
            entry.entry_type,
            entry.get_str("token").or(entry.get_str("symbol")).unwrap_or("")
        );
        entries.push(entry);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(0..excess);
        }
        self.write(&entries)
    }

    /// Entries newer than the cutoff
    pub fn since(&self, cutoff: DateTime<Utc>) -> Vec<HistoryEntry> {
        self.read_all()
            .into_iter()
            .filter(|e| e.parsed_timestamp().map_or(false, |t| t > cutoff))
            .collect()
    }

    /// Mints sold within the cooldown window, which the rotator must not
    /// re-enter: yield exits, sniper exits, and swaps back into SOL.
    pub fn recent_exit_mints(&self, now: DateTime<Utc>, cooldown: Duration) -> HashSet<String> {
        let cutoff = now - cooldown;
        self.read_all()
            .iter()
            .filter(|e| e.parsed_timestamp().map_or(false, |t| t > cutoff))
            .filter(|e| {
                e.entry_type == "YIELD_EXIT"
                    || e.entry_type == "SNIPER_EXIT"
                    || (e.entry_type == "TRADE_EXECUTION"
                        && e.get_str("token") == Some(crate::SOL_MINT))
            })
            .filter_map(|e| {
                e.get_str("inputMint")
                    .or_else(|| e.get_str("mint"))
                    .map(str::to_string)
            })
            .collect()
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| HistoryError::WriteError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| HistoryError::WriteError(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| HistoryError::WriteError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let history = TradeHistory::new(dir.path());

        history
            .append(
                HistoryEntry::new("TRADE_EXECUTION")
                    .field("token", "Mint111")
                    .field("inputAmount", 0.05),
            )
            .unwrap();

        let entries = history.read_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_type, "TRADE_EXECUTION");
        assert_eq!(entries[0].get_str("token"), Some("Mint111"));
        assert!(!entries[0].id.is_empty());
    }

    #[test]
    fn test_free_form_fields_round_trip() {
        let dir = tempdir().unwrap();
        let history = TradeHistory::new(dir.path());

        history
            .append(
                HistoryEntry::new("DISCOVERY_METEORA")
                    .field("name", "HYPE-SOL")
                    .field(
                        "metrics",
                        serde_json::json!({ "volume": 250000.0, "utilization": 1.8 }),
                    ),
            )
            .unwrap();

        let entries = history.read_all();
        assert_eq!(entries[0].fields["metrics"]["utilization"], 1.8);
    }

    #[test]
    fn test_cap_keeps_newest_entries() {
        let dir = tempdir().unwrap();
        let history = TradeHistory::new(dir.path());

        // Seed a full file directly, then append once more
        let entries: Vec<HistoryEntry> = (0..MAX_ENTRIES)
            .map(|i| HistoryEntry::new("TICK").field("seq", i as u64))
            .collect();
        history.write(&entries).unwrap();

        history
            .append(HistoryEntry::new("TICK").field("seq", MAX_ENTRIES as u64))
            .unwrap();

        let entries = history.read_all();
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].fields["seq"], 1);
        assert_eq!(entries.last().unwrap().fields["seq"], MAX_ENTRIES as u64);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let history = TradeHistory::new(dir.path());
        assert!(history.read_all().is_empty());
    }

    #[test]
    fn test_recent_exit_mints_cooldown_window() {
        let dir = tempdir().unwrap();
        let history = TradeHistory::new(dir.path());
        let now = Utc::now();

        // Sold 5 minutes ago: blocked
        history
            .append(
                HistoryEntry::with_timestamp("YIELD_EXIT", now - Duration::minutes(5))
                    .field("inputMint", "HYPE_MINT_123"),
            )
            .unwrap();
        // Sold 40 minutes ago: clear
        history
            .append(
                HistoryEntry::with_timestamp("SNIPER_EXIT", now - Duration::minutes(40))
                    .field("mint", "OLD_MINT_456"),
            )
            .unwrap();
        // Buy (output not SOL) 1 minute ago: not an exit
        history
            .append(
                HistoryEntry::with_timestamp("TRADE_EXECUTION", now - Duration::minutes(1))
                    .field("token", "FRESH_MINT_789")
                    .field("inputMint", "FRESH_MINT_789"),
            )
            .unwrap();

        let blocked = history.recent_exit_mints(now, Duration::minutes(15));
        assert!(blocked.contains("HYPE_MINT_123"));
        assert!(!blocked.contains("OLD_MINT_456"));
        assert!(!blocked.contains("FRESH_MINT_789"));
    }

    #[test]
    fn test_sell_to_sol_counts_as_exit() {
        let dir = tempdir().unwrap();
        let history = TradeHistory::new(dir.path());
        let now = Utc::now();

        history
            .append(
                HistoryEntry::with_timestamp("TRADE_EXECUTION", now - Duration::minutes(2))
                    .field("token", crate::SOL_MINT)
                    .field("inputMint", "DUMPED_MINT"),
            )
            .unwrap();

        let blocked = history.recent_exit_mints(now, Duration::minutes(15));
        assert!(blocked.contains("DUMPED_MINT"));
    }
}
