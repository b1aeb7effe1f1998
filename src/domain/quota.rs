//! API Quota Ledger
//!
//! Daily request budget for metered data APIs, derived from a monthly
//! allowance. Persisted (quota.json) so watcher restarts do not reset the
//! count mid-day.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quota file name
pub const QUOTA_FILE: &str = "quota.json";

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("Failed to write quota ledger: {0}")]
    WriteError(String),
}

/// Persisted quota state
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApiQuota {
    /// Start of the current 24h window, Unix milliseconds
    pub day_start: u64,
    /// Requests consumed this window
    pub used: u32,
    /// Requests allowed per window
    pub daily_limit: u32,
}

impl ApiQuota {
    /// Derive the daily budget from a monthly allowance
    pub fn from_monthly(monthly_quota: u32, now_ms: u64) -> Self {
        Self {
            day_start: now_ms,
            used: 0,
            daily_limit: monthly_quota / 30,
        }
    }

    /// Roll the window forward if 24h have passed
    pub fn roll(&mut self, now_ms: u64) {
        if now_ms.saturating_sub(self.day_start) > DAY_MS {
            tracing::info!("Daily quota reset; previous usage: {}", self.used);
            self.used = 0;
            self.day_start = now_ms;
        }
    }

    /// Consume one request if the budget allows. Returns false when
    /// exhausted; the caller should skip the call and fail open.
    pub fn try_consume(&mut self, now_ms: u64) -> bool {
        self.roll(now_ms);
        if self.used >= self.daily_limit {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.used)
    }

    /// Load from quota.json, falling back to a fresh ledger
    pub fn load(data_dir: &Path, monthly_quota: u32, now_ms: u64) -> Self {
        let path = Self::path(data_dir);
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .unwrap_or_else(|_| Self::from_monthly(monthly_quota, now_ms)),
            Err(_) => Self::from_monthly(monthly_quota, now_ms),
        }
    }

    /// Persist to quota.json
    pub fn save(&self, data_dir: &Path) -> Result<(), QuotaError> {
        fs::create_dir_all(data_dir).map_err(|e| QuotaError::WriteError(e.to_string()))?;
        let content =
            serde_json::to_string_pretty(self).map_err(|e| QuotaError::WriteError(e.to_string()))?;
        fs::write(Self::path(data_dir), content).map_err(|e| QuotaError::WriteError(e.to_string()))
    }

    fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(QUOTA_FILE)
    }
}
