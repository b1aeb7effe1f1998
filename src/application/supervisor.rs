//! Supervisor
//!
//! Watcher process that keeps the agent alive: spawns the bot as a child,
//! mirrors its output, counts rate-limit hits, restarts with exponential
//! backoff on crash, and rewrites the status.json heartbeat other tooling
//! reads. Severe RPC throttling (50 consecutive 429s) kills the child so
//! the backoff can cool the endpoint down.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::loader::SupervisorSection;

/// Status heartbeat file name
pub const STATUS_FILE: &str = "status.json";

/// Alert drop file for out-of-band inspection
pub const ALERT_FILE: &str = "agent_alert.txt";

/// 429 streak that marks the endpoint critical
pub const CRITICAL_429S: u32 = 20;

/// 429 streak that forces a child restart
pub const KILL_429S: u32 = 50;

/// 429 streak that adds a restart penalty
pub const PENALTY_429S: u32 = 25;

/// Extra delay while heavily throttled
pub const PENALTY_MS: u64 = 180_000;

/// What one output line tells us about system health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSignal {
    RateLimited,
    Healthy,
    Other,
}

/// Classify a child output line
pub fn classify_line(line: &str) -> LineSignal {
    if line.contains("429") || line.contains("Too Many Requests") {
        LineSignal::RateLimited
    } else if line.contains("TARGET ACQUIRED") || line.contains("Launch monitor listening") {
        LineSignal::Healthy
    } else {
        LineSignal::Other
    }
}

/// Restart delay: exponential from the base, capped, plus a throttling
/// penalty while the 429 streak is high.
pub fn backoff_delay(config: &SupervisorSection, retry: u32, consecutive_429s: u32) -> Duration {
    let base_ms = config.initial_backoff_secs * 1000 * 2u64.pow(retry.min(10));
    let penalty_ms = if consecutive_429s > PENALTY_429S {
        PENALTY_MS
    } else {
        0
    };
    Duration::from_millis((base_ms + penalty_ms).min(config.max_backoff_secs * 1000))
}

/// Persisted heartbeat, rewritten wholesale on every change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorState {
    pub status: String,
    pub last_update: u64,
    pub retries: u32,
    pub rate_limited: bool,
    pub backoff_active: bool,
    pub pid: u32,
    pub child_pid: Option<u32>,
    pub incident_count: u32,
    #[serde(rename = "consecutive429s")]
    pub consecutive_429s: u32,
    pub health: String,
    pub last_signal_time: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_in_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
}

impl SupervisorState {
    fn new() -> Self {
        let now = Utc::now().timestamp_millis() as u64;
        Self {
            status: "BOOTING".to_string(),
            last_update: now,
            retries: 0,
            rate_limited: false,
            backoff_active: false,
            pid: std::process::id(),
            child_pid: None,
            incident_count: 0,
            consecutive_429s: 0,
            health: "GOOD".to_string(),
            last_signal_time: now,
            next_retry_in_ms: None,
            last_exit_code: None,
        }
    }
}

pub struct Supervisor {
    config: SupervisorSection,
    data_dir: PathBuf,
    /// Command line for the child bot process
    child_program: String,
    child_args: Vec<String>,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(
        config: SupervisorSection,
        data_dir: &Path,
        child_program: String,
        child_args: Vec<String>,
    ) -> Self {
        Self {
            config,
            data_dir: data_dir.to_path_buf(),
            child_program,
            child_args,
            state: SupervisorState::new(),
        }
    }

    /// Run the restart loop until the retry budget is spent
    pub async fn run(&mut self) -> anyhow::Result<()> {
        tracing::info!("Supervisor active");
        let mut retry_count: u32 = 0;

        loop {
            tracing::info!(
                "Starting {} (attempt {})",
                self.child_program,
                retry_count + 1
            );
            self.patch(|s| {
                s.status = "RUNNING".to_string();
                s.retries = retry_count;
                s.rate_limited = false;
                s.backoff_active = false;
                s.next_retry_in_ms = None;
                s.health = if retry_count > 5 { "DEGRADED" } else { "GOOD" }.to_string();
            });

            let exit_code = self.run_child_once().await?;
            self.patch(|s| {
                s.status = "CRASHED".to_string();
                s.last_exit_code = exit_code;
                s.incident_count += 1;
            });
            tracing::warn!("Bot exited with code {exit_code:?}");

            if let Some(code) = exit_code {
                if code != 0 {
                    self.write_alert(&format!("CRASH_EXIT_CODE_{code}"));
                }
            }

            if retry_count >= self.config.max_retries {
                tracing::error!("Max retries reached.");
                self.patch(|s| {
                    s.status = "FATAL_ERROR".to_string();
                    s.health = "DEAD".to_string();
                });
                self.write_alert("MAX_RETRIES_REACHED");
                anyhow::bail!("Supervisor gave up after {} retries", retry_count);
            }

            let delay = backoff_delay(&self.config, retry_count, self.state.consecutive_429s);
            tracing::info!("Waiting {}s before restart...", delay.as_secs());
            self.patch(|s| {
                s.status = "BACKOFF".to_string();
                s.backoff_active = true;
                s.next_retry_in_ms = Some(delay.as_millis() as u64);
            });
            retry_count += 1;
            tokio::time::sleep(delay).await;
        }
    }

    /// Spawn the child once and pump its output until exit. Returns the
    /// exit code (None when killed by signal).
    async fn run_child_once(&mut self) -> anyhow::Result<Option<i32>> {
        let mut child = Command::new(&self.child_program)
            .args(&self.child_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("WATCHER_ACTIVE", "true")
            .spawn()?;

        self.patch(|s| s.child_pid = child.id());

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (line_tx, mut line_rx) = tokio::sync::mpsc::channel::<String>(256);

        if let Some(stdout) = stdout {
            let tx = line_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    println!("[Bot] {line}");
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(stderr) = stderr {
            let tx = line_tx;
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    eprintln!("[Bot-Err] {line}");
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
            });
        }

        let stale_after = Duration::from_secs(self.config.stale_after_secs);
        let mut heartbeat = tokio::time::interval(Duration::from_secs(60));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut kill_child = false;
        loop {
            if kill_child {
                tracing::error!("Severe RPC throttling. Restarting child...");
                self.write_alert(&format!("EXTREME_RATE_LIMIT_{KILL_429S}"));
                child.start_kill().ok();
                kill_child = false;
            }

            tokio::select! {
                status = child.wait() => {
                    return Ok(status?.code());
                }
                Some(line) = line_rx.recv() => {
                    kill_child = self.handle_line(&line);
                }
                _ = heartbeat.tick() => {
                    let silence = Utc::now().timestamp_millis() as u64 - self.state.last_signal_time;
                    if self.state.status == "RUNNING" && silence > stale_after.as_millis() as u64 {
                        tracing::warn!("Heartbeat stale ({}s of silence)", silence / 1000);
                        self.write_alert("STALE_PROCESS_DETECTED");
                        self.patch(|s| s.incident_count += 1);
                    } else {
                        // Keep lastUpdate fresh for outside readers
                        self.patch(|_| {});
                    }
                }
            }
        }
    }

    /// Track one output line. Returns true when the child must die.
    fn handle_line(&mut self, line: &str) -> bool {
        match classify_line(line) {
            LineSignal::RateLimited => {
                let streak = self.state.consecutive_429s + 1;
                self.patch(|s| {
                    s.rate_limited = true;
                    s.consecutive_429s = streak;
                    s.health = if streak > CRITICAL_429S {
                        "CRITICAL"
                    } else {
                        "DEGRADED"
                    }
                    .to_string();
                });
                streak == KILL_429S
            }
            LineSignal::Healthy => {
                let was_limited = self.state.rate_limited;
                self.patch(|s| {
                    s.consecutive_429s = 0;
                    s.rate_limited = false;
                    s.health = "GOOD".to_string();
                    s.last_signal_time = Utc::now().timestamp_millis() as u64;
                });
                if was_limited {
                    tracing::info!("Network path cleared. System health restored.");
                }
                false
            }
            LineSignal::Other => false,
        }
    }

    /// Apply a state change and rewrite status.json
    fn patch<F: FnOnce(&mut SupervisorState)>(&mut self, f: F) {
        f(&mut self.state);
        self.state.last_update = Utc::now().timestamp_millis() as u64;
        if let Err(e) = write_status(&self.data_dir, &self.state) {
            tracing::warn!("Failed to write status file: {e}");
        }
    }

    /// Drop an alert file for out-of-band inspection
    fn write_alert(&self, reason: &str) {
        tracing::error!("ALERT: {reason}");
        let body = format!(
            "BOT ALERT - {}\nReason: {reason}\nState: {}\n",
            Utc::now().to_rfc3339(),
            serde_json::to_string_pretty(&self.state).unwrap_or_default()
        );
        let _ = std::fs::write(self.data_dir.join(ALERT_FILE), body);
    }
}

/// Rewrite status.json wholesale
pub fn write_status(data_dir: &Path, state: &SupervisorState) -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(state)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(data_dir.join(STATUS_FILE), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config() -> SupervisorSection {
        SupervisorSection::default()
    }

    #[test]
    fn test_classify_rate_limit_lines() {
        assert_eq!(
            classify_line("Server responded with 429 Too Many Requests"),
            LineSignal::RateLimited
        );
        assert_eq!(classify_line("error: 429"), LineSignal::RateLimited);
    }

    #[test]
    fn test_classify_healthy_lines() {
        assert_eq!(
            classify_line("[Raydium] TARGET ACQUIRED: Ape (APE)"),
            LineSignal::Healthy
        );
        assert_eq!(classify_line("Launch monitor listening"), LineSignal::Healthy);
    }

    #[test]
    fn test_classify_other_lines() {
        assert_eq!(classify_line("Checking portfolio health..."), LineSignal::Other);
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let c = config();
        assert_eq!(backoff_delay(&c, 0, 0), Duration::from_secs(5));
        assert_eq!(backoff_delay(&c, 1, 0), Duration::from_secs(10));
        assert_eq!(backoff_delay(&c, 2, 0), Duration::from_secs(20));
    }

    #[test]
    fn test_backoff_caps_at_five_minutes() {
        let c = config();
        assert_eq!(backoff_delay(&c, 9, 0), Duration::from_secs(300));
        assert_eq!(backoff_delay(&c, 30, 0), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_penalty_under_throttling() {
        let c = config();
        // 5s base + 180s penalty
        assert_eq!(backoff_delay(&c, 0, PENALTY_429S + 1), Duration::from_secs(185));
        // penalty never breaks the cap
        assert_eq!(backoff_delay(&c, 8, PENALTY_429S + 1), Duration::from_secs(300));
    }

    #[test]
    fn test_status_file_round_trip() {
        let dir = tempdir().unwrap();
        let mut state = SupervisorState::new();
        state.status = "RUNNING".to_string();
        state.consecutive_429s = 7;
        write_status(dir.path(), &state).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(STATUS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["status"], "RUNNING");
        assert_eq!(value["consecutive429s"], 7);
        assert_eq!(value["lastUpdate"], state.last_update);
    }

    #[test]
    fn test_handle_line_streak_and_recovery() {
        let dir = tempdir().unwrap();
        let mut supervisor = Supervisor::new(
            config(),
            dir.path(),
            "true".to_string(),
            vec![],
        );

        for _ in 0..(CRITICAL_429S + 1) {
            assert!(!supervisor.handle_line("got 429"));
        }
        assert_eq!(supervisor.state.health, "CRITICAL");
        assert!(supervisor.state.rate_limited);

        assert!(!supervisor.handle_line("[Raydium] TARGET ACQUIRED: X"));
        assert_eq!(supervisor.state.consecutive_429s, 0);
        assert_eq!(supervisor.state.health, "GOOD");
    }

    #[test]
    fn test_kill_threshold() {
        let dir = tempdir().unwrap();
        let mut supervisor = Supervisor::new(config(), dir.path(), "true".to_string(), vec![]);
        let mut killed = false;
        for _ in 0..KILL_429S {
            killed = supervisor.handle_line("429");
        }
        assert!(killed);
    }
}
