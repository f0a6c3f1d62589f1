//! In-memory ring buffer backing the Messages panel
//!
//! The terminal is owned by the UI, so log output cannot go to stderr.
//! Controller messages and captured tracing events are kept here instead and
//! drawn by the Messages tab.

use chrono::{Local, TimeZone};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Log level for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Check if this level should be displayed for a minimum level filter
    pub fn matches_filter(&self, min_level: LogLevel) -> bool {
        *self >= min_level
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique ID for this entry
    pub id: u64,
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
    pub level: LogLevel,
    /// Target/module name
    pub target: String,
    pub message: String,
    /// Additional structured fields (key-value pairs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry stamped with the current time
    pub fn new(level: LogLevel, target: &str, message: &str) -> Self {
        Self {
            id: 0, // Will be set by buffer
            timestamp: current_timestamp_ms(),
            level,
            target: target.to_string(),
            message: message.to_string(),
            fields: None,
        }
    }

    /// Create log entry with additional fields
    pub fn with_fields(
        level: LogLevel,
        target: &str,
        message: &str,
        fields: serde_json::Value,
    ) -> Self {
        Self {
            fields: Some(fields),
            ..Self::new(level, target, message)
        }
    }

    /// Local wall-clock time as `HH:MM:SS`.
    pub fn time_of_day(&self) -> String {
        Local
            .timestamp_millis_opt(self.timestamp as i64)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string())
    }

    /// `[HH:MM:SS] message key=value ...` as shown in the Messages panel.
    pub fn display_line(&self) -> String {
        let mut line = format!("[{}] {}", self.time_of_day(), self.message);
        if let Some(serde_json::Value::Object(fields)) = &self.fields {
            for (key, value) in fields {
                match value {
                    serde_json::Value::String(s) => line.push_str(&format!(" {}={}", key, s)),
                    other => line.push_str(&format!(" {}={}", key, other)),
                }
            }
        }
        line
    }
}

/// Configuration for the log buffer
#[derive(Debug, Clone)]
pub struct LogBufferConfig {
    /// Maximum number of entries to store
    pub max_entries: usize,
    /// Minimum log level to capture
    pub min_level: LogLevel,
}

impl Default for LogBufferConfig {
    fn default() -> Self {
        Self {
            max_entries: 2_000,
            min_level: LogLevel::Info,
        }
    }
}

/// Thread-safe ring buffer for log entries
pub struct LogBuffer {
    entries: RwLock<VecDeque<LogEntry>>,
    max_entries: usize,
    min_level: LogLevel,
    next_id: RwLock<u64>,
}

impl LogBuffer {
    /// Create a new log buffer with default config
    pub fn new() -> Self {
        Self::with_config(LogBufferConfig::default())
    }

    /// Create a new log buffer with custom config
    pub fn with_config(config: LogBufferConfig) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(config.max_entries.min(4_096))),
            max_entries: config.max_entries.max(1),
            min_level: config.min_level,
            next_id: RwLock::new(1),
        }
    }

    /// Create as shared Arc
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create with config as shared Arc
    pub fn with_config_shared(config: LogBufferConfig) -> Arc<Self> {
        Arc::new(Self::with_config(config))
    }

    /// Add a log entry to the buffer
    pub fn push(&self, mut entry: LogEntry) {
        if !entry.level.matches_filter(self.min_level) {
            return;
        }

        {
            let mut id = self.next_id.write();
            entry.id = *id;
            *id += 1;
        }

        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Log a message at the specified level
    pub fn log(&self, level: LogLevel, target: &str, message: &str) {
        self.push(LogEntry::new(level, target, message));
    }

    /// Get recent log entries
    ///
    /// Returns up to `limit` of the most recent entries at or above
    /// `min_level`, in chronological order. If `after_id` is provided, only
    /// entries with ID > after_id are returned.
    pub fn get_entries(
        &self,
        min_level: Option<LogLevel>,
        limit: usize,
        after_id: Option<u64>,
    ) -> Vec<LogEntry> {
        let entries = self.entries.read();
        let min_level = min_level.unwrap_or(LogLevel::Trace);

        let mut recent: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|e| e.level.matches_filter(min_level))
            .filter(|e| after_id.map_or(true, |id| e.id > id))
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        recent
    }

    /// Most recent entry at or above `min_level`.
    pub fn last(&self, min_level: LogLevel) -> Option<LogEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .find(|e| e.level.matches_filter(min_level))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// ID of the newest entry, used to detect unseen messages
    pub fn latest_id(&self) -> Option<u64> {
        self.entries.read().back().map(|e| e.id)
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
