//! Deployment record and log models

use serde::{Deserialize, Serialize};

use crate::utils;

/// Status assigned to a record at trigger time
pub const STATUS_PENDING: &str = "pending";

/// Status forced on fallback or soft-404 completion
pub const STATUS_COMPLETED: &str = "completed";

/// The single in-flight deployment record.
///
/// Created once per trigger, mutated by the poller (or the fallback
/// timer) and immutable once a terminal status is reached. Remote-reported
/// states are passed through verbatim on top of the local
/// `pending`/`completed` markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Locally generated identifier, assigned at trigger time
    pub id: String,

    /// Current status string
    pub status: String,

    /// ISO-8601 trigger timestamp
    pub started_at: String,

    /// Remote job identifier, absent when status polling is unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,

    /// Remote deployment URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// ISO-8601 completion timestamp, unset until terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl DeploymentRecord {
    /// Create a fresh pending record stamped with the current time
    pub fn started_now() -> Self {
        Self {
            id: utils::epoch_millis_id(),
            status: STATUS_PENDING.to_string(),
            started_at: utils::now_iso(),
            remote_id: None,
            remote_url: None,
            completed_at: None,
        }
    }

    /// Whether the record has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        is_terminal_status(&self.status)
    }
}

/// Terminal-state classification for remote-reported status strings.
///
/// The platform reports uppercase markers; list endpoints have been seen
/// with lowercase variants, so the comparison is case-insensitive. Status
/// strings themselves are passed through verbatim.
pub fn is_terminal_status(status: &str) -> bool {
    status.eq_ignore_ascii_case("READY")
        || status.eq_ignore_ascii_case("COMPLETED")
        || status.eq_ignore_ascii_case("ERROR")
        || status.eq_ignore_ascii_case("CANCELED")
}

/// Log entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Warning,
    Error,
}

/// A timestamped entry in the per-deployment log sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO-8601 timestamp
    pub timestamp: String,

    /// Log message
    pub message: String,

    /// Entry kind
    #[serde(rename = "type")]
    pub kind: LogKind,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: utils::now_iso(),
            message: message.into(),
            kind,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogKind::Error, message)
    }
}
