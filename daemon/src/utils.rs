//! Utility functions

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Version information for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Current time as an ISO-8601 timestamp with millisecond precision
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Millisecond-epoch identifier, assigned to records at trigger time
pub fn epoch_millis_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
