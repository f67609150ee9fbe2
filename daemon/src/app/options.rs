//! Application configuration options

use std::time::Duration;

use crate::deploy::orchestrator::OrchestratorOptions;
use crate::storage::layout::StorageLayout;

/// Default status API base for the hosted platform
pub const DEFAULT_STATUS_API_BASE: &str = "https://api.vercel.com/v6";

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Settings-store environment key
    pub environment: String,

    /// Storage configuration
    pub storage: StorageLayout,

    /// Server configuration
    pub server: ServerOptions,

    /// Base URL of the platform status API
    pub status_api_base: String,

    /// Orchestrator timing options
    pub orchestrator: OrchestratorOptions,

    /// Event bus buffer capacity per observer
    pub events_capacity: usize,

    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            storage: StorageLayout::default(),
            server: ServerOptions::default(),
            status_api_base: DEFAULT_STATUS_API_BASE.to_string(),
            orchestrator: OrchestratorOptions::default(),
            events_capacity: 1024,
            lifecycle: LifecycleOptions::default(),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1339,
        }
    }
}

/// Lifecycle options for the daemon
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}
