//! Application state management

use std::sync::Arc;

use crate::app::options::AppOptions;
use crate::deploy::orchestrator::Orchestrator;
use crate::errors::SlipwayError;
use crate::events::bus::EventBus;
use crate::http::client::PlatformClient;
use crate::storage::store::SettingsStore;

/// Main application state
pub struct AppState {
    /// Settings store, shared with the server surface
    pub settings: Arc<SettingsStore>,

    /// Event bus, shared with the server surface
    pub events: EventBus,

    /// The deployment orchestrator
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Initialize the application state
    pub fn init(options: &AppOptions) -> Result<Self, SlipwayError> {
        let client = Arc::new(PlatformClient::new(&options.status_api_base)?);
        let settings = Arc::new(SettingsStore::new(&options.storage, &options.environment));
        let events = EventBus::new(options.events_capacity);
        let orchestrator = Orchestrator::new(
            client,
            settings.clone(),
            events.clone(),
            options.orchestrator.clone(),
        );

        Ok(Self {
            settings,
            events,
            orchestrator,
        })
    }

    /// Shut down the orchestrator's background task
    pub async fn shutdown(&self) -> Result<(), SlipwayError> {
        self.orchestrator.shutdown().await;
        Ok(())
    }
}
