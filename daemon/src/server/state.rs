//! Server state

use std::sync::Arc;

use crate::deploy::orchestrator::Orchestrator;
use crate::events::bus::EventBus;
use crate::storage::store::SettingsStore;

/// Server state shared across handlers
pub struct ServerState {
    pub orchestrator: Orchestrator,
    pub settings: Arc<SettingsStore>,
    pub events: EventBus,
}

impl ServerState {
    pub fn new(orchestrator: Orchestrator, settings: Arc<SettingsStore>, events: EventBus) -> Self {
        Self {
            orchestrator,
            settings,
            events,
        }
    }
}
