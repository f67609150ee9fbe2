//! Settings store management

use crate::errors::SlipwayError;
use crate::storage::file::File;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::DeploySettings;
use crate::utils;

/// Durable, file-backed settings store keyed by environment.
///
/// Read-only from the orchestrator's perspective; the management console
/// writes through [`SettingsStore::set`].
pub struct SettingsStore {
    file: File,
}

impl SettingsStore {
    /// Create a store bound to one environment's settings file
    pub fn new(layout: &StorageLayout, environment: &str) -> Self {
        Self {
            file: layout.settings_file(environment),
        }
    }

    /// Load the stored settings, `None` when nothing has been saved yet
    pub async fn get(&self) -> Result<Option<DeploySettings>, SlipwayError> {
        if !self.file.exists().await {
            return Ok(None);
        }
        let settings = self.file.read_json().await?;
        Ok(Some(settings))
    }

    /// Validate and persist settings, stamping `updated_at`
    pub async fn set(&self, mut settings: DeploySettings) -> Result<DeploySettings, SlipwayError> {
        if settings.webhook().is_none() {
            return Err(SlipwayError::ValidationError(
                "Webhook URL is required".to_string(),
            ));
        }

        settings.updated_at = Some(utils::now_iso());
        self.file.write_json(&settings).await?;
        Ok(settings)
    }
}
