//! Deployment settings model

use serde::{Deserialize, Serialize};

/// Settings for triggering and tracking hosted-platform deployments.
///
/// Optional fields are stored as possibly-empty strings for wire parity
/// with the management console; an empty string means "not configured".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySettings {
    /// Deploy-hook URL the platform exposes for this project
    #[serde(default)]
    pub webhook_url: String,

    /// Bearer token for the platform status API
    #[serde(default)]
    pub api_token: String,

    /// Project to query for deployment status
    #[serde(default)]
    pub project_id: String,

    /// Optional team scope for the status query
    #[serde(default)]
    pub team_id: String,

    /// Stamped on every save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DeploySettings {
    /// Configured webhook URL, if non-empty
    pub fn webhook(&self) -> Option<&str> {
        non_empty(&self.webhook_url)
    }

    /// Configured API token, if non-empty
    pub fn token(&self) -> Option<&str> {
        non_empty(&self.api_token)
    }

    /// Configured project ID, if non-empty
    pub fn project(&self) -> Option<&str> {
        non_empty(&self.project_id)
    }

    /// Configured team ID, if non-empty
    pub fn team(&self) -> Option<&str> {
        non_empty(&self.team_id)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_read_as_unconfigured() {
        let settings = DeploySettings::default();
        assert!(settings.webhook().is_none());
        assert!(settings.token().is_none());
        assert!(settings.project().is_none());
        assert!(settings.team().is_none());
    }

    #[test]
    fn test_whitespace_only_fields_read_as_unconfigured() {
        let settings = DeploySettings {
            webhook_url: "   ".to_string(),
            ..Default::default()
        };
        assert!(settings.webhook().is_none());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let settings = DeploySettings {
            webhook_url: "https://hooks.example.com/deploy/abc".to_string(),
            api_token: "tok".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["webhookUrl"], "https://hooks.example.com/deploy/abc");
        assert_eq!(json["apiToken"], "tok");
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn test_deserializes_with_missing_optionals() {
        let settings: DeploySettings =
            serde_json::from_str(r#"{"webhookUrl": "https://h.example.com/x"}"#).unwrap();
        assert_eq!(settings.webhook(), Some("https://h.example.com/x"));
        assert!(settings.token().is_none());
    }
}
