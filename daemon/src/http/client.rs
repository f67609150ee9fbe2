//! HTTP client for the hosted deployment platform

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::errors::SlipwayError;

/// Source identifier sent in the webhook payload
pub const TRIGGER_SOURCE: &str = "slipway-content-deployment";

/// Payload POSTed to the deploy webhook
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub trigger: String,
    pub timestamp: String,
}

impl WebhookPayload {
    pub fn new(timestamp: String) -> Self {
        Self {
            trigger: TRIGGER_SOURCE.to_string(),
            timestamp,
        }
    }
}

/// Remote job identity extracted from a webhook response.
///
/// Both fields absent means the deployment proceeds without a remote
/// correlation and status polling is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobIdentity {
    pub id: Option<String>,
    pub url: Option<String>,
}

/// Most recent deployment as reported by the platform status API
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDeployment {
    #[serde(default)]
    pub state: Option<String>,

    #[serde(rename = "readyState", default)]
    pub ready_state: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

impl RemoteDeployment {
    /// Reported status string.
    ///
    /// List endpoints surface either `state` or `readyState`; `readyState`
    /// is the more specific field and wins when both are present.
    pub fn status(&self) -> Option<&str> {
        self.ready_state.as_deref().or(self.state.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentListResponse {
    #[serde(default)]
    deployments: Vec<RemoteDeployment>,
}

/// Outbound calls the orchestrator makes against the platform
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Fire the deploy webhook and normalize the response into a job identity
    async fn trigger_webhook(
        &self,
        webhook_url: &str,
        payload: &WebhookPayload,
    ) -> Result<JobIdentity, SlipwayError>;

    /// Fetch the most recent deployment for a project, optionally team-scoped
    async fn latest_deployment(
        &self,
        token: &str,
        project_id: &str,
        team_id: Option<&str>,
    ) -> Result<RemoteDeployment, SlipwayError>;
}

/// reqwest-backed platform client
pub struct PlatformClient {
    client: Client,
    status_api_base: String,
}

impl PlatformClient {
    /// Create a new platform client
    pub fn new(status_api_base: &str) -> Result<Self, SlipwayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            status_api_base: status_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Get the status API base URL
    pub fn status_api_base(&self) -> &str {
        &self.status_api_base
    }
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn trigger_webhook(
        &self,
        webhook_url: &str,
        payload: &WebhookPayload,
    ) -> Result<JobIdentity, SlipwayError> {
        debug!("POST {}", webhook_url);

        let response = self.client.post(webhook_url).json(payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Webhook trigger failed: {} - {}", status, body);
            return Err(SlipwayError::UpstreamError(format!(
                "webhook returned {}: {}",
                status, body
            )));
        }

        // Deploy hooks are not guaranteed to answer with JSON; a non-JSON
        // body simply carries no job identity.
        let body = response.text().await.unwrap_or_default();
        let value: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        debug!("Webhook response: {}", value);

        Ok(extract_job_identity(&value))
    }

    async fn latest_deployment(
        &self,
        token: &str,
        project_id: &str,
        team_id: Option<&str>,
    ) -> Result<RemoteDeployment, SlipwayError> {
        let mut url = Url::parse(&format!("{}/deployments", self.status_api_base))
            .map_err(|e| SlipwayError::ConfigError(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("projectId", project_id);
            if let Some(team_id) = team_id {
                query.append_pair("teamId", team_id);
            }
            query.append_pair("limit", "1");
        }

        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, bearer_header(token))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SlipwayError::NotFound(
                "project or deployment unknown to the status API".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Status query failed: {} - {}", status, body);
            return Err(SlipwayError::UpstreamError(format!(
                "status API returned {}: {}",
                status, body
            )));
        }

        let list: DeploymentListResponse = response.json().await?;
        list.deployments
            .into_iter()
            .next()
            .ok_or_else(|| SlipwayError::UpstreamError("no deployments found".to_string()))
    }
}

/// Normalize a webhook response into a job identity.
///
/// Recognized shapes, in priority order: nested `job.{id,url}`, top-level
/// `{id,url}`, top-level `{deploymentId,deploymentUrl}`. Anything else
/// yields an empty identity, which is a capability reduction, not an error.
pub fn extract_job_identity(value: &Value) -> JobIdentity {
    if let Some(job) = value.get("job") {
        return JobIdentity {
            id: string_field(job, "id"),
            url: string_field(job, "url"),
        };
    }

    if value.get("id").is_some() {
        return JobIdentity {
            id: string_field(value, "id"),
            url: string_field(value, "url"),
        };
    }

    if value.get("deploymentId").is_some() {
        return JobIdentity {
            id: string_field(value, "deploymentId"),
            url: string_field(value, "deploymentUrl"),
        };
    }

    JobIdentity::default()
}

// Hook responses have been seen with numeric job ids.
fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Build an `Authorization` header value, tolerating tokens supplied with
/// or without a `Bearer ` prefix
pub fn bearer_header(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}
