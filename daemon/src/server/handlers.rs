//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, warn};

use crate::deploy::orchestrator::DeploymentStatus;
use crate::deploy::record::DeploymentRecord;
use crate::events::bus::EventBus;
use crate::server::error::ApiError;
use crate::server::state::ServerState;
use crate::storage::settings::DeploySettings;
use crate::utils::version_info;

/// Envelope wrapping every console-facing payload
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "slipway".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deploy response
#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub message: String,
    pub deployment: DeploymentRecord,
}

/// Trigger a deployment
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Data<DeployResponse>>, ApiError> {
    let deployment = state.orchestrator.trigger().await?;

    Ok(Json(Data {
        data: DeployResponse {
            message: "Deployment triggered successfully".to_string(),
            deployment,
        },
    }))
}

/// Read current deployment state for late-joining observers
pub async fn deployment_status_handler(
    State(state): State<Arc<ServerState>>,
) -> Json<Data<DeploymentStatus>> {
    Json(Data {
        data: state.orchestrator.status().await,
    })
}

/// Fetch stored settings, empty defaults when nothing is saved yet
pub async fn get_settings_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Data<DeploySettings>>, ApiError> {
    let settings = state.settings.get().await?;
    Ok(Json(Data {
        data: settings.unwrap_or_default(),
    }))
}

/// Settings update request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub team_id: String,
}

/// Settings update response
#[derive(Debug, Serialize)]
pub struct UpdateSettingsResponse {
    pub message: String,
}

/// Validate and persist settings
pub async fn update_settings_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<Data<UpdateSettingsResponse>>, ApiError> {
    let settings = DeploySettings {
        webhook_url: body.webhook_url,
        api_token: body.api_token,
        project_id: body.project_id,
        team_id: body.team_id,
        updated_at: None,
    };

    state.settings.set(settings).await?;

    Ok(Json(Data {
        data: UpdateSettingsResponse {
            message: "Settings updated successfully".to_string(),
        },
    }))
}

/// Upgrade an observer connection onto the live event feed
pub async fn events_handler(
    State(state): State<Arc<ServerState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let events = state.events.clone();
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

// Forwards every broadcast event to one observer as a JSON text frame.
// Delivery is best-effort: a lagging observer skips ahead rather than
// stalling the bus.
async fn stream_events(socket: WebSocket, events: EventBus) {
    debug!("Observer connected to deployment event feed");

    let mut rx = events.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let frame = match serde_json::to_string(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                error!("Failed to serialize {} event: {}", event.kind(), e);
                                continue;
                            }
                        };
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Observer lagged behind, {} event(s) skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            msg = stream.next() => {
                match msg {
                    // Inbound frames are ignored; the feed is push-only.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("Observer disconnected from deployment event feed");
}
