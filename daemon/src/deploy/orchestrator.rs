//! Single-flight deployment state machine.
//!
//! Owns the one current [`DeploymentRecord`], the in-flight guard, and the
//! per-deployment log sequence. A trigger fires the deploy webhook and then
//! hands progress tracking to either the status poller or a fixed-delay
//! fallback timer, both running as one spawned task whose handle the
//! orchestrator retains until the next trigger or shutdown.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::deploy::record::{is_terminal_status, DeploymentRecord, LogEntry, STATUS_COMPLETED};
use crate::errors::SlipwayError;
use crate::events::bus::{DeploymentEvent, EventBus};
use crate::http::client::{PlatformApi, WebhookPayload};
use crate::storage::store::SettingsStore;
use crate::utils;

/// Orchestrator timing and resource options
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Delay before the first status poll
    pub poll_initial_delay: Duration,

    /// Delay between status polls
    pub poll_interval: Duration,

    /// Completion delay when status polling is unavailable
    pub fallback_delay: Duration,

    /// Upper bound on non-terminal poll ticks before the deployment is failed
    pub max_poll_ticks: u32,

    /// Upper bound on retained log entries; the oldest are dropped first
    pub max_log_entries: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            poll_initial_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(3),
            fallback_delay: Duration::from_secs(5),
            max_poll_ticks: 200,
            max_log_entries: 500,
        }
    }
}

/// Snapshot returned by the status query interface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub is_deploying: bool,
    pub current_deployment: Option<DeploymentRecord>,
    pub logs: Vec<LogEntry>,
}

#[derive(Default)]
struct DeployState {
    is_deploying: bool,
    current: Option<DeploymentRecord>,
    logs: Vec<LogEntry>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    api: Arc<dyn PlatformApi>,
    store: Arc<SettingsStore>,
    events: EventBus,
    options: OrchestratorOptions,
    state: Mutex<DeployState>,
    // Serializes trigger calls so the in-flight check-and-set is atomic.
    trigger_gate: Mutex<()>,
}

/// The deployment orchestrator. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create a new orchestrator
    pub fn new(
        api: Arc<dyn PlatformApi>,
        store: Arc<SettingsStore>,
        events: EventBus,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                store,
                events,
                options,
                state: Mutex::new(DeployState::default()),
                trigger_gate: Mutex::new(()),
            }),
        }
    }

    /// Trigger a deployment.
    ///
    /// Rejects with [`SlipwayError::ConflictError`] while a deployment is in
    /// flight and [`SlipwayError::ConfigError`] when no webhook URL is
    /// configured. Returns the created record as soon as the webhook call
    /// completes; progress continues asynchronously and is observable via
    /// [`Orchestrator::status`] and the event bus.
    pub async fn trigger(&self) -> Result<DeploymentRecord, SlipwayError> {
        let gate = self.shared.trigger_gate.lock().await;

        if self.shared.state.lock().await.is_deploying {
            return Err(SlipwayError::ConflictError);
        }

        let settings = match self.shared.store.get().await {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                drop(gate);
                let message = e.to_string();
                self.discard_in_flight(&message).await;
                return Err(SlipwayError::ServerError(message));
            }
        };

        let Some(webhook_url) = settings.webhook().map(str::to_string) else {
            return Err(SlipwayError::ConfigError(
                "Webhook URL not configured. Please configure it in settings.".to_string(),
            ));
        };

        let record = {
            let mut state = self.shared.state.lock().await;
            state.is_deploying = true;
            state.logs.clear();
            let record = DeploymentRecord::started_now();
            state.current = Some(record.clone());
            record
        };
        drop(gate);

        info!("Deployment {} triggered", record.id);
        self.shared.events.emit(DeploymentEvent::Started(record.clone()));

        let payload = WebhookPayload::new(utils::now_iso());
        let identity = match self.shared.api.trigger_webhook(&webhook_url, &payload).await {
            Ok(identity) => identity,
            Err(e) => {
                let message = e.to_string();
                self.discard_in_flight(&message).await;
                return Err(SlipwayError::UpstreamError(message));
            }
        };

        let mut record = record;
        record.remote_id = identity.id;
        record.remote_url = identity.url;
        {
            let mut state = self.shared.state.lock().await;
            state.current = Some(record.clone());
        }

        let poll_scope = match (record.remote_id.as_deref(), settings.token(), settings.project()) {
            (Some(_), Some(token), Some(project)) => {
                Some((token.to_string(), project.to_string()))
            }
            (remote_id, token, project) => {
                if remote_id.is_none() {
                    debug!("Cannot poll status: no remote id in webhook response");
                }
                if token.is_none() {
                    debug!("Cannot poll status: no API token configured");
                }
                if project.is_none() {
                    debug!("Cannot poll status: no project ID configured");
                }
                None
            }
        };

        let handle = match poll_scope {
            Some((token, project_id)) => {
                let team_id = settings.team().map(str::to_string);
                let this = self.clone();
                tokio::spawn(async move { this.run_poller(token, project_id, team_id).await })
            }
            None => {
                let this = self.clone();
                tokio::spawn(async move { this.run_fallback().await })
            }
        };
        self.shared.state.lock().await.task = Some(handle);

        Ok(record)
    }

    /// Snapshot of the current deployment state; never blocks on network
    /// and never mutates
    pub async fn status(&self) -> DeploymentStatus {
        let state = self.shared.state.lock().await;
        DeploymentStatus {
            is_deploying: state.is_deploying,
            current_deployment: state.current.clone(),
            logs: state.logs.clone(),
        }
    }

    /// Abort the poller or fallback task, if one is running
    pub async fn shutdown(&self) {
        let mut state = self.shared.state.lock().await;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    // Failure during triggering: the record is discarded entirely and
    // observers are told via a failed event.
    async fn discard_in_flight(&self, error: &str) {
        error!("Deployment trigger failed: {}", error);
        {
            let mut state = self.shared.state.lock().await;
            state.is_deploying = false;
            state.current = None;
        }
        self.shared.events.emit(DeploymentEvent::Failed {
            error: error.to_string(),
        });
    }

    // Self-rescheduling poll loop. Ticks are strictly serialized: the next
    // tick is scheduled only after the current one completes.
    async fn run_poller(self, token: String, project_id: String, team_id: Option<String>) {
        debug!("Status polling starting for project {}", project_id);
        tokio::time::sleep(self.shared.options.poll_initial_delay).await;

        let mut ticks: u32 = 0;
        loop {
            let result = self
                .shared
                .api
                .latest_deployment(&token, &project_id, team_id.as_deref())
                .await;

            match result {
                Ok(remote) => {
                    let raw_status = remote.status().unwrap_or("unknown").to_string();
                    let (record, logs) = {
                        let mut state = self.shared.state.lock().await;
                        let Some(current) = state.current.as_mut() else {
                            return;
                        };
                        current.status = raw_status.clone();
                        if let Some(url) = remote.url.as_deref() {
                            current.remote_url = Some(format!("https://{}", url));
                        }
                        let record = current.clone();
                        let entry = LogEntry::info(format!("Deployment status: {}", raw_status));
                        push_capped(&mut state.logs, entry, self.shared.options.max_log_entries);
                        (record, state.logs.clone())
                    };
                    self.shared.events.emit(DeploymentEvent::Status {
                        deployment: record,
                        logs,
                    });

                    if is_terminal_status(&raw_status) {
                        let record = {
                            let mut state = self.shared.state.lock().await;
                            state.is_deploying = false;
                            let Some(current) = state.current.as_mut() else {
                                return;
                            };
                            current.completed_at = Some(utils::now_iso());
                            current.clone()
                        };
                        info!(
                            "Deployment {} reached terminal state {}",
                            record.id, record.status
                        );
                        self.shared.events.emit(DeploymentEvent::Completed(record));
                        return;
                    }
                }
                Err(SlipwayError::NotFound(_)) => {
                    // A misconfigured token or project must not strand the
                    // console in a permanent "deploying" state.
                    warn!("Status API does not know the project; completing without tracking");
                    let record = {
                        let mut state = self.shared.state.lock().await;
                        state.is_deploying = false;
                        let entry = LogEntry::warning(
                            "Could not track deployment status. Check your API token and project ID.",
                        );
                        push_capped(&mut state.logs, entry, self.shared.options.max_log_entries);
                        let Some(current) = state.current.as_mut() else {
                            return;
                        };
                        current.status = STATUS_COMPLETED.to_string();
                        current.completed_at = Some(utils::now_iso());
                        current.clone()
                    };
                    self.shared.events.emit(DeploymentEvent::Completed(record));
                    return;
                }
                Err(e) => {
                    error!("Error polling deployment status: {}", e);
                    self.shared.state.lock().await.is_deploying = false;
                    self.shared.events.emit(DeploymentEvent::Failed {
                        error: e.to_string(),
                    });
                    return;
                }
            }

            ticks += 1;
            if ticks >= self.shared.options.max_poll_ticks {
                error!(
                    "Deployment did not reach a terminal state within {} polls",
                    ticks
                );
                {
                    let mut state = self.shared.state.lock().await;
                    state.is_deploying = false;
                    let entry =
                        LogEntry::error("Timed out waiting for a terminal deployment state.");
                    push_capped(&mut state.logs, entry, self.shared.options.max_log_entries);
                }
                self.shared.events.emit(DeploymentEvent::Failed {
                    error: "timed out waiting for a terminal deployment state".to_string(),
                });
                return;
            }
            tokio::time::sleep(self.shared.options.poll_interval).await;
        }
    }

    // Without a remote identity plus credentials there is nothing to poll;
    // the record completes after a fixed delay instead.
    async fn run_fallback(self) {
        debug!("Status polling unavailable; completing after fixed delay");
        tokio::time::sleep(self.shared.options.fallback_delay).await;

        let record = {
            let mut state = self.shared.state.lock().await;
            state.is_deploying = false;
            let Some(current) = state.current.as_mut() else {
                return;
            };
            current.status = STATUS_COMPLETED.to_string();
            current.completed_at = Some(utils::now_iso());
            current.clone()
        };
        self.shared.events.emit(DeploymentEvent::Completed(record));
    }
}

fn push_capped(logs: &mut Vec<LogEntry>, entry: LogEntry, cap: usize) {
    if logs.len() >= cap {
        logs.remove(0);
    }
    logs.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_capped_drops_oldest() {
        let mut logs = Vec::new();
        for i in 0..4 {
            push_capped(&mut logs, LogEntry::info(format!("entry {}", i)), 3);
        }
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].message, "entry 1");
        assert_eq!(logs[2].message, "entry 3");
    }

    #[test]
    fn test_default_options_match_fixed_cadence() {
        let options = OrchestratorOptions::default();
        assert_eq!(options.poll_initial_delay, Duration::from_secs(2));
        assert_eq!(options.poll_interval, Duration::from_secs(3));
        assert_eq!(options.fallback_delay, Duration::from_secs(5));
    }
}
