//! Orchestrator integration tests
//!
//! Drives the deployment state machine against a scripted platform fake
//! under paused tokio time, so the fixed poll cadence and fallback delay
//! run instantly and deterministically.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::assert_ok;
use tokio::sync::broadcast;
use tokio::sync::Mutex;

use slipway::deploy::orchestrator::{Orchestrator, OrchestratorOptions};
use slipway::errors::SlipwayError;
use slipway::events::bus::{DeploymentEvent, EventBus};
use slipway::http::client::{JobIdentity, PlatformApi, RemoteDeployment, WebhookPayload};
use slipway::storage::layout::StorageLayout;
use slipway::storage::settings::DeploySettings;
use slipway::storage::store::SettingsStore;

struct FakePlatform {
    identity: JobIdentity,
    webhook_failure: Option<String>,
    poll_results: Mutex<VecDeque<Result<RemoteDeployment, SlipwayError>>>,
    webhook_calls: AtomicUsize,
    poll_calls: AtomicUsize,
}

impl FakePlatform {
    fn new(identity: JobIdentity) -> Self {
        Self {
            identity,
            webhook_failure: None,
            poll_results: Mutex::new(VecDeque::new()),
            webhook_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
        }
    }

    fn failing_webhook(message: &str) -> Self {
        Self {
            webhook_failure: Some(message.to_string()),
            ..Self::new(JobIdentity::default())
        }
    }

    fn with_poll_results(
        self,
        results: Vec<Result<RemoteDeployment, SlipwayError>>,
    ) -> Self {
        Self {
            poll_results: Mutex::new(results.into()),
            ..self
        }
    }

    fn webhook_calls(&self) -> usize {
        self.webhook_calls.load(Ordering::SeqCst)
    }

    fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformApi for FakePlatform {
    async fn trigger_webhook(
        &self,
        _webhook_url: &str,
        _payload: &WebhookPayload,
    ) -> Result<JobIdentity, SlipwayError> {
        self.webhook_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.webhook_failure {
            return Err(SlipwayError::UpstreamError(message.clone()));
        }
        Ok(self.identity.clone())
    }

    async fn latest_deployment(
        &self,
        _token: &str,
        _project_id: &str,
        _team_id: Option<&str>,
    ) -> Result<RemoteDeployment, SlipwayError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.poll_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(SlipwayError::UpstreamError(
                    "no scripted poll result".to_string(),
                ))
            })
    }
}

fn identity(id: &str) -> JobIdentity {
    JobIdentity {
        id: Some(id.to_string()),
        url: Some(format!("{}.example.app", id)),
    }
}

fn remote(status: &str) -> RemoteDeployment {
    RemoteDeployment {
        state: Some(status.to_string()),
        ready_state: None,
        url: None,
    }
}

fn full_settings() -> DeploySettings {
    DeploySettings {
        webhook_url: "https://hooks.example.com/deploy/abc".to_string(),
        api_token: "tok_123".to_string(),
        project_id: "prj_1".to_string(),
        ..Default::default()
    }
}

fn webhook_only_settings() -> DeploySettings {
    DeploySettings {
        webhook_url: "https://hooks.example.com/deploy/abc".to_string(),
        ..Default::default()
    }
}

struct Harness {
    orchestrator: Orchestrator,
    platform: Arc<FakePlatform>,
    events: EventBus,
    _dir: tempfile::TempDir,
}

async fn setup(platform: FakePlatform, settings: Option<DeploySettings>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let layout = StorageLayout::new(dir.path());
    let store = Arc::new(SettingsStore::new(&layout, "test"));
    if let Some(settings) = settings {
        store.set(settings).await.unwrap();
    }

    let events = EventBus::new(64);
    let platform = Arc::new(platform);
    let orchestrator = Orchestrator::new(
        platform.clone(),
        store,
        events.clone(),
        OrchestratorOptions::default(),
    );

    Harness {
        orchestrator,
        platform,
        events,
        _dir: dir,
    }
}

fn drain_kinds(rx: &mut broadcast::Receiver<DeploymentEvent>) -> Vec<&'static str> {
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind());
    }
    kinds
}

#[tokio::test(start_paused = true)]
async fn second_trigger_while_in_flight_is_rejected() {
    let platform = FakePlatform::new(identity("dpl_1"))
        .with_poll_results((0..10).map(|_| Ok(remote("QUEUED"))).collect());
    let harness = setup(platform, Some(full_settings())).await;

    let first = harness.orchestrator.trigger().await.unwrap();
    let second = harness.orchestrator.trigger().await;

    assert!(matches!(second, Err(SlipwayError::ConflictError)));
    // The rejected trigger never reaches the webhook or the record
    assert_eq!(harness.platform.webhook_calls(), 1);
    let status = harness.orchestrator.status().await;
    assert!(status.is_deploying);
    assert_eq!(status.current_deployment.unwrap().id, first.id);

    harness.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_admit_exactly_one() {
    let platform = FakePlatform::new(JobIdentity::default());
    let harness = setup(platform, Some(webhook_only_settings())).await;

    let (first, second) =
        tokio::join!(harness.orchestrator.trigger(), harness.orchestrator.trigger());

    assert_eq!(
        [&first, &second].iter().filter(|r| r.is_ok()).count(),
        1,
        "exactly one of two racing triggers may win"
    );
    assert_eq!(harness.platform.webhook_calls(), 1);

    harness.orchestrator.shutdown().await;
}

#[tokio::test]
async fn trigger_without_webhook_url_is_config_error() {
    let platform = FakePlatform::new(identity("dpl_1"));
    let harness = setup(platform, None).await;
    let mut rx = harness.events.subscribe();

    let result = harness.orchestrator.trigger().await;

    assert!(matches!(result, Err(SlipwayError::ConfigError(_))));
    // Rejected before any network call and without touching state
    assert_eq!(harness.platform.webhook_calls(), 0);
    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    assert!(status.current_deployment.is_none());
    assert!(drain_kinds(&mut rx).is_empty());
}

#[tokio::test]
async fn webhook_failure_discards_record_and_emits_failed() {
    let platform = FakePlatform::failing_webhook("deploy hook returned 500");
    let harness = setup(platform, Some(webhook_only_settings())).await;
    let mut rx = harness.events.subscribe();

    let result = harness.orchestrator.trigger().await;

    match result {
        Err(SlipwayError::UpstreamError(message)) => assert!(message.contains("500")),
        other => panic!("expected upstream error, got {:?}", other.map(|r| r.id)),
    }
    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    assert!(status.current_deployment.is_none());
    assert_eq!(drain_kinds(&mut rx), vec!["started", "failed"]);
}

#[tokio::test(start_paused = true)]
async fn fallback_completes_after_fixed_delay_without_polling() {
    // A remote id alone is not enough: without credentials the poller
    // must never start.
    let platform = FakePlatform::new(identity("dpl_1"));
    let harness = setup(platform, Some(webhook_only_settings())).await;
    let mut rx = harness.events.subscribe();

    let record = tokio_test::assert_ok!(harness.orchestrator.trigger().await);
    assert_eq!(record.status, "pending");
    assert_eq!(record.remote_id.as_deref(), Some("dpl_1"));

    tokio::time::sleep(Duration::from_secs(6)).await;

    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    let current = status.current_deployment.unwrap();
    assert_eq!(current.status, "completed");
    assert!(current.completed_at.is_some());
    assert_eq!(harness.platform.poll_calls(), 0);
    assert_eq!(drain_kinds(&mut rx), vec!["started", "completed"]);
}

#[tokio::test(start_paused = true)]
async fn fallback_when_webhook_gives_no_identity() {
    let platform = FakePlatform::new(JobIdentity::default());
    let harness = setup(platform, Some(full_settings())).await;

    let record = harness.orchestrator.trigger().await.unwrap();
    assert!(record.remote_id.is_none());

    tokio::time::sleep(Duration::from_secs(6)).await;

    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    assert_eq!(status.current_deployment.unwrap().status, "completed");
    assert_eq!(harness.platform.poll_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn poll_sequence_terminates_on_ready() {
    let ready = RemoteDeployment {
        state: Some("READY".to_string()),
        ready_state: None,
        url: Some("myapp.example.app".to_string()),
    };
    let platform = FakePlatform::new(identity("dpl_1")).with_poll_results(vec![
        Ok(remote("pending")),
        Ok(remote("building")),
        Ok(ready),
    ]);
    let harness = setup(platform, Some(full_settings())).await;
    let mut rx = harness.events.subscribe();

    harness.orchestrator.trigger().await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    // pending -> building -> READY is exactly three ticks
    assert_eq!(harness.platform.poll_calls(), 3);
    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    let current = status.current_deployment.unwrap();
    assert_eq!(current.status, "READY");
    assert!(current.completed_at.is_some());
    // The terminal tick refreshed the remote URL
    assert_eq!(current.remote_url.as_deref(), Some("https://myapp.example.app"));

    let messages: Vec<&str> = status.logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Deployment status: pending",
            "Deployment status: building",
            "Deployment status: READY",
        ]
    );

    assert_eq!(
        drain_kinds(&mut rx),
        vec!["started", "status", "status", "status", "completed"]
    );

    // No further ticks are scheduled after the terminal state
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(harness.platform.poll_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn poll_404_soft_completes_with_warning() {
    let platform = FakePlatform::new(identity("dpl_1")).with_poll_results(vec![Err(
        SlipwayError::NotFound("project or deployment unknown".to_string()),
    )]);
    let harness = setup(platform, Some(full_settings())).await;
    let mut rx = harness.events.subscribe();

    harness.orchestrator.trigger().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    let current = status.current_deployment.unwrap();
    assert_eq!(current.status, "completed");
    assert!(current.completed_at.is_some());

    let warnings: Vec<_> = status
        .logs
        .iter()
        .filter(|l| l.kind == slipway::deploy::record::LogKind::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(status.logs.len(), 1);

    // Degraded success, not failure
    assert_eq!(drain_kinds(&mut rx), vec!["started", "completed"]);
}

#[tokio::test(start_paused = true)]
async fn poll_error_fails_the_deployment() {
    let platform = FakePlatform::new(identity("dpl_1")).with_poll_results(vec![
        Ok(remote("pending")),
        Err(SlipwayError::UpstreamError(
            "status API returned 500".to_string(),
        )),
    ]);
    let harness = setup(platform, Some(full_settings())).await;
    let mut rx = harness.events.subscribe();

    harness.orchestrator.trigger().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(harness.platform.poll_calls(), 2);
    let status = harness.orchestrator.status().await;
    assert!(!status.is_deploying);
    // The record keeps its last observed status; failure is visible
    // through the cleared guard and the failed event.
    let current = status.current_deployment.unwrap();
    assert_eq!(current.status, "pending");
    assert!(current.completed_at.is_none());
    assert_eq!(drain_kinds(&mut rx), vec!["started", "status", "failed"]);
}

#[tokio::test(start_paused = true)]
async fn logs_reset_at_each_trigger_and_accumulate_within_one() {
    let platform = FakePlatform::new(identity("dpl_1")).with_poll_results(vec![
        Err(SlipwayError::NotFound("unknown project".to_string())),
        Ok(remote("READY")),
    ]);
    let harness = setup(platform, Some(full_settings())).await;

    // First deployment ends with a soft-404 warning log
    harness.orchestrator.trigger().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    let status = harness.orchestrator.status().await;
    assert_eq!(status.logs.len(), 1);
    assert_eq!(status.logs[0].kind, slipway::deploy::record::LogKind::Warning);

    // Second deployment starts from an empty log sequence
    harness.orchestrator.trigger().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    let status = harness.orchestrator.status().await;
    let messages: Vec<&str> = status.logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(messages, vec!["Deployment status: READY"]);
    assert!(!status.is_deploying);
}
