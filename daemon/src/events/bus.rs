//! Event bus for deployment progress fan-out

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::deploy::record::{DeploymentRecord, LogEntry};

/// A deployment progress event pushed to live observers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum DeploymentEvent {
    /// A deployment was triggered; carries the pending record
    Started(DeploymentRecord),

    /// A poll tick observed the remote state
    Status {
        deployment: DeploymentRecord,
        logs: Vec<LogEntry>,
    },

    /// The deployment reached a terminal state
    Completed(DeploymentRecord),

    /// The deployment failed
    Failed { error: String },
}

impl DeploymentEvent {
    /// Event kind as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            DeploymentEvent::Started(_) => "started",
            DeploymentEvent::Status { .. } => "status",
            DeploymentEvent::Completed(_) => "completed",
            DeploymentEvent::Failed { .. } => "failed",
        }
    }
}

/// Best-effort broadcast bus for deployment events.
///
/// Observers subscribe for a live feed; delivery is not acknowledged and
/// slow observers may miss events. Late joiners recover current state via
/// the status query interface.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeploymentEvent>,
}

impl EventBus {
    /// Create a bus with the given per-observer buffer capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all currently connected observers
    pub fn emit(&self, event: DeploymentEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(count) => trace!("Emitted {} event to {} observer(s)", kind, count),
            Err(_) => debug!("No observers connected for {} event", kind),
        }
    }

    /// Subscribe for the live event feed
    pub fn subscribe(&self) -> broadcast::Receiver<DeploymentEvent> {
        self.sender.subscribe()
    }

    /// Number of currently subscribed observers
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_observers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.emit(DeploymentEvent::Failed {
            error: "nobody listening".to_string(),
        });
        assert_eq!(bus.observer_count(), 0);
    }

    #[tokio::test]
    async fn test_all_observers_receive_events() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(DeploymentEvent::Failed {
            error: "boom".to_string(),
        });

        assert_eq!(first.recv().await.unwrap().kind(), "failed");
        assert_eq!(second.recv().await.unwrap().kind(), "failed");
    }

    #[test]
    fn test_event_wire_format() {
        let record = DeploymentRecord::started_now();
        let frame = serde_json::to_value(DeploymentEvent::Started(record.clone())).unwrap();
        assert_eq!(frame["event"], "started");
        assert_eq!(frame["data"]["status"], "pending");

        let frame = serde_json::to_value(DeploymentEvent::Status {
            deployment: record,
            logs: vec![LogEntry::info("Deployment status: BUILDING")],
        })
        .unwrap();
        assert_eq!(frame["event"], "status");
        assert_eq!(frame["data"]["logs"][0]["type"], "info");

        let frame = serde_json::to_value(DeploymentEvent::Failed {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(frame["event"], "failed");
        assert_eq!(frame["data"]["error"], "boom");
    }
}
