//! Lifecycle events and the notification fan-out seam.
//!
//! The engine emits events to an abstract [`NotificationSink`]; the sink's
//! own connection registry and delivery mechanism live outside this core.
//! Delivery is fire-and-forget: a sink failure never rolls back or blocks
//! the grievance state change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::model::{Category, GrievanceId, Priority};
use crate::policy::UserId;
use crate::status::Status;

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 256;

/// All grievance lifecycle events.
///
/// Each variant carries enough routing information for the sink to select
/// recipients: jurisdiction for officials, submitter id for citizens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrievanceEvent {
    /// A new grievance was submitted; officials of the jurisdiction should
    /// be notified.
    GrievanceSubmitted {
        grievance_id: GrievanceId,
        priority: Priority,
        category: Category,
        village: String,
        district: String,
        timestamp: DateTime<Utc>,
    },

    /// A grievance changed status; the original submitter should be
    /// notified.
    StatusChanged {
        grievance_id: GrievanceId,
        submitter: UserId,
        from: Status,
        to: Status,
        comment: String,
        timestamp: DateTime<Utc>,
    },

    /// A grievance's SLA deadline passed while it was unresolved.
    /// Emitted once, on the false→true latch edge.
    SlaBreached {
        grievance_id: GrievanceId,
        deadline: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
}

impl GrievanceEvent {
    /// Event kind as a stable string, for logging and filtering.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GrievanceSubmitted { .. } => "grievance_submitted",
            Self::StatusChanged { .. } => "status_changed",
            Self::SlaBreached { .. } => "sla_breached",
        }
    }

    /// Grievance this event concerns.
    pub fn grievance_id(&self) -> &str {
        match self {
            Self::GrievanceSubmitted { grievance_id, .. }
            | Self::StatusChanged { grievance_id, .. }
            | Self::SlaBreached { grievance_id, .. } => grievance_id,
        }
    }

    /// When the event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::GrievanceSubmitted { timestamp, .. }
            | Self::StatusChanged { timestamp, .. }
            | Self::SlaBreached { timestamp, .. } => *timestamp,
        }
    }
}

/// Receives lifecycle events. At-most-best-effort; no acknowledgement.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: GrievanceEvent);
}

/// Shared reference to an event bus.
pub type SharedEventBus = Arc<EventBus>;

/// Notification sink backed by a Tokio broadcast channel.
///
/// Subscribers (websocket hubs, mailers, test probes) attach via
/// [`EventBus::subscribe`]; having no subscribers is not an error.
pub struct EventBus {
    sender: broadcast::Sender<GrievanceEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this bus.
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<GrievanceEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for EventBus {
    fn notify(&self, event: GrievanceEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(count) => debug!(kind, receivers = count, "Event published"),
            // No receivers is OK — delivery is best-effort.
            Err(_) => debug!(kind, "Event published (no receivers)"),
        }
    }
}
