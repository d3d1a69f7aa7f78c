//! Core types for grievance records and their timelines.
//!
//! A [`GrievanceRecord`] is the aggregate root: its timeline events live
//! embedded inside it and are never queried independently. The record is
//! created once by submission and mutated only by the lifecycle engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::UserId;
use crate::sla;
use crate::status::Status;

/// Unique identifier for grievances.
pub type GrievanceId = String;

/// Maximum title length in characters.
pub const TITLE_MAX: usize = 100;

/// Maximum description length in characters.
pub const DESCRIPTION_MAX: usize = 1000;

/// Comment recorded on the creation timeline event.
pub const SUBMISSION_COMMENT: &str = "Grievance submitted";

/// Grievance categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Infrastructure,
    PublicServices,
    WelfareSchemes,
    Corruption,
    Administration,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::PublicServices => write!(f, "public-services"),
            Self::WelfareSchemes => write!(f, "welfare-schemes"),
            Self::Corruption => write!(f, "corruption"),
            Self::Administration => write!(f, "administration"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Priority levels, ordered low to urgent.
///
/// The derived `Ord` follows declaration order, so a higher urgency score
/// never classifies to a lower variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

/// Structured postal address within a jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub village: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
}

/// Geographic point plus structured address. Coordinates are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
    pub address: Address,
}

/// A file attached to the grievance at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Result of the external urgency/sentiment analysis, captured once at
/// creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub sentiment: String,
    pub urgency_score: f64,
    pub recommended_actions: Vec<String>,
}

/// SLA sub-document: deadline fixed at creation, breach flag is a one-way
/// latch (false → true, never back).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    pub deadline: DateTime<Utc>,
    pub is_breached: bool,
}

/// Populated only on transition to `Resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: UserId,
    pub resolved_at: DateTime<Utc>,
    pub comment: String,
    /// Satisfaction rating from the submitter, 1–5, collected later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_rating: Option<u8>,
}

/// A single entry in the append-only status timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub status: Status,
    pub comment: String,
    pub updated_by: UserId,
    pub updated_at: DateTime<Utc>,
}

/// The grievance aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrievanceRecord {
    /// Unique identifier, assigned at creation, immutable.
    pub id: GrievanceId,

    pub title: String,
    pub description: String,
    pub category: Category,

    /// Set once at creation by the classifier, immutable thereafter.
    pub priority: Priority,

    /// Governed by the status state machine.
    pub status: Status,

    pub location: Location,

    /// The user who filed the grievance, immutable.
    pub submitter: UserId,

    /// Official handling the grievance, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,

    /// Files attached at submission.
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,

    pub sla: Sla,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// Append-only status history. Always holds at least the creation event.
    pub timeline: Vec<TimelineEvent>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GrievanceRecord {
    /// Build a freshly submitted record with status `Pending`, the SLA
    /// deadline derived from `priority`, and the single creation timeline
    /// event.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        description: String,
        category: Category,
        location: Location,
        submitter: UserId,
        attachments: Vec<Attachment>,
        ai_analysis: Option<AiAnalysis>,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            category,
            priority,
            status: Status::Pending,
            location,
            submitter: submitter.clone(),
            assignee: None,
            attachments,
            ai_analysis,
            sla: Sla {
                deadline: sla::deadline_for(priority, now),
                is_breached: false,
            },
            resolution: None,
            timeline: vec![TimelineEvent {
                status: Status::Pending,
                comment: SUBMISSION_COMMENT.to_string(),
                updated_by: submitter,
                updated_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    /// Status recorded by the most recent timeline event.
    ///
    /// After any successful engine operation this equals `self.status`.
    pub fn latest_timeline_status(&self) -> Status {
        self.timeline
            .last()
            .map(|e| e.status)
            .unwrap_or(self.status)
    }

    /// Time remaining until the SLA deadline. Zero once resolved or once
    /// the deadline has passed.
    pub fn sla_time_remaining(&self, now: DateTime<Utc>) -> Duration {
        sla::time_remaining(self.sla.deadline, self.status, now)
    }
}
