//! Grievance lifecycle and SLA-tracking engine.
//!
//! This library is the core of the citizen-governance portal's grievance
//! subsystem:
//! - Submission with automatic priority classification from an external
//!   urgency score
//! - Append-only timeline tracking bound to each grievance
//! - SLA deadline computation and on-demand breach detection
//! - Role-checked status transitions through an explicit state machine
//! - Lifecycle event fan-out to an abstract notification sink
//!
//! The engine is the sole writer of grievance state. Each operation is
//! atomic: the status field and its timeline append become visible
//! together or not at all, enforced by per-record optimistic concurrency
//! in the store.

pub mod classify;
pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod policy;
pub mod scorer;
pub mod sla;
pub mod status;
pub mod store;

// Re-export the types callers need to drive the engine.
pub use classify::classify;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{LifecycleEngine, NewGrievance};
pub use error::{EngineError, EngineResult};
pub use events::{EventBus, GrievanceEvent, NotificationSink, SharedEventBus};
pub use model::{
    Address, AiAnalysis, Attachment, Category, GrievanceId, GrievanceRecord, Location, Priority,
    Resolution, Sla, TimelineEvent,
};
pub use policy::{Role, UserId, UserRef};
pub use scorer::{ScorerError, UrgencyAssessment, UrgencyScorer};
pub use status::Status;
pub use store::{GrievanceFilter, GrievanceStore, SharedGrievanceStore, StoreError, Versioned};
