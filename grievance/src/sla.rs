//! SLA policy: deadline computation and breach detection.
//!
//! Both functions are pure; the lifecycle engine invokes them deliberately
//! at creation, on transition, and on demand — never as a side effect of a
//! generic save.

use chrono::{DateTime, Duration, Utc};

use crate::model::Priority;
use crate::status::Status;

/// Hours allowed from creation to resolution, by priority.
pub fn deadline_hours(priority: Priority) -> i64 {
    match priority {
        Priority::Urgent => 24,
        Priority::High => 72,
        Priority::Medium => 120,
        Priority::Low => 168,
    }
}

/// Compute the SLA deadline for a grievance created at `created_at`.
///
/// Deterministic: same inputs always produce the same deadline.
pub fn deadline_for(priority: Priority, created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(deadline_hours(priority))
}

/// Whether the SLA is breached: the grievance is not resolved and the
/// deadline has passed. Rejected grievances remain eligible — the breach
/// flag is historical, not a live obligation.
pub fn is_breached(deadline: DateTime<Utc>, status: Status, now: DateTime<Utc>) -> bool {
    status != Status::Resolved && now > deadline
}

/// Time remaining until the deadline. Zero once resolved or past deadline.
pub fn time_remaining(deadline: DateTime<Utc>, status: Status, now: DateTime<Utc>) -> Duration {
    if status == Status::Resolved {
        return Duration::zero();
    }
    (deadline - now).max(Duration::zero())
}
