//! Priority classification from an externally supplied urgency score.

use crate::model::Priority;

/// Map an urgency score in `[0, 1]` to a priority level.
///
/// Thresholds are strict lower bounds: a score of exactly 0.8 classifies
/// as `High`, not `Urgent`. The caller is expected to clamp the score
/// before calling; values outside `[0, 1]` still classify sensibly.
pub fn classify(urgency_score: f64) -> Priority {
    if urgency_score > 0.8 {
        Priority::Urgent
    } else if urgency_score > 0.6 {
        Priority::High
    } else if urgency_score > 0.4 {
        Priority::Medium
    } else {
        Priority::Low
    }
}
