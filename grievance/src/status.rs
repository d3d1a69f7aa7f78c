//! Grievance status state machine — explicit states and legal transition guards.
//!
//! Every grievance starts at `Pending` and terminates at either `Resolved`
//! or `Rejected`. The lifecycle engine calls [`is_legal_transition`] before
//! applying any status update, so illegal edges never reach the store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The set of grievance statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    /// Submitted, awaiting review by an official.
    Pending,
    /// An official has picked it up.
    InProgress,
    /// Closed with a resolution — terminal state.
    Resolved,
    /// Closed without action — terminal state.
    Rejected,
}

impl Status {
    /// Whether this is a terminal status (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Resolved => write!(f, "resolved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Legal transitions between grievance statuses.
///
/// The transition table encodes the valid edges in the status graph:
/// ```text
/// Pending → InProgress | Resolved | Rejected
/// InProgress → Resolved | Rejected
/// ```
/// An official may resolve or reject directly from `Pending` without an
/// intermediate `InProgress` step. Nothing leaves a terminal status.
pub fn is_legal_transition(from: Status, to: Status) -> bool {
    use Status::*;

    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Resolved)
            | (Pending, Rejected)
            | (InProgress, Resolved)
            | (InProgress, Rejected)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Resolved,
        Status::Rejected,
    ];

    #[test]
    fn test_terminal_states() {
        assert!(!Status::Pending.is_terminal());
        assert!(!Status::InProgress.is_terminal());
        assert!(Status::Resolved.is_terminal());
        assert!(Status::Rejected.is_terminal());
    }

    #[test]
    fn test_full_transition_matrix() {
        let legal = [
            (Status::Pending, Status::InProgress),
            (Status::Pending, Status::Resolved),
            (Status::Pending, Status::Rejected),
            (Status::InProgress, Status::Resolved),
            (Status::InProgress, Status::Rejected),
        ];

        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    is_legal_transition(from, to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_nothing_leaves_terminal() {
        for from in [Status::Resolved, Status::Rejected] {
            for to in ALL {
                assert!(!is_legal_transition(from, to));
            }
        }
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Status::InProgress).unwrap(),
            "\"in-progress\""
        );
        let parsed: Status = serde_json::from_str("\"resolved\"").unwrap();
        assert_eq!(parsed, Status::Resolved);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::InProgress.to_string(), "in-progress");
        assert_eq!(Status::Pending.to_string(), "pending");
    }
}
