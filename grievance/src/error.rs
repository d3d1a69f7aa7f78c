//! Error taxonomy for lifecycle operations.

use crate::model::GrievanceId;
use crate::policy::Role;
use crate::status::Status;
use crate::store::StoreError;

/// Errors surfaced by the lifecycle engine.
///
/// Every rejected operation leaves the record in its prior, fully
/// consistent state; none of these indicate a half-applied change.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed or missing required input. Surfaced with the specific
    /// field message; never retried automatically.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced grievance does not exist.
    #[error("grievance not found: {0}")]
    NotFound(GrievanceId),

    /// The acting user's role forbids the operation.
    #[error("role {role} is not authorized to {action}")]
    Authorization { role: Role, action: &'static str },

    /// The requested status change is not a legal edge from the current
    /// state.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },

    /// Optimistic-concurrency check failed. The caller may retry against
    /// fresh state; the engine does not auto-retry.
    #[error("concurrent update conflict on grievance {0}")]
    Conflict(GrievanceId),

    /// A collaborator failed in a way the engine could not recover from.
    #[error("dependency failure: {0}")]
    Dependency(String),
}

/// Result type for lifecycle operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// HTTP-equivalent status code for the abstract API surface.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidTransition { .. } => 400,
            Self::Authorization { .. } => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Dependency(_) => 502,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::VersionConflict { id, .. } => Self::Conflict(id),
            StoreError::DuplicateId(id) => Self::Conflict(id),
            StoreError::LockPoisoned => Self::Dependency("store lock poisoned".to_string()),
        }
    }
}
