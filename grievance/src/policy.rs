//! Role-based authorization policy for lifecycle operations.
//!
//! The engine consults a single explicit matrix here instead of scattering
//! permission checks across transport middleware. The acting user arrives
//! already authenticated; only the role decides what it may do.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for users (submitters, officials, admins).
pub type UserId = String;

/// Roles recognised by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// A citizen filing grievances.
    Villager,
    /// A local-government official handling grievances.
    PanchayatOfficial,
    /// A portal administrator.
    Admin,
}

impl Role {
    /// Whether this role may change a grievance's status.
    ///
    /// Submitters never update status; only officials and admins do.
    pub fn can_transition(self) -> bool {
        matches!(self, Self::PanchayatOfficial | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Villager => write!(f, "villager"),
            Self::PanchayatOfficial => write!(f, "panchayat-official"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// An already-authenticated acting user, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub role: Role,
}

impl UserRef {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}
