//! User roles as carried in the credential's claims.
//!
//! The role decoded client-side is advisory: it selects which views the
//! shell offers (e.g., the admin dashboard entry), never whether a call
//! is permitted. The backend authorizes every request independently.

use serde::{Deserialize, Serialize};

/// Role claim carried by the bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserRole {
    /// Regular shopper.
    #[default]
    User,
    /// Store administrator (unlocks the admin dashboard views).
    Admin,
}

impl UserRole {
    /// Whether the admin dashboard views should be offered.
    ///
    /// UI personalization only - this is not an authorization decision.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Admin => write!(f, "Admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" | "user" => Ok(Self::User),
            "Admin" | "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
