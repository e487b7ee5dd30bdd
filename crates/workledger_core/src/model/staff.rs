//! User identities and the staff records wrapping them.
//!
//! # Invariants
//! - Users are global identities; they are not scoped to an authority.
//! - A user has at most one staff record, keyed by the user's id.

use crate::model::authority::AuthorityId;
use crate::model::validation::{require_non_negative, require_text, ValidationError};
use crate::model::Timestamps;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type UserId = Uuid;

const USERNAME_MAX: usize = 150;

/// Login identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    pub username: String,
    /// Whether this person gets project management permissions.
    pub is_project_manager: bool,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub is_project_manager: bool,
}

impl UserDraft {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_project_manager: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("username", &self.username, USERNAME_MAX)
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.username)
    }
}

/// Billing profile of a user inside one authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub user_uuid: UserId,
    pub rate: f64,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffDraft {
    pub user_uuid: UserId,
    pub rate: f64,
}

impl StaffDraft {
    pub fn new(user_uuid: UserId, rate: f64) -> Self {
        Self { user_uuid, rate }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("rate", self.rate)
    }
}
