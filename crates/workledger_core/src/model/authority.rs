//! Authority (tenant scope token) model.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another authority.
//! - An authority validates writes only while active and not past
//!   `expires_at` (the expiry day itself is still valid).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Tenant root identifier.
pub type AuthorityId = Uuid;

/// Tenant/scope token; root of the ownership graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub uuid: AuthorityId,
    pub expires_at: NaiveDate,
    pub is_active: bool,
}

impl Authority {
    /// Creates an authority with a generated stable ID.
    pub fn new(expires_at: NaiveDate, is_active: bool) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            expires_at,
            is_active,
        }
    }

    /// Returns whether writes scoped to this authority are permitted at `at`.
    pub fn is_valid(&self, at: NaiveDate) -> bool {
        self.is_active && at <= self.expires_at
    }
}

impl Display for Authority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uuid)
    }
}
