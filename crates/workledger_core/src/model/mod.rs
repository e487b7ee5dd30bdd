//! Tenant-scoped domain model for the work ledger.
//!
//! # Responsibility
//! - Define canonical records for every ledger entity.
//! - Define the draft shapes accepted by create/update paths and their
//!   attribute validation.
//!
//! # Invariants
//! - Every record except `Job`, `Task`, `ScheduledTodo` and `Staff` is
//!   identified by a stable UUID assigned at creation.
//! - Every scoped record carries exactly one `authority_uuid`, which never
//!   changes after creation.
//! - Timestamps are owned by storage; drafts never carry them.

use serde::{Deserialize, Serialize};

pub mod authority;
pub mod directory;
pub mod project;
pub mod schedule;
pub mod staff;
pub mod status;
pub mod validation;
pub mod work;

/// Creation/update timestamp pair shared by persisted records.
///
/// Values are Unix epoch milliseconds written by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: i64,
    pub updated_at: i64,
}
