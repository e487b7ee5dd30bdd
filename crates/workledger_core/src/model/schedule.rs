//! Scheduling ledger: staff work days and todo allocations on them.
//!
//! # Invariants
//! - `hours` and `allocated_hours` are finite and >= 0.
//! - The sum of allocations on one work day never exceeds its `hours`.
//! - A todo is scheduled on at most one work day.

use crate::model::authority::AuthorityId;
use crate::model::staff::UserId;
use crate::model::validation::{require_non_negative, ValidationError};
use crate::model::work::TodoId;
use crate::model::Timestamps;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkDayId = Uuid;

/// Stored `repeat` value for a one-off work day.
pub const NO_REPEAT: i64 = -1;

/// Slack for float drift when summing fractional hours.
const HOURS_TOLERANCE: f64 = 1e-9;

/// Whether `requested` hours do not fit into `available` hours.
///
/// Sums of fractional hours (2.7 + 2.7 + 2.6) drift by a few ulps, so a
/// request that fills the remainder exactly must still fit.
pub fn exceeds_capacity(requested: f64, available: f64) -> bool {
    requested - available > HOURS_TOLERANCE
}

/// Hours a staff member is available on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDay {
    pub uuid: WorkDayId,
    pub staff_uuid: UserId,
    pub date: NaiveDate,
    pub hours: f64,
    /// Opaque repeat marker, [`NO_REPEAT`] by default.
    pub repeat: i64,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkDayDraft {
    pub staff_uuid: UserId,
    pub date: NaiveDate,
    pub hours: f64,
    pub repeat: i64,
}

impl WorkDayDraft {
    pub fn new(staff_uuid: UserId, date: NaiveDate, hours: f64) -> Self {
        Self {
            staff_uuid,
            date,
            hours,
            repeat: NO_REPEAT,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("hours", self.hours)
    }
}

/// Allocation of a todo's time against a work day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTodo {
    pub todo_uuid: TodoId,
    pub work_day_uuid: WorkDayId,
    pub allocated_hours: f64,
    pub authority_uuid: AuthorityId,
}

/// Create/update attributes for [`ScheduledTodo`]; `todo_uuid` is the key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTodoDraft {
    pub todo_uuid: TodoId,
    pub work_day_uuid: WorkDayId,
    pub allocated_hours: f64,
}

impl ScheduledTodoDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_negative("allocated_hours", self.allocated_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::exceeds_capacity;

    #[test]
    fn exact_fill_with_fractional_hours_fits() {
        let available = 8.0 - (2.7 + 2.7);
        assert!(!exceeds_capacity(2.6, available));
        assert!(!exceeds_capacity(0.1 + 0.2, 0.3));
        assert!(exceeds_capacity(2.61, available));
        assert!(exceeds_capacity(0.5, 0.0));
    }
}
