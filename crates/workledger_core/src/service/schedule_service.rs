//! Scheduling use-case service.
//!
//! # Responsibility
//! - Report free capacity of a work day.
//! - Book, move and drop todo allocations.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::scope::Scope;
use crate::model::schedule::{ScheduledTodo, ScheduledTodoDraft, WorkDayId};
use crate::model::work::TodoId;
use crate::repo::schedule_repo::ScheduleRepository;
use crate::repo::RepoResult;

/// Use-case service wrapper for the scheduling ledger.
pub struct ScheduleService<R: ScheduleRepository> {
    repo: R,
}

impl<R: ScheduleRepository> ScheduleService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Hours of the work day not yet allocated to any todo.
    pub fn remaining_hours(&self, scope: &Scope, work_day: WorkDayId) -> RepoResult<f64> {
        let day = self.repo.get_work_day(scope, work_day)?;
        let allocated = self.repo.allocated_hours(scope, work_day)?;
        Ok(day.hours - allocated)
    }

    /// Books `hours` of the todo on the work day.
    ///
    /// # Errors
    /// - `Conflict` when the todo is already scheduled.
    /// - `Validation` when the day lacks capacity.
    pub fn schedule_todo(
        &self,
        scope: &Scope,
        todo: TodoId,
        work_day: WorkDayId,
        hours: f64,
    ) -> RepoResult<ScheduledTodo> {
        self.repo.create_scheduled_todo(
            scope,
            &ScheduledTodoDraft {
                todo_uuid: todo,
                work_day_uuid: work_day,
                allocated_hours: hours,
            },
        )
    }

    /// Moves an existing allocation to another day, keeping its hours.
    pub fn reschedule(
        &self,
        scope: &Scope,
        todo: TodoId,
        work_day: WorkDayId,
    ) -> RepoResult<ScheduledTodo> {
        let current = self.repo.get_scheduled_todo(scope, todo)?;
        self.repo.update_scheduled_todo(
            scope,
            &ScheduledTodoDraft {
                todo_uuid: todo,
                work_day_uuid: work_day,
                allocated_hours: current.allocated_hours,
            },
        )
    }

    pub fn unschedule(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport> {
        self.repo.delete_scheduled_todo(scope, todo)
    }
}
