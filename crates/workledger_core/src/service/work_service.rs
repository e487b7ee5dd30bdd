//! Work item use-case service.
//!
//! # Responsibility
//! - Create jobs and tasks together with their base todo.
//! - Log time and change assignment/status of a todo.
//!
//! # Invariants
//! - Partial todo changes re-use the stored attributes for every other
//!   field, so a reassignment never resets logged time.

use crate::integrity::scope::Scope;
use crate::model::project::ProjectId;
use crate::model::staff::UserId;
use crate::model::status::StatusId;
use crate::model::work::{JobDetail, TaskDetail, Todo, TodoDraft, TodoId};
use crate::repo::work_repo::WorkRepository;
use crate::repo::RepoResult;

/// Use-case service wrapper for work items.
pub struct WorkService<R: WorkRepository> {
    repo: R,
}

impl<R: WorkRepository> WorkService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a todo and its job under `project` in one transaction.
    pub fn create_job(
        &self,
        scope: &Scope,
        todo: &TodoDraft,
        project: ProjectId,
    ) -> RepoResult<JobDetail> {
        self.repo.create_job_with_todo(scope, todo, project)
    }

    /// Creates a todo and its task under `job` in one transaction.
    pub fn create_task(
        &self,
        scope: &Scope,
        todo: &TodoDraft,
        job: TodoId,
    ) -> RepoResult<TaskDetail> {
        self.repo.create_task_with_todo(scope, todo, job)
    }

    /// Adds `hours` to the todo's logged time.
    ///
    /// # Errors
    /// - `Validation` when the total would drop below zero.
    pub fn log_time(&self, scope: &Scope, todo: TodoId, hours: f64) -> RepoResult<Todo> {
        self.repo.log_time(scope, todo, hours)
    }

    /// Assigns the todo to a staff member, or clears the assignment.
    pub fn assign(&self, scope: &Scope, todo: TodoId, staff: Option<UserId>) -> RepoResult<Todo> {
        let current = self.repo.get_todo(scope, todo)?;
        let mut draft = TodoDraft::from(&current);
        draft.assigned_to = staff;
        self.repo.update_todo(scope, todo, &draft)
    }

    /// Sets or clears the todo's status.
    pub fn set_status(
        &self,
        scope: &Scope,
        todo: TodoId,
        status: Option<StatusId>,
    ) -> RepoResult<Todo> {
        let current = self.repo.get_todo(scope, todo)?;
        let mut draft = TodoDraft::from(&current);
        draft.status_uuid = status;
        self.repo.update_todo(scope, todo, &draft)
    }
}
