//! Work item graph: todos and their job/task specializations.
//!
//! # Responsibility
//! - Define the base assignable work record (`Todo`).
//! - Define the 1:1 specializations keyed by the todo id (`Job`, `Task`).
//!
//! # Invariants
//! - `estimated_time` and `logged_time` are finite and >= 0.
//! - A job/task cannot outlive its todo.
//! - A todo being a job and a task at once is not prevented.

use crate::model::authority::AuthorityId;
use crate::model::project::ProjectId;
use crate::model::staff::UserId;
use crate::model::status::StatusId;
use crate::model::validation::{require_non_negative, require_text, ValidationError};
use crate::model::Timestamps;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TodoId = Uuid;

const REFERENCE_CODE_MAX: usize = 20;
const TITLE_MAX: usize = 140;
const DESCRIPTION_MAX: usize = 255;

/// Base unit of assignable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub uuid: TodoId,
    pub reference_code: String,
    pub title: String,
    pub description: String,
    /// Hours.
    pub estimated_time: f64,
    /// Hours.
    pub logged_time: f64,
    /// Staff user id; cleared when the staff record is deleted.
    pub assigned_to: Option<UserId>,
    /// Epoch milliseconds.
    pub deadline: Option<i64>,
    /// Cleared when the status is deleted.
    pub status_uuid: Option<StatusId>,
    pub authority_uuid: AuthorityId,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

/// Create/update attributes for [`Todo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoDraft {
    pub reference_code: String,
    pub title: String,
    pub description: String,
    pub estimated_time: f64,
    pub logged_time: f64,
    pub assigned_to: Option<UserId>,
    pub deadline: Option<i64>,
    pub status_uuid: Option<StatusId>,
}

impl TodoDraft {
    /// Creates an unassigned draft with zero estimated/logged time.
    pub fn new(reference_code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            reference_code: reference_code.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("reference_code", &self.reference_code, REFERENCE_CODE_MAX)?;
        require_text("title", &self.title, TITLE_MAX)?;
        if self.description.chars().count() > DESCRIPTION_MAX {
            return Err(ValidationError::TooLong {
                field: "description",
                max_chars: DESCRIPTION_MAX,
            });
        }
        require_non_negative("estimated_time", self.estimated_time)?;
        require_non_negative("logged_time", self.logged_time)
    }
}

impl From<&Todo> for TodoDraft {
    fn from(todo: &Todo) -> Self {
        Self {
            reference_code: todo.reference_code.clone(),
            title: todo.title.clone(),
            description: todo.description.clone(),
            estimated_time: todo.estimated_time,
            logged_time: todo.logged_time,
            assigned_to: todo.assigned_to,
            deadline: todo.deadline,
            status_uuid: todo.status_uuid,
        }
    }
}

impl Display for Todo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reference_code, self.title)
    }
}

/// Todo specialization scoped to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub todo_uuid: TodoId,
    pub project_uuid: ProjectId,
    pub authority_uuid: AuthorityId,
}

/// Create/update attributes for [`Job`]; `todo_uuid` is the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub todo_uuid: TodoId,
    pub project_uuid: ProjectId,
}

/// Todo specialization scoped to a job. `job_uuid` is the job's todo id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub todo_uuid: TodoId,
    pub job_uuid: TodoId,
    pub authority_uuid: AuthorityId,
}

/// Create/update attributes for [`Task`]; `todo_uuid` is the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub todo_uuid: TodoId,
    pub job_uuid: TodoId,
}

/// Job joined with its base todo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub job: Job,
    pub todo: Todo,
}

/// Task joined with its base todo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task: Task,
    pub todo: Todo,
}
