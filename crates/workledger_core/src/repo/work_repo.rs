//! Work item repository: todos, jobs and tasks.
//!
//! # Responsibility
//! - CRUD over todos and their 1:1 job/task specializations.
//! - Composite create of a todo together with its job or task.
//!
//! # Invariants
//! - A todo has at most one job row and at most one task row.
//! - Jobs, tasks and their todos always share one authority.
//! - Composite creates are all-or-nothing.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{
    ensure_optional_reference, ensure_reference, require_writable, Scope,
};
use crate::model::project::ProjectId;
use crate::model::staff::UserId;
use crate::model::status::StatusId;
use crate::model::validation::require_non_negative;
use crate::model::work::{
    Job, JobDetail, JobDraft, Task, TaskDetail, TaskDraft, Todo, TodoDraft, TodoId,
};
use crate::repo::{
    delete_scoped, ensure_connection_ready, push_uuid_filter, read_optional_uuid,
    read_timestamps, read_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const TODO_SELECT_SQL: &str = "SELECT
    uuid,
    reference_code,
    title,
    description,
    estimated_time,
    logged_time,
    assigned_to,
    deadline,
    status_uuid,
    authority_uuid,
    created_at,
    updated_at
FROM todos";
const JOB_SELECT_SQL: &str = "SELECT todo_uuid, project_uuid, authority_uuid FROM jobs";
const TASK_SELECT_SQL: &str = "SELECT todo_uuid, job_uuid, authority_uuid FROM tasks";

/// Exact-match filters for todo listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoListQuery {
    pub assigned_to: Option<UserId>,
    pub status_uuid: Option<StatusId>,
}

/// Exact-match filters for job listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobListQuery {
    pub project_uuid: Option<ProjectId>,
}

/// Exact-match filters for task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub job_uuid: Option<TodoId>,
}

pub trait WorkRepository {
    fn create_todo(&self, scope: &Scope, draft: &TodoDraft) -> RepoResult<Todo>;
    fn get_todo(&self, scope: &Scope, id: TodoId) -> RepoResult<Todo>;
    fn list_todos(&self, scope: &Scope, query: &TodoListQuery) -> RepoResult<Vec<Todo>>;
    fn update_todo(&self, scope: &Scope, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo>;
    /// Adds `hours` (may be negative for corrections) to `logged_time`.
    fn log_time(&self, scope: &Scope, id: TodoId, hours: f64) -> RepoResult<Todo>;
    /// Job, task and scheduled allocation of the todo are deleted with it.
    fn delete_todo(&self, scope: &Scope, id: TodoId) -> RepoResult<DeleteReport>;

    /// Fails with `Conflict` when the todo already is a job.
    fn create_job(&self, scope: &Scope, draft: &JobDraft) -> RepoResult<Job>;
    fn create_job_with_todo(
        &self,
        scope: &Scope,
        todo: &TodoDraft,
        project: ProjectId,
    ) -> RepoResult<JobDetail>;
    fn get_job(&self, scope: &Scope, todo: TodoId) -> RepoResult<Job>;
    fn get_job_detail(&self, scope: &Scope, todo: TodoId) -> RepoResult<JobDetail>;
    fn list_jobs(&self, scope: &Scope, query: &JobListQuery) -> RepoResult<Vec<Job>>;
    /// Moves the job keyed by `draft.todo_uuid` to another project.
    fn update_job(&self, scope: &Scope, draft: &JobDraft) -> RepoResult<Job>;
    /// Deletes the job row and its tasks; the base todo stays.
    fn delete_job(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport>;

    /// Fails with `Conflict` when the todo already is a task.
    fn create_task(&self, scope: &Scope, draft: &TaskDraft) -> RepoResult<Task>;
    fn create_task_with_todo(
        &self,
        scope: &Scope,
        todo: &TodoDraft,
        job: TodoId,
    ) -> RepoResult<TaskDetail>;
    fn get_task(&self, scope: &Scope, todo: TodoId) -> RepoResult<Task>;
    fn get_task_detail(&self, scope: &Scope, todo: TodoId) -> RepoResult<TaskDetail>;
    fn list_tasks(&self, scope: &Scope, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Moves the task keyed by `draft.todo_uuid` to another job.
    fn update_task(&self, scope: &Scope, draft: &TaskDraft) -> RepoResult<Task>;
    /// Deletes the task row; the base todo stays.
    fn delete_task(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport>;
}

pub struct SqliteWorkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl WorkRepository for SqliteWorkRepository<'_> {
    fn create_todo(&self, scope: &Scope, draft: &TodoDraft) -> RepoResult<Todo> {
        let id = insert_todo(self.conn, scope, draft)?;
        load_todo(self.conn, scope, id)
    }

    fn get_todo(&self, scope: &Scope, id: TodoId) -> RepoResult<Todo> {
        load_todo(self.conn, scope, id)
    }

    fn list_todos(&self, scope: &Scope, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let mut sql = format!("{TODO_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(&mut sql, &mut bind_values, "assigned_to", query.assigned_to);
        push_uuid_filter(&mut sql, &mut bind_values, "status_uuid", query.status_uuid);
        sql.push_str(" ORDER BY created_at ASC, rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn update_todo(&self, scope: &Scope, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        load_todo(self.conn, scope, id)?;
        ensure_todo_references(self.conn, scope, draft)?;

        self.conn.execute(
            "UPDATE todos
             SET
                reference_code = ?3,
                title = ?4,
                description = ?5,
                estimated_time = ?6,
                logged_time = ?7,
                assigned_to = ?8,
                deadline = ?9,
                status_uuid = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.reference_code.as_str(),
                draft.title.as_str(),
                draft.description.as_str(),
                draft.estimated_time,
                draft.logged_time,
                draft.assigned_to.map(|value| value.to_string()),
                draft.deadline,
                draft.status_uuid.map(|value| value.to_string()),
            ],
        )?;
        load_todo(self.conn, scope, id)
    }

    fn log_time(&self, scope: &Scope, id: TodoId, hours: f64) -> RepoResult<Todo> {
        require_writable(self.conn, scope)?;
        let todo = load_todo(self.conn, scope, id)?;
        let logged_time = todo.logged_time + hours;
        require_non_negative("logged_time", logged_time)?;

        self.conn.execute(
            "UPDATE todos
             SET logged_time = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                logged_time
            ],
        )?;
        load_todo(self.conn, scope, id)
    }

    fn delete_todo(&self, scope: &Scope, id: TodoId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Todo, id)
    }

    fn create_job(&self, scope: &Scope, draft: &JobDraft) -> RepoResult<Job> {
        insert_job(self.conn, scope, draft)?;
        self.get_job(scope, draft.todo_uuid)
    }

    fn create_job_with_todo(
        &self,
        scope: &Scope,
        todo: &TodoDraft,
        project: ProjectId,
    ) -> RepoResult<JobDetail> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let todo_uuid = insert_todo(&tx, scope, todo)?;
        insert_job(
            &tx,
            scope,
            &JobDraft {
                todo_uuid,
                project_uuid: project,
            },
        )?;
        tx.commit()?;
        self.get_job_detail(scope, todo_uuid)
    }

    fn get_job(&self, scope: &Scope, todo: TodoId) -> RepoResult<Job> {
        let mut stmt = self.conn.prepare(&format!(
            "{JOB_SELECT_SQL} WHERE todo_uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![todo.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_job_row(row),
            None => Err(RepoError::not_found(EntityKind::Job, todo)),
        }
    }

    fn get_job_detail(&self, scope: &Scope, todo: TodoId) -> RepoResult<JobDetail> {
        let job = self.get_job(scope, todo)?;
        let todo = load_todo(self.conn, scope, job.todo_uuid)?;
        Ok(JobDetail { job, todo })
    }

    fn list_jobs(&self, scope: &Scope, query: &JobListQuery) -> RepoResult<Vec<Job>> {
        let mut sql = format!("{JOB_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(&mut sql, &mut bind_values, "project_uuid", query.project_uuid);
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next()? {
            jobs.push(parse_job_row(row)?);
        }
        Ok(jobs)
    }

    fn update_job(&self, scope: &Scope, draft: &JobDraft) -> RepoResult<Job> {
        require_writable(self.conn, scope)?;
        self.get_job(scope, draft.todo_uuid)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::Job,
            EntityKind::Project,
            draft.project_uuid,
        )?;

        self.conn.execute(
            "UPDATE jobs SET project_uuid = ?3 WHERE todo_uuid = ?1 AND authority_uuid = ?2;",
            params![
                draft.todo_uuid.to_string(),
                scope.authority_uuid().to_string(),
                draft.project_uuid.to_string(),
            ],
        )?;
        self.get_job(scope, draft.todo_uuid)
    }

    fn delete_job(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Job, todo)
    }

    fn create_task(&self, scope: &Scope, draft: &TaskDraft) -> RepoResult<Task> {
        insert_task(self.conn, scope, draft)?;
        self.get_task(scope, draft.todo_uuid)
    }

    fn create_task_with_todo(
        &self,
        scope: &Scope,
        todo: &TodoDraft,
        job: TodoId,
    ) -> RepoResult<TaskDetail> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let todo_uuid = insert_todo(&tx, scope, todo)?;
        insert_task(
            &tx,
            scope,
            &TaskDraft {
                todo_uuid,
                job_uuid: job,
            },
        )?;
        tx.commit()?;
        self.get_task_detail(scope, todo_uuid)
    }

    fn get_task(&self, scope: &Scope, todo: TodoId) -> RepoResult<Task> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE todo_uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![todo.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_task_row(row),
            None => Err(RepoError::not_found(EntityKind::Task, todo)),
        }
    }

    fn get_task_detail(&self, scope: &Scope, todo: TodoId) -> RepoResult<TaskDetail> {
        let task = self.get_task(scope, todo)?;
        let todo = load_todo(self.conn, scope, task.todo_uuid)?;
        Ok(TaskDetail { task, todo })
    }

    fn list_tasks(&self, scope: &Scope, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(&mut sql, &mut bind_values, "job_uuid", query.job_uuid);
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn update_task(&self, scope: &Scope, draft: &TaskDraft) -> RepoResult<Task> {
        require_writable(self.conn, scope)?;
        self.get_task(scope, draft.todo_uuid)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::Task,
            EntityKind::Job,
            draft.job_uuid,
        )?;

        self.conn.execute(
            "UPDATE tasks SET job_uuid = ?3 WHERE todo_uuid = ?1 AND authority_uuid = ?2;",
            params![
                draft.todo_uuid.to_string(),
                scope.authority_uuid().to_string(),
                draft.job_uuid.to_string(),
            ],
        )?;
        self.get_task(scope, draft.todo_uuid)
    }

    fn delete_task(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Task, todo)
    }
}

fn insert_todo(conn: &Connection, scope: &Scope, draft: &TodoDraft) -> RepoResult<TodoId> {
    draft.validate()?;
    require_writable(conn, scope)?;
    ensure_todo_references(conn, scope, draft)?;

    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO todos (
            uuid,
            reference_code,
            title,
            description,
            estimated_time,
            logged_time,
            assigned_to,
            deadline,
            status_uuid,
            authority_uuid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            id.to_string(),
            draft.reference_code.as_str(),
            draft.title.as_str(),
            draft.description.as_str(),
            draft.estimated_time,
            draft.logged_time,
            draft.assigned_to.map(|value| value.to_string()),
            draft.deadline,
            draft.status_uuid.map(|value| value.to_string()),
            scope.authority_uuid().to_string(),
        ],
    )?;
    Ok(id)
}

fn ensure_todo_references(conn: &Connection, scope: &Scope, draft: &TodoDraft) -> RepoResult<()> {
    ensure_optional_reference(
        conn,
        scope,
        EntityKind::Todo,
        EntityKind::Staff,
        draft.assigned_to,
    )?;
    ensure_optional_reference(
        conn,
        scope,
        EntityKind::Todo,
        EntityKind::Status,
        draft.status_uuid,
    )
}

fn insert_job(conn: &Connection, scope: &Scope, draft: &JobDraft) -> RepoResult<()> {
    require_writable(conn, scope)?;
    ensure_reference(conn, scope, EntityKind::Job, EntityKind::Todo, draft.todo_uuid)?;
    ensure_reference(
        conn,
        scope,
        EntityKind::Job,
        EntityKind::Project,
        draft.project_uuid,
    )?;
    ensure_no_dependent(conn, EntityKind::Job, draft.todo_uuid)?;

    conn.execute(
        "INSERT INTO jobs (todo_uuid, project_uuid, authority_uuid) VALUES (?1, ?2, ?3);",
        params![
            draft.todo_uuid.to_string(),
            draft.project_uuid.to_string(),
            scope.authority_uuid().to_string(),
        ],
    )?;
    Ok(())
}

fn insert_task(conn: &Connection, scope: &Scope, draft: &TaskDraft) -> RepoResult<()> {
    require_writable(conn, scope)?;
    ensure_reference(conn, scope, EntityKind::Task, EntityKind::Todo, draft.todo_uuid)?;
    ensure_reference(conn, scope, EntityKind::Task, EntityKind::Job, draft.job_uuid)?;
    ensure_no_dependent(conn, EntityKind::Task, draft.todo_uuid)?;

    conn.execute(
        "INSERT INTO tasks (todo_uuid, job_uuid, authority_uuid) VALUES (?1, ?2, ?3);",
        params![
            draft.todo_uuid.to_string(),
            draft.job_uuid.to_string(),
            scope.authority_uuid().to_string(),
        ],
    )?;
    Ok(())
}

/// Fails with `Conflict` when a 1:1 dependent row already exists for `todo`.
pub(crate) fn ensure_no_dependent(
    conn: &Connection,
    kind: EntityKind,
    todo: TodoId,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE todo_uuid = ?1);",
            kind.table()
        ),
        [todo.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        return Err(RepoError::Conflict {
            entity: kind,
            id: todo,
        });
    }
    Ok(())
}

pub(crate) fn load_todo(conn: &Connection, scope: &Scope, id: TodoId) -> RepoResult<Todo> {
    let mut stmt = conn.prepare(&format!(
        "{TODO_SELECT_SQL} WHERE uuid = ?1 AND authority_uuid = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
    match rows.next()? {
        Some(row) => parse_todo_row(row),
        None => Err(RepoError::not_found(EntityKind::Todo, id)),
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    Ok(Todo {
        uuid: read_uuid(row, "uuid")?,
        reference_code: row.get("reference_code")?,
        title: row.get("title")?,
        description: row.get("description")?,
        estimated_time: row.get("estimated_time")?,
        logged_time: row.get("logged_time")?,
        assigned_to: read_optional_uuid(row, "assigned_to")?,
        deadline: row.get("deadline")?,
        status_uuid: read_optional_uuid(row, "status_uuid")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_job_row(row: &Row<'_>) -> RepoResult<Job> {
    Ok(Job {
        todo_uuid: read_uuid(row, "todo_uuid")?,
        project_uuid: read_uuid(row, "project_uuid")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    Ok(Task {
        todo_uuid: read_uuid(row, "todo_uuid")?,
        job_uuid: read_uuid(row, "job_uuid")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
    })
}
