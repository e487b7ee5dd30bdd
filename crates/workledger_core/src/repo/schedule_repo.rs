//! Work day and scheduled todo repository.
//!
//! # Responsibility
//! - CRUD over staff work days and todo allocations against them.
//! - Enforce per-day capacity when allocations or day hours change.
//!
//! # Invariants
//! - Sum of `allocated_hours` on a work day is <= its `hours`.
//! - A todo has at most one scheduled allocation.
//! - Capacity checks and the write they guard run in one transaction.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{ensure_reference, require_writable, Scope};
use crate::model::schedule::{
    exceeds_capacity, ScheduledTodo, ScheduledTodoDraft, WorkDay, WorkDayDraft, WorkDayId,
};
use crate::model::staff::UserId;
use crate::model::validation::ValidationError;
use crate::model::work::TodoId;
use crate::repo::work_repo::ensure_no_dependent;
use crate::repo::{
    delete_scoped, ensure_connection_ready, push_uuid_filter, read_timestamps, read_uuid,
    RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const WORK_DAY_SELECT_SQL: &str = "SELECT
    uuid,
    staff_uuid,
    work_date,
    hours,
    repeat_count,
    authority_uuid,
    created_at,
    updated_at
FROM work_days";
const SCHEDULED_TODO_SELECT_SQL: &str =
    "SELECT todo_uuid, work_day_uuid, allocated_hours, authority_uuid FROM scheduled_todos";

/// Exact-match filters for work day listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkDayListQuery {
    pub staff_uuid: Option<UserId>,
    pub date: Option<NaiveDate>,
}

/// Exact-match filters for scheduled todo listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduledTodoListQuery {
    pub work_day_uuid: Option<WorkDayId>,
}

pub trait ScheduleRepository {
    fn create_work_day(&self, scope: &Scope, draft: &WorkDayDraft) -> RepoResult<WorkDay>;
    fn get_work_day(&self, scope: &Scope, id: WorkDayId) -> RepoResult<WorkDay>;
    fn list_work_days(&self, scope: &Scope, query: &WorkDayListQuery) -> RepoResult<Vec<WorkDay>>;
    /// Fails with `OverAllocated` when new hours fall below current allocations.
    fn update_work_day(
        &self,
        scope: &Scope,
        id: WorkDayId,
        draft: &WorkDayDraft,
    ) -> RepoResult<WorkDay>;
    /// Scheduled todos on the day are deleted with it.
    fn delete_work_day(&self, scope: &Scope, id: WorkDayId) -> RepoResult<DeleteReport>;

    /// Fails with `Conflict` when the todo is already scheduled.
    fn create_scheduled_todo(
        &self,
        scope: &Scope,
        draft: &ScheduledTodoDraft,
    ) -> RepoResult<ScheduledTodo>;
    fn get_scheduled_todo(&self, scope: &Scope, todo: TodoId) -> RepoResult<ScheduledTodo>;
    fn list_scheduled_todos(
        &self,
        scope: &Scope,
        query: &ScheduledTodoListQuery,
    ) -> RepoResult<Vec<ScheduledTodo>>;
    /// Moves or resizes the allocation keyed by `draft.todo_uuid`.
    fn update_scheduled_todo(
        &self,
        scope: &Scope,
        draft: &ScheduledTodoDraft,
    ) -> RepoResult<ScheduledTodo>;
    fn delete_scheduled_todo(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport>;

    /// Sum of allocations currently booked on the work day.
    fn allocated_hours(&self, scope: &Scope, work_day: WorkDayId) -> RepoResult<f64>;
}

pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn create_work_day(&self, scope: &Scope, draft: &WorkDayDraft) -> RepoResult<WorkDay> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::WorkDay,
            EntityKind::Staff,
            draft.staff_uuid,
        )?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO work_days (
                uuid,
                staff_uuid,
                work_date,
                hours,
                repeat_count,
                authority_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                draft.staff_uuid.to_string(),
                draft.date,
                draft.hours,
                draft.repeat,
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.get_work_day(scope, id)
    }

    fn get_work_day(&self, scope: &Scope, id: WorkDayId) -> RepoResult<WorkDay> {
        load_work_day(self.conn, scope, id)
    }

    fn list_work_days(&self, scope: &Scope, query: &WorkDayListQuery) -> RepoResult<Vec<WorkDay>> {
        let mut sql = format!("{WORK_DAY_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(&mut sql, &mut bind_values, "staff_uuid", query.staff_uuid);
        if let Some(date) = query.date {
            sql.push_str(" AND work_date = ?");
            bind_values.push(Value::Text(date.format("%Y-%m-%d").to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut work_days = Vec::new();
        while let Some(row) = rows.next()? {
            work_days.push(parse_work_day_row(row)?);
        }
        Ok(work_days)
    }

    fn update_work_day(
        &self,
        scope: &Scope,
        id: WorkDayId,
        draft: &WorkDayDraft,
    ) -> RepoResult<WorkDay> {
        draft.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        require_writable(&tx, scope)?;
        load_work_day(&tx, scope, id)?;
        ensure_reference(
            &tx,
            scope,
            EntityKind::WorkDay,
            EntityKind::Staff,
            draft.staff_uuid,
        )?;

        let allocated = sum_allocations(&tx, id, None)?;
        if exceeds_capacity(allocated, draft.hours) {
            return Err(ValidationError::OverAllocated {
                work_day: id,
                available_hours: draft.hours,
                requested_hours: allocated,
            }
            .into());
        }

        tx.execute(
            "UPDATE work_days
             SET
                staff_uuid = ?3,
                work_date = ?4,
                hours = ?5,
                repeat_count = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.staff_uuid.to_string(),
                draft.date,
                draft.hours,
                draft.repeat,
            ],
        )?;
        tx.commit()?;
        self.get_work_day(scope, id)
    }

    fn delete_work_day(&self, scope: &Scope, id: WorkDayId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::WorkDay, id)
    }

    fn create_scheduled_todo(
        &self,
        scope: &Scope,
        draft: &ScheduledTodoDraft,
    ) -> RepoResult<ScheduledTodo> {
        draft.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        require_writable(&tx, scope)?;
        ensure_reference(
            &tx,
            scope,
            EntityKind::ScheduledTodo,
            EntityKind::Todo,
            draft.todo_uuid,
        )?;
        ensure_reference(
            &tx,
            scope,
            EntityKind::ScheduledTodo,
            EntityKind::WorkDay,
            draft.work_day_uuid,
        )?;
        ensure_no_dependent(&tx, EntityKind::ScheduledTodo, draft.todo_uuid)?;
        ensure_capacity(&tx, scope, draft)?;

        tx.execute(
            "INSERT INTO scheduled_todos (
                todo_uuid,
                work_day_uuid,
                allocated_hours,
                authority_uuid
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                draft.todo_uuid.to_string(),
                draft.work_day_uuid.to_string(),
                draft.allocated_hours,
                scope.authority_uuid().to_string(),
            ],
        )?;
        tx.commit()?;
        self.get_scheduled_todo(scope, draft.todo_uuid)
    }

    fn get_scheduled_todo(&self, scope: &Scope, todo: TodoId) -> RepoResult<ScheduledTodo> {
        let mut stmt = self.conn.prepare(&format!(
            "{SCHEDULED_TODO_SELECT_SQL} WHERE todo_uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![todo.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_scheduled_todo_row(row),
            None => Err(RepoError::not_found(EntityKind::ScheduledTodo, todo)),
        }
    }

    fn list_scheduled_todos(
        &self,
        scope: &Scope,
        query: &ScheduledTodoListQuery,
    ) -> RepoResult<Vec<ScheduledTodo>> {
        let mut sql = format!("{SCHEDULED_TODO_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(
            &mut sql,
            &mut bind_values,
            "work_day_uuid",
            query.work_day_uuid,
        );
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut scheduled = Vec::new();
        while let Some(row) = rows.next()? {
            scheduled.push(parse_scheduled_todo_row(row)?);
        }
        Ok(scheduled)
    }

    fn update_scheduled_todo(
        &self,
        scope: &Scope,
        draft: &ScheduledTodoDraft,
    ) -> RepoResult<ScheduledTodo> {
        draft.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        require_writable(&tx, scope)?;
        self.get_scheduled_todo(scope, draft.todo_uuid)?;
        ensure_reference(
            &tx,
            scope,
            EntityKind::ScheduledTodo,
            EntityKind::WorkDay,
            draft.work_day_uuid,
        )?;
        ensure_capacity(&tx, scope, draft)?;

        tx.execute(
            "UPDATE scheduled_todos
             SET work_day_uuid = ?3,
                 allocated_hours = ?4
             WHERE todo_uuid = ?1
               AND authority_uuid = ?2;",
            params![
                draft.todo_uuid.to_string(),
                scope.authority_uuid().to_string(),
                draft.work_day_uuid.to_string(),
                draft.allocated_hours,
            ],
        )?;
        tx.commit()?;
        self.get_scheduled_todo(scope, draft.todo_uuid)
    }

    fn delete_scheduled_todo(&self, scope: &Scope, todo: TodoId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::ScheduledTodo, todo)
    }

    fn allocated_hours(&self, scope: &Scope, work_day: WorkDayId) -> RepoResult<f64> {
        load_work_day(self.conn, scope, work_day)?;
        sum_allocations(self.conn, work_day, None)
    }
}

/// Rejects the draft when the target day cannot absorb its hours.
///
/// The todo's own current allocation is excluded, so resizing in place
/// only counts the difference.
fn ensure_capacity(
    conn: &Connection,
    scope: &Scope,
    draft: &ScheduledTodoDraft,
) -> RepoResult<()> {
    let work_day = load_work_day(conn, scope, draft.work_day_uuid)?;
    let booked = sum_allocations(conn, work_day.uuid, Some(draft.todo_uuid))?;
    let available_hours = work_day.hours - booked;
    if exceeds_capacity(draft.allocated_hours, available_hours) {
        return Err(ValidationError::OverAllocated {
            work_day: work_day.uuid,
            available_hours,
            requested_hours: draft.allocated_hours,
        }
        .into());
    }
    Ok(())
}

fn sum_allocations(
    conn: &Connection,
    work_day: WorkDayId,
    excluding: Option<TodoId>,
) -> RepoResult<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(allocated_hours), 0.0)
         FROM scheduled_todos
         WHERE work_day_uuid = ?1
           AND (?2 IS NULL OR todo_uuid <> ?2);",
        params![
            work_day.to_string(),
            excluding.map(|value| value.to_string())
        ],
        |row| row.get(0),
    )?;
    Ok(total)
}

fn load_work_day(conn: &Connection, scope: &Scope, id: WorkDayId) -> RepoResult<WorkDay> {
    let mut stmt = conn.prepare(&format!(
        "{WORK_DAY_SELECT_SQL} WHERE uuid = ?1 AND authority_uuid = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
    match rows.next()? {
        Some(row) => parse_work_day_row(row),
        None => Err(RepoError::not_found(EntityKind::WorkDay, id)),
    }
}

fn parse_work_day_row(row: &Row<'_>) -> RepoResult<WorkDay> {
    Ok(WorkDay {
        uuid: read_uuid(row, "uuid")?,
        staff_uuid: read_uuid(row, "staff_uuid")?,
        date: row.get("work_date")?,
        hours: row.get("hours")?,
        repeat: row.get("repeat_count")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_scheduled_todo_row(row: &Row<'_>) -> RepoResult<ScheduledTodo> {
    Ok(ScheduledTodo {
        todo_uuid: read_uuid(row, "todo_uuid")?,
        work_day_uuid: read_uuid(row, "work_day_uuid")?,
        allocated_hours: row.get("allocated_hours")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
    })
}
