//! Status taxonomy repository.
//!
//! # Invariants
//! - A status always belongs to a group of the same authority.
//! - Deleting a group deletes its statuses; todos lose their status.

use crate::integrity::cascade::DeleteReport;
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{ensure_reference, require_writable, Scope};
use crate::model::status::{
    Status, StatusDraft, StatusGroup, StatusGroupDraft, StatusGroupId, StatusId,
};
use crate::repo::{
    delete_scoped, ensure_connection_ready, push_uuid_filter, read_timestamps, read_uuid,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const GROUP_SELECT_SQL: &str =
    "SELECT uuid, title, authority_uuid, created_at, updated_at FROM status_groups";
const STATUS_SELECT_SQL: &str =
    "SELECT uuid, title, status_group_uuid, authority_uuid, created_at, updated_at FROM statuses";

/// Exact-match filters for status listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusListQuery {
    pub status_group_uuid: Option<StatusGroupId>,
}

pub trait StatusRepository {
    fn create_status_group(
        &self,
        scope: &Scope,
        draft: &StatusGroupDraft,
    ) -> RepoResult<StatusGroup>;
    fn get_status_group(&self, scope: &Scope, id: StatusGroupId) -> RepoResult<StatusGroup>;
    fn list_status_groups(&self, scope: &Scope) -> RepoResult<Vec<StatusGroup>>;
    fn update_status_group(
        &self,
        scope: &Scope,
        id: StatusGroupId,
        draft: &StatusGroupDraft,
    ) -> RepoResult<StatusGroup>;
    fn delete_status_group(&self, scope: &Scope, id: StatusGroupId) -> RepoResult<DeleteReport>;

    fn create_status(&self, scope: &Scope, draft: &StatusDraft) -> RepoResult<Status>;
    fn get_status(&self, scope: &Scope, id: StatusId) -> RepoResult<Status>;
    fn list_statuses(&self, scope: &Scope, query: &StatusListQuery) -> RepoResult<Vec<Status>>;
    fn update_status(&self, scope: &Scope, id: StatusId, draft: &StatusDraft)
        -> RepoResult<Status>;
    fn delete_status(&self, scope: &Scope, id: StatusId) -> RepoResult<DeleteReport>;
}

pub struct SqliteStatusRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStatusRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_group(&self, scope: &Scope, id: StatusGroupId) -> RepoResult<StatusGroup> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL} WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_group_row(row),
            None => Err(RepoError::not_found(EntityKind::StatusGroup, id)),
        }
    }

    fn load_status(&self, scope: &Scope, id: StatusId) -> RepoResult<Status> {
        let mut stmt = self.conn.prepare(&format!(
            "{STATUS_SELECT_SQL} WHERE uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_status_row(row),
            None => Err(RepoError::not_found(EntityKind::Status, id)),
        }
    }
}

impl StatusRepository for SqliteStatusRepository<'_> {
    fn create_status_group(
        &self,
        scope: &Scope,
        draft: &StatusGroupDraft,
    ) -> RepoResult<StatusGroup> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO status_groups (uuid, title, authority_uuid) VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                draft.title.as_str(),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.load_group(scope, id)
    }

    fn get_status_group(&self, scope: &Scope, id: StatusGroupId) -> RepoResult<StatusGroup> {
        self.load_group(scope, id)
    }

    fn list_status_groups(&self, scope: &Scope) -> RepoResult<Vec<StatusGroup>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GROUP_SELECT_SQL} WHERE authority_uuid = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([scope.authority_uuid().to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_group_row(row)?);
        }
        Ok(items)
    }

    fn update_status_group(
        &self,
        scope: &Scope,
        id: StatusGroupId,
        draft: &StatusGroupDraft,
    ) -> RepoResult<StatusGroup> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let changed = self.conn.execute(
            "UPDATE status_groups
             SET title = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.title.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::StatusGroup, id));
        }
        self.load_group(scope, id)
    }

    fn delete_status_group(&self, scope: &Scope, id: StatusGroupId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::StatusGroup, id)
    }

    fn create_status(&self, scope: &Scope, draft: &StatusDraft) -> RepoResult<Status> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::Status,
            EntityKind::StatusGroup,
            draft.status_group_uuid,
        )?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO statuses (uuid, title, status_group_uuid, authority_uuid)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.title.as_str(),
                draft.status_group_uuid.to_string(),
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.load_status(scope, id)
    }

    fn get_status(&self, scope: &Scope, id: StatusId) -> RepoResult<Status> {
        self.load_status(scope, id)
    }

    fn list_statuses(&self, scope: &Scope, query: &StatusListQuery) -> RepoResult<Vec<Status>> {
        let mut sql = format!("{STATUS_SELECT_SQL} WHERE authority_uuid = ?");
        let mut bind_values = vec![Value::Text(scope.authority_uuid().to_string())];
        push_uuid_filter(
            &mut sql,
            &mut bind_values,
            "status_group_uuid",
            query.status_group_uuid,
        );
        sql.push_str(" ORDER BY created_at ASC, rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_status_row(row)?);
        }
        Ok(items)
    }

    fn update_status(
        &self,
        scope: &Scope,
        id: StatusId,
        draft: &StatusDraft,
    ) -> RepoResult<Status> {
        draft.validate()?;
        require_writable(self.conn, scope)?;
        self.load_status(scope, id)?;
        ensure_reference(
            self.conn,
            scope,
            EntityKind::Status,
            EntityKind::StatusGroup,
            draft.status_group_uuid,
        )?;

        self.conn.execute(
            "UPDATE statuses
             SET title = ?3,
                 status_group_uuid = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND authority_uuid = ?2;",
            params![
                id.to_string(),
                scope.authority_uuid().to_string(),
                draft.title.as_str(),
                draft.status_group_uuid.to_string(),
            ],
        )?;
        self.load_status(scope, id)
    }

    fn delete_status(&self, scope: &Scope, id: StatusId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Status, id)
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<StatusGroup> {
    Ok(StatusGroup {
        uuid: read_uuid(row, "uuid")?,
        title: row.get("title")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_status_row(row: &Row<'_>) -> RepoResult<Status> {
    Ok(Status {
        uuid: read_uuid(row, "uuid")?,
        title: row.get("title")?,
        status_group_uuid: read_uuid(row, "status_group_uuid")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}
