//! User identity and staff directory repositories.
//!
//! # Invariants
//! - Usernames are unique across the whole ledger.
//! - A user has at most one staff record; it lives in one authority.
//! - Deleting a staff record clears todo assignments and deletes the
//!   staff member's work days (and their scheduled todos).

use crate::integrity::cascade::{delete_entity, DeleteReport};
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{require_writable, Scope};
use crate::model::staff::{Staff, StaffDraft, User, UserDraft, UserId};
use crate::repo::{
    bool_to_int, delete_scoped, ensure_connection_ready, read_bool, read_timestamps, read_uuid,
    RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str =
    "SELECT uuid, username, is_project_manager, created_at, updated_at FROM users";
const STAFF_SELECT_SQL: &str =
    "SELECT user_uuid, rate, authority_uuid, created_at, updated_at FROM staff";

/// Global user identities. Not tenant-scoped.
pub trait UserRepository {
    /// Fails with `Conflict` when the username is taken.
    fn create_user(&self, draft: &UserDraft) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<User>;
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn update_user(&self, id: UserId, draft: &UserDraft) -> RepoResult<User>;
    /// The user's staff record goes with it.
    fn delete_user(&self, id: UserId) -> RepoResult<DeleteReport>;
}

/// Staff records, keyed by user id.
pub trait StaffRepository {
    /// Fails with `Conflict` when the user already has a staff record.
    fn create_staff(&self, scope: &Scope, draft: &StaffDraft) -> RepoResult<Staff>;
    fn get_staff(&self, scope: &Scope, user: UserId) -> RepoResult<Staff>;
    fn list_staff(&self, scope: &Scope) -> RepoResult<Vec<Staff>>;
    /// Updates the rate of the staff record keyed by `draft.user_uuid`.
    fn update_staff(&self, scope: &Scope, draft: &StaffDraft) -> RepoResult<Staff>;
    fn delete_staff(&self, scope: &Scope, user: UserId) -> RepoResult<DeleteReport>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn ensure_username_free(&self, username: &str, owner: Option<UserId>) -> RepoResult<()> {
        if let Some(existing) = self.find_user_by_username(username)? {
            if Some(existing.uuid) != owner {
                return Err(RepoError::Conflict {
                    entity: EntityKind::User,
                    id: existing.uuid,
                });
            }
        }
        Ok(())
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, draft: &UserDraft) -> RepoResult<User> {
        draft.validate()?;
        self.ensure_username_free(&draft.username, None)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO users (uuid, username, is_project_manager) VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                draft.username.as_str(),
                bool_to_int(draft.is_project_manager),
            ],
        )?;
        self.get_user(id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<User> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_user_row(row),
            None => Err(RepoError::not_found(EntityKind::User, id)),
        }
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_user_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY username ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        Ok(users)
    }

    fn update_user(&self, id: UserId, draft: &UserDraft) -> RepoResult<User> {
        draft.validate()?;
        self.get_user(id)?;
        self.ensure_username_free(&draft.username, Some(id))?;

        self.conn.execute(
            "UPDATE users
             SET username = ?2,
                 is_project_manager = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                draft.username.as_str(),
                bool_to_int(draft.is_project_manager),
            ],
        )?;
        self.get_user(id)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<DeleteReport> {
        delete_entity(self.conn, EntityKind::User, id, None)
    }
}

pub struct SqliteStaffRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStaffRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl StaffRepository for SqliteStaffRepository<'_> {
    fn create_staff(&self, scope: &Scope, draft: &StaffDraft) -> RepoResult<Staff> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let user_exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE uuid = ?1;",
                [draft.user_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if user_exists.is_none() {
            return Err(RepoError::not_found(EntityKind::User, draft.user_uuid));
        }

        let has_staff: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM staff WHERE user_uuid = ?1);",
            [draft.user_uuid.to_string()],
            |row| row.get(0),
        )?;
        if has_staff == 1 {
            return Err(RepoError::Conflict {
                entity: EntityKind::Staff,
                id: draft.user_uuid,
            });
        }

        self.conn.execute(
            "INSERT INTO staff (user_uuid, rate, authority_uuid) VALUES (?1, ?2, ?3);",
            params![
                draft.user_uuid.to_string(),
                draft.rate,
                scope.authority_uuid().to_string(),
            ],
        )?;
        self.get_staff(scope, draft.user_uuid)
    }

    fn get_staff(&self, scope: &Scope, user: UserId) -> RepoResult<Staff> {
        let mut stmt = self.conn.prepare(&format!(
            "{STAFF_SELECT_SQL} WHERE user_uuid = ?1 AND authority_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![user.to_string(), scope.authority_uuid().to_string()])?;
        match rows.next()? {
            Some(row) => parse_staff_row(row),
            None => Err(RepoError::not_found(EntityKind::Staff, user)),
        }
    }

    fn list_staff(&self, scope: &Scope) -> RepoResult<Vec<Staff>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STAFF_SELECT_SQL} WHERE authority_uuid = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([scope.authority_uuid().to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_staff_row(row)?);
        }
        Ok(items)
    }

    fn update_staff(&self, scope: &Scope, draft: &StaffDraft) -> RepoResult<Staff> {
        draft.validate()?;
        require_writable(self.conn, scope)?;

        let changed = self.conn.execute(
            "UPDATE staff
             SET rate = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE user_uuid = ?1
               AND authority_uuid = ?2;",
            params![
                draft.user_uuid.to_string(),
                scope.authority_uuid().to_string(),
                draft.rate,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Staff, draft.user_uuid));
        }
        self.get_staff(scope, draft.user_uuid)
    }

    fn delete_staff(&self, scope: &Scope, user: UserId) -> RepoResult<DeleteReport> {
        delete_scoped(self.conn, scope, EntityKind::Staff, user)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    Ok(User {
        uuid: read_uuid(row, "uuid")?,
        username: row.get("username")?,
        is_project_manager: read_bool(row, "is_project_manager")?,
        timestamps: read_timestamps(row)?,
    })
}

fn parse_staff_row(row: &Row<'_>) -> RepoResult<Staff> {
    Ok(Staff {
        user_uuid: read_uuid(row, "user_uuid")?,
        rate: row.get("rate")?,
        authority_uuid: read_uuid(row, "authority_uuid")?,
        timestamps: read_timestamps(row)?,
    })
}
