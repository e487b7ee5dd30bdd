//! Authority registry repository.
//!
//! # Responsibility
//! - Administrative CRUD over tenant roots. These operations are not
//!   scoped: they are how scopes come to exist.
//!
//! # Invariants
//! - `uuid` never changes after creation.
//! - Deleting an authority deletes the whole tenant tree.

use crate::integrity::cascade::{delete_entity, DeleteReport};
use crate::integrity::rules::EntityKind;
use crate::model::authority::{Authority, AuthorityId};
use crate::repo::{bool_to_int, ensure_connection_ready, read_bool, read_uuid};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const AUTHORITY_SELECT_SQL: &str = "SELECT uuid, expires_at, is_active FROM authorities";

/// Repository interface for the authority registry.
pub trait AuthorityRepository {
    fn create_authority(&self, authority: &Authority) -> RepoResult<AuthorityId>;
    fn get_authority(&self, id: AuthorityId) -> RepoResult<Authority>;
    fn list_authorities(&self) -> RepoResult<Vec<Authority>>;
    /// Replaces expiry and active flag.
    fn update_authority(&self, authority: &Authority) -> RepoResult<()>;
    fn delete_authority(&self, id: AuthorityId) -> RepoResult<DeleteReport>;
}

/// SQLite-backed authority registry.
pub struct SqliteAuthorityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorityRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AuthorityRepository for SqliteAuthorityRepository<'_> {
    fn create_authority(&self, authority: &Authority) -> RepoResult<AuthorityId> {
        self.conn.execute(
            "INSERT INTO authorities (uuid, expires_at, is_active) VALUES (?1, ?2, ?3);",
            params![
                authority.uuid.to_string(),
                authority.expires_at,
                bool_to_int(authority.is_active),
            ],
        )?;
        Ok(authority.uuid)
    }

    fn get_authority(&self, id: AuthorityId) -> RepoResult<Authority> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUTHORITY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_authority_row(row),
            None => Err(RepoError::not_found(EntityKind::Authority, id)),
        }
    }

    fn list_authorities(&self) -> RepoResult<Vec<Authority>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUTHORITY_SELECT_SQL} ORDER BY expires_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_authority_row(row)?);
        }
        Ok(items)
    }

    fn update_authority(&self, authority: &Authority) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE authorities SET expires_at = ?2, is_active = ?3 WHERE uuid = ?1;",
            params![
                authority.uuid.to_string(),
                authority.expires_at,
                bool_to_int(authority.is_active),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Authority, authority.uuid));
        }
        Ok(())
    }

    fn delete_authority(&self, id: AuthorityId) -> RepoResult<DeleteReport> {
        delete_entity(self.conn, EntityKind::Authority, id, None)
    }
}

fn parse_authority_row(row: &Row<'_>) -> RepoResult<Authority> {
    Ok(Authority {
        uuid: read_uuid(row, "uuid")?,
        expires_at: row.get("expires_at")?,
        is_active: read_bool(row, "is_active")?,
    })
}
