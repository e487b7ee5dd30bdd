//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the per-entity access contracts used by the API layer:
//!   create, get, list, update, delete (plus link operations).
//! - Isolate SQL details from service/business orchestration.
//!
//! # Invariants
//! - Every scoped operation takes the caller's `Scope` and never touches
//!   rows of another authority; such rows are reported as `NotFound`.
//! - Write paths validate drafts and authority validity before SQL runs.
//! - Deletes go through the integrity rule engine.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::integrity::cascade::{delete_entity, DeleteReport};
use crate::integrity::rules::EntityKind;
use crate::integrity::scope::{require_writable, Scope};
use crate::model::validation::ValidationError;
use crate::model::Timestamps;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod authority_repo;
pub mod directory_repo;
pub mod project_repo;
pub mod schedule_repo;
pub mod staff_repo;
pub mod status_repo;
pub mod work_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every entity.
#[derive(Debug)]
pub enum RepoError {
    /// Id absent, or owned by another authority.
    NotFound { entity: EntityKind, id: Uuid },
    /// Malformed or out-of-range attribute.
    Validation(ValidationError),
    /// A one-to-one dependent (or unique identity) already exists.
    Conflict { entity: EntityKind, id: Uuid },
    /// Reference to a record owned by a different authority.
    Integrity {
        entity: EntityKind,
        reference: EntityKind,
        id: Uuid,
    },
    /// A restrict rule blocked the delete.
    DeleteRestricted {
        entity: EntityKind,
        id: Uuid,
        dependent: EntityKind,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    Db(DbError),
}

impl RepoError {
    pub(crate) fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Whether the API layer should surface this as a client error.
    ///
    /// Integrity violations and storage failures are generic failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Validation(_)
                | Self::Conflict { .. }
                | Self::DeleteRestricted { .. }
        )
    }

    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Integrity { .. } => "integrity",
            Self::DeleteRestricted { .. } => "delete_restricted",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::InvalidData(_) => "invalid_data",
            Self::Db(_) => "db",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict { entity, id } => write!(f, "{entity} already exists for {id}"),
            Self::Integrity {
                entity,
                reference,
                id,
            } => write!(
                f,
                "{entity} cannot reference {reference} {id} owned by another authority"
            ),
            Self::DeleteRestricted {
                entity,
                id,
                dependent,
            } => write!(f, "{entity} {id} is still referenced by {dependent} rows"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that have not been migrated by `crate::db`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn read_uuid(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let value: String = row.get(column)?;
    parse_uuid(&value, column)
}

pub(crate) fn read_optional_uuid(row: &Row<'_>, column: &str) -> RepoResult<Option<Uuid>> {
    row.get::<_, Option<String>>(column)?
        .map(|value| parse_uuid(&value, column))
        .transpose()
}

pub(crate) fn read_bool(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn read_timestamps(row: &Row<'_>) -> RepoResult<Timestamps> {
    Ok(Timestamps {
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Appends `AND <column> = ?` when an exact-match filter is set.
pub(crate) fn push_uuid_filter(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &str,
    value: Option<Uuid>,
) {
    if let Some(value) = value {
        sql.push_str(&format!(" AND {column} = ?"));
        bind_values.push(Value::Text(value.to_string()));
    }
}

/// Deletes one scoped record through the rule engine.
pub(crate) fn delete_scoped(
    conn: &Connection,
    scope: &Scope,
    kind: EntityKind,
    id: Uuid,
) -> RepoResult<DeleteReport> {
    require_writable(conn, scope)?;
    delete_entity(conn, kind, id, Some(scope.authority_uuid()))
}
