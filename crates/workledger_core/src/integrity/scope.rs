//! Caller scope and same-tenant reference checks.
//!
//! # Invariants
//! - Writes are refused unless the scope's authority is valid at the
//!   scope's reference date.
//! - A reference to a record of another authority is an integrity error;
//!   a reference to a missing record is `NotFound`.

use crate::integrity::rules::EntityKind;
use crate::model::authority::AuthorityId;
use crate::model::validation::ValidationError;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use chrono::{NaiveDate, Utc};
use log::warn;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

/// Caller authority derived by the API layer from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    authority_uuid: AuthorityId,
    as_of: NaiveDate,
}

impl Scope {
    /// Scope whose writes are checked against today's UTC date.
    pub fn new(authority_uuid: AuthorityId) -> Self {
        Self::as_of(authority_uuid, Utc::now().date_naive())
    }

    /// Scope whose writes are checked against an explicit date.
    pub fn as_of(authority_uuid: AuthorityId, as_of: NaiveDate) -> Self {
        Self {
            authority_uuid,
            as_of,
        }
    }

    pub fn authority_uuid(&self) -> AuthorityId {
        self.authority_uuid
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.as_of
    }
}

/// Fails unless the scope's authority exists and is valid for writes.
pub(crate) fn require_writable(conn: &Connection, scope: &Scope) -> RepoResult<()> {
    let row: Option<(NaiveDate, i64)> = conn
        .query_row(
            "SELECT expires_at, is_active FROM authorities WHERE uuid = ?1;",
            [scope.authority_uuid.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((expires_at, is_active)) = row else {
        return Err(RepoError::not_found(
            EntityKind::Authority,
            scope.authority_uuid,
        ));
    };
    if is_active == 1 && scope.as_of <= expires_at {
        return Ok(());
    }

    warn!(
        "event=authority_write_rejected module=integrity status=error authority={} as_of={} expires_at={} is_active={}",
        scope.authority_uuid, scope.as_of, expires_at, is_active
    );
    Err(ValidationError::AuthorityNotValid(scope.authority_uuid).into())
}

/// Resolves a foreign key written by `entity` to a record of `reference` kind.
pub(crate) fn ensure_reference(
    conn: &Connection,
    scope: &Scope,
    entity: EntityKind,
    reference: EntityKind,
    id: Uuid,
) -> RepoResult<()> {
    let Some(primary_key) = reference.primary_key() else {
        return Err(RepoError::InvalidData(format!(
            "{reference} rows cannot be referenced"
        )));
    };
    let owner: Option<String> = conn
        .query_row(
            &format!(
                "SELECT authority_uuid FROM {} WHERE {primary_key} = ?1;",
                reference.table()
            ),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    let Some(owner) = owner else {
        return Err(RepoError::not_found(reference, id));
    };
    if parse_uuid(&owner, "authority_uuid")? != scope.authority_uuid {
        warn!(
            "event=cross_tenant_reference module=integrity status=error entity={} reference={} id={} authority={}",
            entity, reference, id, scope.authority_uuid
        );
        return Err(RepoError::Integrity {
            entity,
            reference,
            id,
        });
    }
    Ok(())
}

/// Same as [`ensure_reference`] for optional foreign keys.
pub(crate) fn ensure_optional_reference(
    conn: &Connection,
    scope: &Scope,
    entity: EntityKind,
    reference: EntityKind,
    id: Option<Uuid>,
) -> RepoResult<()> {
    match id {
        Some(id) => ensure_reference(conn, scope, entity, reference, id),
        None => Ok(()),
    }
}

/// Fails with `NotFound` unless the row exists inside the scope.
pub(crate) fn ensure_in_scope(
    conn: &Connection,
    scope: &Scope,
    kind: EntityKind,
    id: Uuid,
) -> RepoResult<()> {
    if crate::integrity::cascade::row_exists(conn, kind, id, Some(scope.authority_uuid))? {
        Ok(())
    } else {
        Err(RepoError::not_found(kind, id))
    }
}
