//! Transitive delete engine driven by the rule table.
//!
//! # Responsibility
//! - Delete one record and apply cascade/nullify/restrict to its
//!   dependents, depth-first, inside one IMMEDIATE transaction.
//!
//! # Invariants
//! - Dependents are handled before the parent row is removed, so schema
//!   foreign keys hold after every statement.
//! - Each row is visited at most once per delete.
//! - Any error rolls back the whole delete.

use crate::integrity::rules::{DeleteRule, EntityKind, OnDelete, DELETE_RULES};
use crate::model::authority::AuthorityId;
use crate::repo::{parse_uuid, RepoError, RepoResult};
use log::{error, info};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

/// Rows affected by one delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Deleted row count per kind, including the root row.
    pub deleted: BTreeMap<EntityKind, usize>,
    /// Rows whose reference column was cleared.
    pub nullified: usize,
}

impl DeleteReport {
    /// Deleted row count for one kind.
    pub fn deleted_count(&self, kind: EntityKind) -> usize {
        self.deleted.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    fn record_deleted(&mut self, kind: EntityKind, count: usize) {
        if count > 0 {
            *self.deleted.entry(kind).or_insert(0) += count;
        }
    }
}

/// Deletes one record using [`DELETE_RULES`].
///
/// With `owner = Some(authority)` the record must belong to that authority,
/// otherwise the call fails with `NotFound` exactly as if it did not exist.
pub fn delete_entity(
    conn: &Connection,
    kind: EntityKind,
    id: Uuid,
    owner: Option<AuthorityId>,
) -> RepoResult<DeleteReport> {
    delete_with_rules(conn, DELETE_RULES, kind, id, owner)
}

/// Deletes one record using an explicit rule table.
pub fn delete_with_rules(
    conn: &Connection,
    rules: &[DeleteRule],
    kind: EntityKind,
    id: Uuid,
    owner: Option<AuthorityId>,
) -> RepoResult<DeleteReport> {
    let started_at = Instant::now();
    let result = run_delete(conn, rules, kind, id, owner);
    match &result {
        Ok(report) => info!(
            "event=delete_cascade module=integrity status=ok kind={} id={} deleted={} nullified={} duration_ms={}",
            kind,
            id,
            report.total_deleted(),
            report.nullified,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=delete_cascade module=integrity status=error kind={} id={} error_code={} duration_ms={}",
            kind,
            id,
            err.code(),
            started_at.elapsed().as_millis()
        ),
    }
    result
}

fn run_delete(
    conn: &Connection,
    rules: &[DeleteRule],
    kind: EntityKind,
    id: Uuid,
    owner: Option<AuthorityId>,
) -> RepoResult<DeleteReport> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if !row_exists(&tx, kind, id, owner)? {
        return Err(RepoError::not_found(kind, id));
    }

    let mut walk = CascadeWalk {
        conn: &tx,
        rules,
        visited: HashSet::new(),
        report: DeleteReport::default(),
    };
    walk.delete_row(kind, id)?;
    let report = walk.report;

    tx.commit()?;
    Ok(report)
}

struct CascadeWalk<'a> {
    conn: &'a Connection,
    rules: &'a [DeleteRule],
    visited: HashSet<(EntityKind, Uuid)>,
    report: DeleteReport,
}

impl CascadeWalk<'_> {
    fn delete_row(&mut self, kind: EntityKind, id: Uuid) -> RepoResult<()> {
        if !self.visited.insert((kind, id)) {
            return Ok(());
        }
        let primary_key = kind.primary_key().ok_or_else(|| {
            RepoError::InvalidData(format!("{kind} rows cannot be deleted individually"))
        })?;

        let rules = self.rules;
        for rule in rules.iter().filter(|rule| rule.parent == kind) {
            match rule.action {
                OnDelete::Cascade => self.cascade(rule, id)?,
                OnDelete::Nullify => self.nullify(rule, id)?,
                OnDelete::Restrict => {
                    if self.has_dependents(rule, id)? {
                        return Err(RepoError::DeleteRestricted {
                            entity: kind,
                            id,
                            dependent: rule.dependent,
                        });
                    }
                }
            }
        }

        let deleted = self.conn.execute(
            &format!("DELETE FROM {} WHERE {primary_key} = ?1;", kind.table()),
            [id.to_string()],
        )?;
        self.report.record_deleted(kind, deleted);
        Ok(())
    }

    fn cascade(&mut self, rule: &DeleteRule, parent_id: Uuid) -> RepoResult<()> {
        let dependent = rule.dependent;
        let Some(dependent_key) = dependent.primary_key() else {
            // Link rows have no dependents of their own.
            let deleted = self.conn.execute(
                &format!("DELETE FROM {} WHERE {} = ?1;", dependent.table(), rule.column),
                [parent_id.to_string()],
            )?;
            self.report.record_deleted(dependent, deleted);
            return Ok(());
        };

        let column_label = format!("{}.{dependent_key}", dependent.table());
        let mut ids = Vec::new();
        {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {dependent_key} FROM {} WHERE {} = ?1;",
                dependent.table(),
                rule.column
            ))?;
            let mut rows = stmt.query([parent_id.to_string()])?;
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                ids.push(parse_uuid(&value, &column_label)?);
            }
        }

        for dependent_id in ids {
            self.delete_row(dependent, dependent_id)?;
        }
        Ok(())
    }

    fn nullify(&mut self, rule: &DeleteRule, parent_id: Uuid) -> RepoResult<()> {
        let touch = if rule.dependent.has_timestamps() {
            ", updated_at = (strftime('%s', 'now') * 1000)"
        } else {
            ""
        };
        let changed = self.conn.execute(
            &format!(
                "UPDATE {table} SET {column} = NULL{touch} WHERE {column} = ?1;",
                table = rule.dependent.table(),
                column = rule.column
            ),
            [parent_id.to_string()],
        )?;
        self.report.nullified += changed;
        Ok(())
    }

    fn has_dependents(&self, rule: &DeleteRule, parent_id: Uuid) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                rule.dependent.table(),
                rule.column
            ),
            [parent_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// Checks that a row exists, optionally inside one authority.
pub(crate) fn row_exists(
    conn: &Connection,
    kind: EntityKind,
    id: Uuid,
    owner: Option<AuthorityId>,
) -> RepoResult<bool> {
    let primary_key = kind
        .primary_key()
        .ok_or_else(|| RepoError::InvalidData(format!("{kind} rows have no single key")))?;
    let exists: i64 = match owner.filter(|_| kind.is_scoped()) {
        Some(authority) => conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {primary_key} = ?1 AND authority_uuid = ?2);",
                kind.table()
            ),
            params![id.to_string(), authority.to_string()],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {primary_key} = ?1);",
                kind.table()
            ),
            [id.to_string()],
            |row| row.get(0),
        )?,
    };
    Ok(exists == 1)
}
