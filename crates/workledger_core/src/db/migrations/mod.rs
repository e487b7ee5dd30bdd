//! Ledger schema versions.
//!
//! # Responsibility
//! - Bring a connection from any older `user_version` to the latest ledger
//!   schema in one transaction.
//! - Verify declared foreign keys hold before the connection is used.
//!
//! # Invariants
//! - v1 creates every table; later versions only add indexes or columns.
//! - `PRAGMA user_version` equals the last applied version.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "scope_indexes",
        sql: include_str!("0002_scope_indexes.sql"),
    },
];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies the versions above the connection's `user_version`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version);
    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;
    Ok(())
}

/// Fails when any row references a parent that does not exist.
///
/// The rule engine deletes dependents before parents, so a clean ledger
/// never trips this; rows written by tools with foreign keys off can.
pub fn verify_references(conn: &Connection) -> DbResult<()> {
    let mut violations: BTreeMap<String, usize> = BTreeMap::new();
    {
        let mut stmt = conn.prepare("PRAGMA foreign_key_check;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let table: String = row.get(0)?;
            *violations.entry(table).or_insert(0) += 1;
        }
    }

    match violations.into_iter().next() {
        None => Ok(()),
        Some((table, rows)) => {
            warn!(
                "event=db_reference_check module=db status=error table={} rows={}",
                table, rows
            );
            Err(DbError::DanglingReferences { table, rows })
        }
    }
}

pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
