//! Ledger database bootstrap.
//!
//! # Responsibility
//! - Hand out connections the integrity engine can rely on: schema at the
//!   latest version, foreign keys enforced, no dangling references.
//!
//! # Invariants
//! - The schema declares foreign keys without ON DELETE actions; the rule
//!   table in `crate::integrity::rules` owns every cascade/nullify.
//! - A database written by a newer binary is never opened.
//! - A database holding rows that reference missing parents (written with
//!   foreign keys off) is refused instead of being repaired.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap failure.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Rows of `table` point at parents that no longer exist.
    DanglingReferences { table: String, rows: usize },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "ledger schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::DanglingReferences { table, rows } => {
                write!(f, "{rows} rows in `{table}` reference missing records")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::DanglingReferences { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
